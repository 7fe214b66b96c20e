//! Minimal Class-A uplink cycle driving the radio.
//!
//! TX for the time on air, STANDBY until the receive window, RX for the
//! window, then SLEEP. Each step only proceeds if the phy is still where the
//! previous step left it; a forced depletion transition aborts the cycle.

use std::time::Duration;

use super::types::PhyState;

/// Timing of one uplink.
#[derive(Debug, Clone, PartialEq)]
pub struct UplinkParams {
    pub tx_power_dbm: f64,
    pub time_on_air: Duration,
    /// Delay between the end of TX and the opening of the receive window.
    pub receive_delay: Duration,
    pub receive_window: Duration,
}

impl Default for UplinkParams {
    fn default() -> Self {
        Self {
            tx_power_dbm: 14.0,
            time_on_air: Duration::from_millis(62),
            receive_delay: Duration::from_secs(1),
            receive_window: Duration::from_millis(33),
        }
    }
}

/// Where the current uplink stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkPhase {
    Idle,
    Transmitting,
    AwaitingWindow,
    Receiving,
}

impl UplinkPhase {
    /// Phy state the radio must be in for the phase to continue.
    pub fn expected_state(self) -> Option<PhyState> {
        match self {
            UplinkPhase::Idle => None,
            UplinkPhase::Transmitting => Some(PhyState::Tx),
            UplinkPhase::AwaitingWindow => Some(PhyState::Standby),
            UplinkPhase::Receiving => Some(PhyState::Rx),
        }
    }
}

/// Phase tracking and counters for the uplink cycle.
#[derive(Debug, Clone)]
pub struct UplinkCycle {
    params: UplinkParams,
    phase: UplinkPhase,
    completed: u64,
    aborted: u64,
}

impl UplinkCycle {
    pub fn new(params: UplinkParams) -> Self {
        Self {
            params,
            phase: UplinkPhase::Idle,
            completed: 0,
            aborted: 0,
        }
    }

    pub fn params(&self) -> &UplinkParams {
        &self.params
    }

    pub fn phase(&self) -> UplinkPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != UplinkPhase::Idle
    }

    /// Returns `true` if the cycle is in `phase` with the radio in the matching state.
    /// Otherwise the cycle is aborted (counted once) and `false` returned.
    pub fn check(&mut self, phase: UplinkPhase, radio: PhyState) -> bool {
        if self.phase == phase && phase.expected_state() == Some(radio) {
            return true;
        }
        self.abort();
        false
    }

    pub fn advance(&mut self, next: UplinkPhase) {
        self.phase = next;
    }

    /// Ends a cycle that reached SLEEP after its receive window.
    pub fn complete(&mut self) {
        self.phase = UplinkPhase::Idle;
        self.completed += 1;
    }

    pub fn abort(&mut self) {
        if self.phase != UplinkPhase::Idle {
            self.aborted += 1;
        }
        self.phase = UplinkPhase::Idle;
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn aborted(&self) -> u64 {
        self.aborted
    }
}
