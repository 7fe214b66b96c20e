//! Common types and traits shared by the end-device components.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sim::clock::SimTime;

/// Operational state of the end-device radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhyState {
    Standby,
    Tx,
    Rx,
    Sleep,
    Idle,
    Off,
    TurnOn,
}

impl PhyState {
    /// Every state, in table order.
    pub const ALL: [PhyState; 7] = [
        PhyState::Standby,
        PhyState::Tx,
        PhyState::Rx,
        PhyState::Sleep,
        PhyState::Idle,
        PhyState::Off,
        PhyState::TurnOn,
    ];

    /// Position of the state in [`PhyState::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhyState::Standby => "STANDBY",
            PhyState::Tx => "TX",
            PhyState::Rx => "RX",
            PhyState::Sleep => "SLEEP",
            PhyState::Idle => "IDLE",
            PhyState::Off => "OFF",
            PhyState::TurnOn => "TURNON",
        }
    }
}

impl fmt::Display for PhyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhyState {
    type Err = String;

    /// Parses a state name, ignoring case (`"tx"`, `"TURNON"`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhyState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown radio state \"{s}\""))
    }
}

/// Outcome of a capacitor voltage update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyNotification {
    /// Voltage fell to the low threshold; the source is now depleted.
    Drained,
    /// Voltage rose above the high threshold; the source is usable again.
    Recharged,
    /// No threshold crossed, voltage moved.
    Changed,
    /// No threshold crossed, voltage unchanged.
    Constant,
}

impl EnergyNotification {
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyNotification::Drained => "drained",
            EnergyNotification::Recharged => "recharged",
            EnergyNotification::Changed => "changed",
            EnergyNotification::Constant => "constant",
        }
    }
}

/// Snapshot delivered to energy subscribers after every source update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEvent {
    pub kind: EnergyNotification,
    pub time: SimTime,
    pub voltage_v: f64,
    pub remaining_energy_j: f64,
    pub depleted: bool,
    /// The interval had no conduction path and the voltage was held.
    pub open_circuit: bool,
}

/// Phy transition delivered to state listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub time: SimTime,
    pub from: PhyState,
    pub to: PhyState,
    /// Transmit power carried by a TX transition.
    pub tx_power_dbm: Option<f64>,
}

/// Raw timestamped values exposed for an external recorder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TracePoint {
    Voltage {
        time: SimTime,
        voltage_v: f64,
        energy_j: f64,
    },
    State {
        time: SimTime,
        from: PhyState,
        to: PhyState,
    },
    Consumption {
        time: SimTime,
        total_j: f64,
    },
    Notification {
        time: SimTime,
        kind: EnergyNotification,
    },
}

impl TracePoint {
    pub fn time(&self) -> SimTime {
        match *self {
            TracePoint::Voltage { time, .. }
            | TracePoint::State { time, .. }
            | TracePoint::Consumption { time, .. }
            | TracePoint::Notification { time, .. } => time,
        }
    }
}

/// Work a device schedules on the shared timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceEvent {
    /// Periodic capacitor re-evaluation.
    VoltageUpdate,
    /// Predicted threshold crossing.
    ThresholdCheck,
    /// Harvester resample.
    HarvesterUpdate,
    /// End of the turn-on delay: move from TURNON to SLEEP.
    TurnOnComplete,
    /// Desynchronised application send.
    AppSend,
    /// Uplink time-on-air elapsed.
    TxEnd,
    /// First receive window opens.
    RxWindowOpen,
    /// Receive window closes.
    RxWindowClose,
}

/// A source of ambient power charging the capacitor.
///
/// Implementations recompute their power on their own cadence, independent
/// of the capacitor's update schedule.
pub trait Harvester {
    /// Currently available power in watts, always `>= 0`.
    fn power_w(&self) -> f64;

    /// Recomputes the available power at `now` and returns it.
    ///
    /// The previous power is credited to the harvested-energy total for the
    /// interval since the last resample.
    fn resample(&mut self, now: SimTime) -> f64;

    /// Cadence at which [`Harvester::resample`] should be called.
    fn update_interval(&self) -> Duration;

    /// Energy offered by the harvester so far, in joules.
    fn total_energy_harvested_j(&self) -> f64;

    /// Returns a human-readable type name for the harvester.
    fn harvester_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_index_matches_table_order() {
        for (i, s) in PhyState::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn state_display_is_uppercase() {
        assert_eq!(PhyState::TurnOn.to_string(), "TURNON");
        assert_eq!(PhyState::Tx.to_string(), "TX");
    }

    #[test]
    fn state_parses_any_case() {
        assert_eq!("turnon".parse::<PhyState>(), Ok(PhyState::TurnOn));
        assert_eq!("Standby".parse::<PhyState>(), Ok(PhyState::Standby));
        assert!("transmit".parse::<PhyState>().is_err());
    }

    #[test]
    fn trace_point_time() {
        let t = SimTime::from_secs_f64(3.0);
        let p = TracePoint::Consumption { time: t, total_j: 1.0 };
        assert_eq!(p.time(), t);
    }
}
