//! Energy-aware traffic generator.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use super::types::{DeviceEvent, EnergyEvent, EnergyNotification};
use crate::sim::clock::SimTime;
use crate::sim::event::{EventId, Scheduler};

/// Application parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderParams {
    /// Stored energy required before a send is scheduled (J).
    pub energy_threshold_j: f64,
    /// Minimum time between two sends.
    pub min_interval: Duration,
    /// Upper bound of the random delay before a scheduled send.
    pub max_desync_delay: Duration,
    /// Base payload size in bytes.
    pub packet_size: u32,
    /// Extra bytes drawn uniformly from `[0, packet_size_jitter]` per packet.
    pub packet_size_jitter: u32,
}

impl Default for SenderParams {
    fn default() -> Self {
        Self {
            energy_threshold_j: 0.0,
            min_interval: Duration::from_secs(60),
            max_desync_delay: Duration::from_secs(1),
            packet_size: 10,
            packet_size_jitter: 0,
        }
    }
}

/// Sends only when the capacitor holds enough energy.
///
/// Reacts to "changed" and "constant" energy notifications instead of a
/// fixed timer. A send is scheduled after a random desynchronisation delay
/// when the minimum interval has passed, nothing is in flight and the
/// stored energy clears the threshold.
#[derive(Debug, Clone)]
pub struct EnergyAwareSender {
    params: SenderParams,
    initial_delay: Duration,
    first_sending: bool,
    trying_to_send: bool,
    send_time: SimTime,
    scheduled_send: Option<EventId>,
    packets_generated: u64,
    bytes_generated: u64,
    rng: StdRng,
}

impl EnergyAwareSender {
    /// Creates a sender whose first send waits a random delay in `[0, min_interval]`.
    pub fn new(params: SenderParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let initial_delay = Duration::from_secs_f64(
            rng.random_range(0.0..=params.min_interval.as_secs_f64()),
        );
        Self {
            params,
            initial_delay,
            first_sending: true,
            trying_to_send: false,
            send_time: SimTime::ZERO,
            scheduled_send: None,
            packets_generated: 0,
            bytes_generated: 0,
            rng,
        }
    }

    pub fn params(&self) -> &SenderParams {
        &self.params
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn is_trying_to_send(&self) -> bool {
        self.trying_to_send
    }

    pub fn packets_generated(&self) -> u64 {
        self.packets_generated
    }

    pub fn bytes_generated(&self) -> u64 {
        self.bytes_generated
    }

    /// Handles an energy notification. Returns `true` if a send was scheduled.
    pub fn on_energy(&mut self, event: &EnergyEvent, sched: &mut dyn Scheduler<DeviceEvent>) -> bool {
        if !matches!(
            event.kind,
            EnergyNotification::Changed | EnergyNotification::Constant
        ) {
            return false;
        }
        let now = sched.now();
        let first_due = self.first_sending && now.as_duration() >= self.initial_delay;
        let send_pending = self.scheduled_send.is_some_and(|id| sched.is_pending(id));
        let interval_due =
            !send_pending && now.saturating_since(self.send_time) > self.params.min_interval;

        if !(first_due || interval_due) {
            return false;
        }
        if self.trying_to_send {
            debug!("send already in flight");
            return false;
        }
        if event.remaining_energy_j < self.params.energy_threshold_j {
            return false;
        }

        let max_delay = self.params.max_desync_delay.as_secs_f64();
        let delay = if max_delay > 0.0 {
            Duration::from_secs_f64(self.rng.random_range(0.0..=max_delay))
        } else {
            Duration::ZERO
        };
        debug!(
            energy_j = event.remaining_energy_j,
            threshold_j = self.params.energy_threshold_j,
            delay_s = delay.as_secs_f64(),
            "enough energy, scheduling send"
        );
        self.scheduled_send = Some(sched.schedule_in(delay, DeviceEvent::AppSend));
        self.first_sending = false;
        true
    }

    /// Generates a packet at `now` and marks it in flight. Returns its size in bytes.
    pub fn send(&mut self, now: SimTime) -> u32 {
        let extra = if self.params.packet_size_jitter > 0 {
            self.rng.random_range(0..=self.params.packet_size_jitter)
        } else {
            0
        };
        let size = self.params.packet_size + extra;
        self.send_time = now;
        self.trying_to_send = true;
        self.packets_generated += 1;
        self.bytes_generated += u64::from(size);
        size
    }

    /// The lower layer started transmitting.
    pub fn on_started_sending(&mut self) {
        self.trying_to_send = false;
    }

    /// The lower layer could not transmit.
    pub fn on_sending_not_possible(&mut self) {
        self.trying_to_send = false;
    }
}
