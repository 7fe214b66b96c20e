//! Run-level simulation parameters.

use std::time::Duration;

use super::clock::SimTime;

/// Timing and seeding shared by every device in a run.
///
/// # Examples
///
/// ```
/// use capsim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(3600.0, 4, 42);
/// assert_eq!(cfg.stop_time().as_secs_f64(), 3600.0);
/// assert_eq!(cfg.device_seed(2), cfg.device_seed(2));
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Simulated duration.
    pub duration: Duration,
    /// Number of end devices.
    pub devices: usize,
    /// Master random seed.
    pub seed: u64,
}

/// Stride between per-device seeds so neighbouring devices get unrelated streams.
const DEVICE_SEED_STRIDE: u64 = 7919;

impl SimConfig {
    /// Creates a run configuration.
    ///
    /// # Arguments
    ///
    /// * `duration_s` - Simulated time in seconds (must be > 0)
    /// * `devices` - Number of devices (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `duration_s` is not positive and finite or `devices` is zero.
    pub fn new(duration_s: f64, devices: usize, seed: u64) -> Self {
        assert!(
            duration_s.is_finite() && duration_s > 0.0,
            "duration must be > 0"
        );
        assert!(devices > 0, "devices must be > 0");
        Self {
            duration: Duration::from_secs_f64(duration_s),
            devices,
            seed,
        }
    }

    /// Instant at which the run stops.
    pub fn stop_time(&self) -> SimTime {
        SimTime::from_duration(self.duration)
    }

    /// Seed for device `index`, derived from the master seed.
    pub fn device_seed(&self, index: usize) -> u64 {
        self.seed
            .wrapping_add((index as u64 + 1).wrapping_mul(DEVICE_SEED_STRIDE))
    }
}
