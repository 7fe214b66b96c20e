//! Virtual simulation time.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// An instant on the simulated timeline, measured from the start of the run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use capsim::sim::clock::SimTime;
///
/// let t = SimTime::from_secs_f64(1.5) + Duration::from_millis(500);
/// assert_eq!(t.as_secs_f64(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(Duration);

impl SimTime {
    /// Start of the simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Creates an instant `secs` seconds after the start.
    ///
    /// # Panics
    ///
    /// Panics if `secs` is negative or not finite.
    pub fn from_secs_f64(secs: f64) -> Self {
        assert!(
            secs.is_finite() && secs >= 0.0,
            "simulation time must be finite and >= 0, got {secs}"
        );
        Self(Duration::from_secs_f64(secs))
    }

    /// Creates an instant from an offset since the start.
    pub fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Seconds elapsed since the start.
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Offset since the start.
    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// A monotonic virtual clock.
///
/// The clock only moves forward; the event queue advances it to the
/// timestamp of each dispatched event.
#[derive(Debug, Default)]
pub struct Clock {
    now: SimTime,
}

impl Clock {
    /// Creates a clock positioned at [`SimTime::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock forward to `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` is earlier than the current time.
    pub fn advance_to(&mut self, t: SimTime) {
        assert!(t >= self.now, "clock cannot move backwards ({t} < {})", self.now);
        self.now = t;
    }
}
