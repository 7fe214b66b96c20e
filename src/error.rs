//! Error types for the energy model.

use thiserror::Error;

use crate::config::ConfigError;
use crate::devices::types::PhyState;

/// Failures raised by the capacitor, radio and harvester models.
///
/// Configuration problems are reported as [`ConfigError`] by
/// `ScenarioConfig::validate` before a run starts and wrapped here when a run
/// is built from an invalid configuration.
#[derive(Debug, Error)]
pub enum EnergyError {
    /// The radio current table has no entry for a state.
    #[error("no current draw configured for radio state {0}")]
    MissingCurrent(PhyState),

    /// Zero load and zero harvested power: the RC circuit is open.
    #[error("no load current and no harvested power: voltage trajectory is undefined")]
    NoConductionPath,

    /// A prediction was asked for a negative or non-finite duration.
    #[error("duration must be finite and non-negative, got {0} s")]
    NegativeDuration(f64),

    /// Load current or harvested power is negative or not finite.
    #[error("invalid operating point: {0}")]
    InvalidOperatingPoint(String),

    /// Hysteresis thresholds are misordered or outside `(0, 1]`.
    #[error("low voltage threshold {low} must be in (0, high) and high threshold {high} in (low, 1]")]
    ThresholdOrder { low: f64, high: f64 },

    /// A harvester trace row could not be parsed.
    #[error("harvester trace {path}: record {record}: {message}")]
    TraceParse {
        path: String,
        record: u64,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
