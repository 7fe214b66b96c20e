//! Harvester driven by recorded power time series.
//!
//! Traces are CSV files with one row per simulated second. By default the
//! first line is a header and column 5 (0-based) holds the power in watts.
//! A trace that cannot be opened counts as "no harvesting": it becomes a
//! single zero sample and the device stays starved.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::types::Harvester;
use crate::error::EnergyError;
use crate::sim::clock::SimTime;

/// Layout of a power trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFormat {
    /// Skip the first line.
    pub has_header: bool,
    /// 0-based column holding the power in watts.
    pub power_column: usize,
}

impl Default for TraceFormat {
    fn default() -> Self {
        Self {
            has_header: true,
            power_column: 5,
        }
    }
}

/// Reads one power sample per row.
///
/// Negative samples are clamped to zero. A file that cannot be opened yields
/// `vec![0.0]`.
///
/// # Errors
///
/// Returns [`EnergyError::TraceParse`] if a row lacks the power column or
/// holds a non-numeric value, and [`EnergyError::Csv`] for malformed CSV.
pub fn read_power_trace(path: &Path, format: TraceFormat) -> Result<Vec<f64>, EnergyError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "harvester trace unavailable, using zero power");
            return Ok(vec![0.0]);
        }
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(format.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut samples = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let parse_error = |message: String| EnergyError::TraceParse {
            path: path.display().to_string(),
            record: i as u64 + 1,
            message,
        };
        let field = record
            .get(format.power_column)
            .ok_or_else(|| parse_error(format!("missing column {}", format.power_column)))?;
        let power: f64 = field
            .parse()
            .map_err(|e| parse_error(format!("\"{field}\": {e}")))?;
        samples.push(power.max(0.0));
    }
    debug!(path = %path.display(), samples = samples.len(), "harvester trace loaded");
    Ok(samples)
}

/// Draws `n` non-negative mixing weights that sum to exactly 1.
///
/// Weights are drawn uniformly one at a time while the running sum stays
/// below 1; the remainder goes to the last slot and the result is shuffled.
pub fn draw_mixing_coefficients(n: usize, rng: &mut impl Rng) -> Vec<f64> {
    match n {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }
    let mut coefficients = vec![0.0; n];
    let mut sum = 0.0;
    for slot in coefficients.iter_mut().take(n - 1) {
        let c: f64 = rng.random();
        if sum + c >= 1.0 {
            break;
        }
        *slot = c;
        sum += c;
    }
    coefficients[n - 1] = 1.0 - sum;
    coefficients.shuffle(rng);
    coefficients
}

/// Weighted sample-by-sample sum of several traces.
///
/// The result is as long as the longest trace; shorter ones contribute zero
/// past their end.
pub fn combine_traces(traces: &[Vec<f64>], coefficients: &[f64]) -> Vec<f64> {
    let len = traces.iter().map(Vec::len).max().unwrap_or(0);
    let mut combined = vec![0.0; len];
    for (trace, &c) in traces.iter().zip(coefficients) {
        for (acc, p) in combined.iter_mut().zip(trace) {
            *acc += c * p;
        }
    }
    combined
}

/// Harvester replaying a per-second power series.
#[derive(Debug, Clone)]
pub struct FileHarvester {
    samples: Vec<f64>,
    update_interval: Duration,
    power_w: f64,
    last_update: SimTime,
    total_energy_j: f64,
}

impl FileHarvester {
    /// Creates a harvester from in-memory samples (one per second).
    ///
    /// # Panics
    ///
    /// Panics if `update_interval` is zero.
    pub fn from_samples(samples: Vec<f64>, update_interval: Duration) -> Self {
        assert!(!update_interval.is_zero());
        let samples: Vec<f64> = samples.into_iter().map(|p| p.max(0.0)).collect();
        let mut h = Self {
            samples,
            update_interval,
            power_w: 0.0,
            last_update: SimTime::ZERO,
            total_energy_j: 0.0,
        };
        h.power_w = h.power_at(SimTime::ZERO);
        h
    }

    /// Loads one or more traces.
    ///
    /// With a single trace, one offset drawn uniformly from
    /// `[-variability_w, variability_w]` is added to every sample (clamped at
    /// zero). With several, the traces are mixed with
    /// [`draw_mixing_coefficients`]. No trace at all means no harvesting.
    ///
    /// # Errors
    ///
    /// Propagates the parse errors of [`read_power_trace`].
    pub fn load(
        paths: &[PathBuf],
        format: TraceFormat,
        variability_w: f64,
        update_interval: Duration,
        rng: &mut impl Rng,
    ) -> Result<Self, EnergyError> {
        let samples = match paths {
            [] => vec![0.0],
            [single] => {
                let trace = read_power_trace(single, format)?;
                let offset = if variability_w > 0.0 {
                    rng.random_range(-variability_w..=variability_w)
                } else {
                    0.0
                };
                trace.into_iter().map(|p| (p + offset).max(0.0)).collect()
            }
            many => {
                let coefficients = draw_mixing_coefficients(many.len(), rng);
                let traces = many
                    .iter()
                    .map(|p| read_power_trace(p, format))
                    .collect::<Result<Vec<_>, _>>()?;
                debug!(?coefficients, "mixing harvester traces");
                combine_traces(&traces, &coefficients)
            }
        };
        Ok(Self::from_samples(samples, update_interval))
    }

    /// Power at time `t`: the sample at `floor(t)` seconds.
    ///
    /// A series with at most one sample means "no data" and always yields 0.
    /// Times past the end hold the last sample.
    pub fn power_at(&self, t: SimTime) -> f64 {
        if self.samples.len() <= 1 {
            return 0.0;
        }
        let index = (t.as_secs_f64().floor() as usize).min(self.samples.len() - 1);
        self.samples[index]
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

impl Harvester for FileHarvester {
    fn power_w(&self) -> f64 {
        self.power_w
    }

    fn resample(&mut self, now: SimTime) -> f64 {
        self.total_energy_j += self.power_w * now.saturating_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.power_w = self.power_at(now);
        self.power_w
    }

    fn update_interval(&self) -> Duration {
        self.update_interval
    }

    fn total_energy_harvested_j(&self) -> f64 {
        self.total_energy_j
    }

    fn harvester_type(&self) -> &'static str {
        "File"
    }
}
