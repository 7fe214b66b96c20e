//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::devices::current_table::default_currents;
use crate::devices::types::PhyState;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, fleet size and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Storage capacitor and hysteresis thresholds.
    #[serde(default)]
    pub capacitor: CapacitorConfig,
    /// Radio currents and depletion policy.
    #[serde(default)]
    pub radio: RadioConfig,
    /// Ambient power source.
    #[serde(default)]
    pub harvester: HarvesterConfig,
    /// Energy-aware traffic generator.
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Timing of one uplink.
    #[serde(default)]
    pub uplink: UplinkConfig,
}

/// Run length, fleet size and seed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated time in seconds (must be > 0).
    pub duration_s: f64,
    /// Number of end devices (must be > 0).
    pub devices: usize,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 3600.0,
            devices: 1,
            seed: 42,
        }
    }
}

/// Storage capacitor and hysteresis thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapacitorConfig {
    /// Capacitance (F).
    pub capacitance_f: f64,
    /// Harvester supply voltage, the ceiling of the capacitor voltage (V).
    pub supply_voltage_v: f64,
    /// Depletion threshold as a fraction of the supply voltage.
    pub low_threshold: f64,
    /// Recharge threshold as a fraction of the supply voltage.
    pub high_threshold: f64,
    /// Period of the voltage re-evaluation (s).
    pub update_interval_s: f64,
    /// Lower bound of the per-device initial voltage (V).
    pub min_initial_voltage_v: f64,
    /// Upper bound of the per-device initial voltage (V).
    pub max_initial_voltage_v: f64,
}

impl Default for CapacitorConfig {
    fn default() -> Self {
        Self {
            capacitance_f: 0.01,
            supply_voltage_v: 3.3,
            low_threshold: 0.545,
            high_threshold: 0.909,
            update_interval_s: 1.0,
            min_initial_voltage_v: 3.3,
            max_initial_voltage_v: 3.3,
        }
    }
}

/// Radio currents and depletion policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    /// Voltage at which the currents were characterised (V).
    pub reference_voltage_v: f64,
    /// On depletion go to SLEEP instead of OFF.
    pub enter_sleep_if_depleted: bool,
    /// Time spent in TURNON after a recharge (s).
    pub turn_on_duration_s: f64,
    /// TX current source: `"table"`, `"constant"` or `"linear"`.
    pub tx_model: String,
    /// TX current of the constant model (A).
    pub tx_constant_current_a: f64,
    /// Power-amplifier efficiency of the linear model.
    pub tx_eta: f64,
    /// Supply voltage of the linear model (V).
    pub tx_voltage_v: f64,
    /// Idle current added by the linear model (A).
    pub tx_standby_current_a: f64,
    /// Current per state, keyed by state name (A).
    pub currents: BTreeMap<String, f64>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            reference_voltage_v: 3.3,
            enter_sleep_if_depleted: false,
            turn_on_duration_s: 13.0,
            tx_model: "table".to_string(),
            tx_constant_current_a: 0.028,
            tx_eta: 0.1,
            tx_voltage_v: 3.3,
            tx_standby_current_a: 0.0014,
            currents: default_currents()
                .into_iter()
                .map(|(state, current)| (state.as_str().to_ascii_lowercase(), current))
                .collect(),
        }
    }
}

impl RadioConfig {
    /// Resolves the state names of [`RadioConfig::currents`].
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first key that is not a radio state.
    pub fn current_map(&self) -> Result<BTreeMap<PhyState, f64>, ConfigError> {
        self.currents
            .iter()
            .map(|(name, current)| {
                name.parse::<PhyState>()
                    .map(|state| (state, *current))
                    .map_err(|message| ConfigError {
                        field: format!("radio.currents.{name}"),
                        message,
                    })
            })
            .collect()
    }
}

/// Ambient power source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvesterConfig {
    /// `"constant"`, `"file"` or `"none"`.
    pub model: String,
    /// Lower bound of the constant-range draw (W).
    pub min_power_w: f64,
    /// Upper bound of the constant-range draw (W).
    pub max_power_w: f64,
    /// Resampling period (s).
    pub update_interval_s: f64,
    /// Power traces for the file model; several are mixed per device.
    pub files: Vec<PathBuf>,
    /// Per-device offset range added to a single trace (W).
    pub variability_w: f64,
    /// Whether trace files start with a header row.
    pub has_header: bool,
    /// Zero-based column holding the power in watts.
    pub power_column: usize,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            model: "constant".to_string(),
            min_power_w: 0.0,
            max_power_w: 0.003,
            update_interval_s: 10.0,
            files: Vec::new(),
            variability_w: 0.0,
            has_header: true,
            power_column: 5,
        }
    }
}

/// Energy-aware traffic generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationConfig {
    /// Without an application the radio only reacts to the capacitor.
    pub enabled: bool,
    /// Stored energy required before a send (J).
    pub energy_threshold_j: f64,
    /// Minimum time between two sends (s).
    pub min_interval_s: f64,
    /// Upper bound of the random delay before a send (s).
    pub max_desync_delay_s: f64,
    /// Base payload size (bytes).
    pub packet_size: u32,
    /// Random extra bytes per packet, drawn from `[0, jitter]`.
    pub packet_size_jitter: u32,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_threshold_j: 0.02,
            min_interval_s: 60.0,
            max_desync_delay_s: 1.0,
            packet_size: 10,
            packet_size_jitter: 0,
        }
    }
}

/// Timing of one uplink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UplinkConfig {
    pub tx_power_dbm: f64,
    /// TX duration (s).
    pub time_on_air_s: f64,
    /// STANDBY wait between TX end and the receive window (s).
    pub receive_delay_s: f64,
    /// RX duration (s).
    pub receive_window_s: f64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: 14.0,
            time_on_air_s: 0.062,
            receive_delay_s: 1.0,
            receive_window_s: 0.033,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"capacitor.low_threshold"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Upper bound for any time field. Sums of two such spans stay well inside
/// the simulation clock.
pub(crate) const MAX_DURATION_S: f64 = 1.0e12;

fn fits_duration(secs: f64) -> bool {
    secs <= MAX_DURATION_S && Duration::try_from_secs_f64(secs).is_ok()
}

fn err(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        field: field.to_string(),
        message: message.into(),
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one device with a weak constant harvester.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            capacitor: CapacitorConfig::default(),
            radio: RadioConfig::default(),
            harvester: HarvesterConfig::default(),
            application: ApplicationConfig::default(),
            uplink: UplinkConfig::default(),
        }
    }

    /// Returns the dark preset: no harvesting, frequent uplinks until the
    /// capacitor is exhausted and the radio is switched off.
    pub fn dark() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 1800.0,
                ..SimulationConfig::default()
            },
            harvester: HarvesterConfig {
                model: "none".to_string(),
                ..HarvesterConfig::default()
            },
            application: ApplicationConfig {
                energy_threshold_j: 0.0,
                min_interval_s: 10.0,
                ..ApplicationConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the fleet preset: many devices with scattered initial charge
    /// and a short turn-on delay, cycling through depletion and recharge.
    pub fn fleet() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 6.0 * 3600.0,
                devices: 20,
                seed: 7,
            },
            capacitor: CapacitorConfig {
                min_initial_voltage_v: 1.5,
                max_initial_voltage_v: 3.3,
                ..CapacitorConfig::default()
            },
            radio: RadioConfig {
                turn_on_duration_s: 0.3,
                ..RadioConfig::default()
            },
            harvester: HarvesterConfig {
                min_power_w: 0.0,
                max_power_w: 0.002,
                update_interval_s: 30.0,
                ..HarvesterConfig::default()
            },
            application: ApplicationConfig {
                min_interval_s: 30.0,
                packet_size_jitter: 10,
                ..ApplicationConfig::default()
            },
            uplink: UplinkConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "dark", "fleet"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "dark" => Ok(Self::dark()),
            "fleet" => Ok(Self::fleet()),
            _ => Err(err(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| err("scenario", format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| err("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !(s.duration_s > 0.0) {
            errors.push(err("simulation.duration_s", "must be > 0"));
        }
        if s.devices == 0 {
            errors.push(err("simulation.devices", "must be > 0"));
        }

        self.validate_capacitor(&mut errors);
        self.validate_radio(&mut errors);
        self.validate_harvester(&mut errors);

        let a = &self.application;
        if !(a.energy_threshold_j >= 0.0) {
            errors.push(err("application.energy_threshold_j", "must be >= 0"));
        }
        if !(a.min_interval_s > 0.0) {
            errors.push(err("application.min_interval_s", "must be > 0"));
        }
        if !(a.max_desync_delay_s >= 0.0) {
            errors.push(err("application.max_desync_delay_s", "must be >= 0"));
        }

        let u = &self.uplink;
        if !u.tx_power_dbm.is_finite() {
            errors.push(err("uplink.tx_power_dbm", "must be finite"));
        }
        if !(u.time_on_air_s > 0.0) {
            errors.push(err("uplink.time_on_air_s", "must be > 0"));
        }
        if !(u.receive_delay_s >= 0.0) {
            errors.push(err("uplink.receive_delay_s", "must be >= 0"));
        }
        if !(u.receive_window_s > 0.0) {
            errors.push(err("uplink.receive_window_s", "must be > 0"));
        }

        let durations = [
            ("simulation.duration_s", s.duration_s),
            ("capacitor.update_interval_s", self.capacitor.update_interval_s),
            ("radio.turn_on_duration_s", self.radio.turn_on_duration_s),
            ("harvester.update_interval_s", self.harvester.update_interval_s),
            ("application.min_interval_s", a.min_interval_s),
            ("application.max_desync_delay_s", a.max_desync_delay_s),
            ("uplink.time_on_air_s", u.time_on_air_s),
            ("uplink.receive_delay_s", u.receive_delay_s),
            ("uplink.receive_window_s", u.receive_window_s),
        ];
        for (field, secs) in durations {
            // sign errors are reported above
            if secs >= 0.0 && !fits_duration(secs) {
                errors.push(err(field, format!("must be finite and <= {MAX_DURATION_S:e} s")));
            }
        }

        errors
    }

    fn validate_capacitor(&self, errors: &mut Vec<ConfigError>) {
        let c = &self.capacitor;
        if !(c.capacitance_f > 0.0) {
            errors.push(err("capacitor.capacitance_f", "must be > 0"));
        }
        if !(c.supply_voltage_v > 0.0) {
            errors.push(err("capacitor.supply_voltage_v", "must be > 0"));
        }
        if !(c.low_threshold > 0.0 && c.low_threshold < c.high_threshold) {
            errors.push(err(
                "capacitor.low_threshold",
                "must be > 0 and < capacitor.high_threshold",
            ));
        }
        if !(c.high_threshold <= 1.0) {
            errors.push(err("capacitor.high_threshold", "must be <= 1"));
        }
        if !(c.update_interval_s > 0.0) {
            errors.push(err("capacitor.update_interval_s", "must be > 0"));
        }
        if !(c.min_initial_voltage_v >= 0.0 && c.min_initial_voltage_v <= c.max_initial_voltage_v)
        {
            errors.push(err(
                "capacitor.min_initial_voltage_v",
                "must be >= 0 and <= capacitor.max_initial_voltage_v",
            ));
        }
        if c.max_initial_voltage_v > c.supply_voltage_v {
            errors.push(err(
                "capacitor.max_initial_voltage_v",
                "must be <= capacitor.supply_voltage_v",
            ));
        }
    }

    fn validate_radio(&self, errors: &mut Vec<ConfigError>) {
        let r = &self.radio;
        if !(r.reference_voltage_v > 0.0) {
            errors.push(err("radio.reference_voltage_v", "must be > 0"));
        }
        if !(r.turn_on_duration_s >= 0.0) {
            errors.push(err("radio.turn_on_duration_s", "must be >= 0"));
        }
        match r.tx_model.as_str() {
            "table" => {}
            "constant" => {
                if !(r.tx_constant_current_a >= 0.0) {
                    errors.push(err("radio.tx_constant_current_a", "must be >= 0"));
                }
            }
            "linear" => {
                if !(r.tx_eta > 0.0) {
                    errors.push(err("radio.tx_eta", "must be > 0"));
                }
                if !(r.tx_voltage_v > 0.0) {
                    errors.push(err("radio.tx_voltage_v", "must be > 0"));
                }
                if !(r.tx_standby_current_a >= 0.0) {
                    errors.push(err("radio.tx_standby_current_a", "must be >= 0"));
                }
            }
            other => errors.push(err(
                "radio.tx_model",
                format!("must be \"table\", \"constant\" or \"linear\", got \"{other}\""),
            )),
        }

        match r.current_map() {
            Ok(map) => {
                for state in PhyState::ALL {
                    let field = format!("radio.currents.{}", state.as_str().to_ascii_lowercase());
                    match map.get(&state) {
                        None => errors.push(err(&field, "missing")),
                        Some(i) if !(*i >= 0.0) => errors.push(err(&field, "must be >= 0")),
                        Some(_) => {}
                    }
                }
            }
            Err(e) => errors.push(e),
        }
    }

    fn validate_harvester(&self, errors: &mut Vec<ConfigError>) {
        let h = &self.harvester;
        match h.model.as_str() {
            "none" => {}
            "constant" => {
                if !(h.min_power_w >= 0.0 && h.min_power_w <= h.max_power_w) {
                    errors.push(err(
                        "harvester.min_power_w",
                        "must be >= 0 and <= harvester.max_power_w",
                    ));
                }
            }
            "file" => {
                if !(h.variability_w >= 0.0) {
                    errors.push(err("harvester.variability_w", "must be >= 0"));
                }
            }
            other => errors.push(err(
                "harvester.model",
                format!("must be \"constant\", \"file\" or \"none\", got \"{other}\""),
            )),
        }
        if h.model != "none" && !(h.update_interval_s > 0.0) {
            errors.push(err("harvester.update_interval_s", "must be > 0"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.as_ref().is_err_and(|e| e.message.contains("unknown preset")));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn default_currents_cover_every_state() {
        let map = RadioConfig::default().current_map().unwrap_or_default();
        assert_eq!(map.len(), PhyState::ALL.len());
        assert_eq!(map.get(&PhyState::TurnOn), Some(&0.0221));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
duration_s = 600.0
devices = 3
seed = 99

[capacitor]
capacitance_f = 0.047
low_threshold = 0.5
high_threshold = 0.9

[radio]
enter_sleep_if_depleted = true
tx_model = "linear"
tx_eta = 0.12

[radio.currents]
standby = 0.0014
tx = 0.028
rx = 0.0112
sleep = 0.0000015
idle = 0.000007
off = 0.0
turnon = 0.0221

[harvester]
model = "file"
files = ["traces/a.csv", "traces/b.csv"]
power_column = 1
has_header = false

[application]
min_interval_s = 120.0

[uplink]
tx_power_dbm = 10.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.devices), Some(3));
        assert_eq!(cfg.as_ref().map(|c| c.harvester.files.len()), Some(2));
        assert_eq!(cfg.as_ref().map(|c| &*c.radio.tx_model), Some("linear"));
        assert_eq!(cfg.as_ref().map(|c| c.validate().len()), Some(0));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[capacitor]
capacitance_f = 0.01
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.duration_s), Some(3600.0));
        assert_eq!(cfg.as_ref().map(|c| c.capacitor.low_threshold), Some(0.545));
    }

    #[test]
    fn validation_catches_misordered_thresholds() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.capacitor.low_threshold = 0.95;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "capacitor.low_threshold"));
    }

    #[test]
    fn validation_catches_missing_current() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.radio.currents.remove("turnon");
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "radio.currents.turnon"));
    }

    #[test]
    fn validation_catches_unknown_state_name() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.radio.currents.insert("transmit".into(), 0.03);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "radio.currents.transmit"));
    }

    #[test]
    fn validation_catches_negative_power() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.harvester.min_power_w = -0.1;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "harvester.min_power_w"));
    }

    #[test]
    fn validation_catches_bad_models() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.harvester.model = "solar".into();
        cfg.radio.tx_model = "cubic".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "harvester.model"));
        assert!(errors.iter().any(|e| e.field == "radio.tx_model"));
    }

    #[test]
    fn validation_catches_initial_voltage_above_supply() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.capacitor.max_initial_voltage_v = 5.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "capacitor.max_initial_voltage_v"));
    }

    #[test]
    fn validation_catches_unrepresentable_durations() {
        let cases = [
            ("simulation", "duration_s", "inf"),
            ("simulation", "duration_s", "1e30"),
            ("capacitor", "update_interval_s", "1e30"),
            ("capacitor", "update_interval_s", "inf"),
            ("radio", "turn_on_duration_s", "inf"),
            ("harvester", "update_interval_s", "1e30"),
            ("application", "min_interval_s", "inf"),
            ("application", "max_desync_delay_s", "1e30"),
            ("uplink", "time_on_air_s", "inf"),
            ("uplink", "receive_delay_s", "1e30"),
            ("uplink", "receive_window_s", "inf"),
        ];
        for (section, key, value) in cases {
            let toml = format!("[{section}]\n{key} = {value}\n");
            let cfg = ScenarioConfig::from_toml_str(&toml);
            let Ok(cfg) = cfg else {
                panic!("{section}.{key} = {value} should parse");
            };
            let field = format!("{section}.{key}");
            let errors = cfg.validate();
            assert!(
                errors.iter().any(|e| e.field == field),
                "{field} = {value} should be rejected: {errors:?}"
            );
        }
    }

    #[test]
    fn long_but_representable_durations_pass() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.duration_s = 365.0 * 86_400.0;
        cfg.application.max_desync_delay_s = 86_400.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn fleet_scatters_initial_charge() {
        let fleet = ScenarioConfig::fleet();
        assert!(fleet.simulation.devices > 1);
        assert!(fleet.capacitor.min_initial_voltage_v < fleet.capacitor.max_initial_voltage_v);
    }

    #[test]
    fn config_error_display() {
        let e = err("capacitor.capacitance_f", "must be > 0");
        assert_eq!(e.to_string(), "config error: capacitor.capacitance_f: must be > 0");
    }
}
