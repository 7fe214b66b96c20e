//! Builds a fleet from a [`ScenarioConfig`] and runs it.

use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::config::{MAX_DURATION_S, ScenarioConfig};
use crate::devices::capacitor::{CapacitorEnergySource, CapacitorParams};
use crate::devices::current_table::{RadioCurrentTable, TxCurrentModel};
use crate::devices::end_device::EndDevice;
use crate::devices::harvester::{ConstantRangeHarvester, HarvesterKind};
use crate::devices::harvester_trace::{FileHarvester, TraceFormat};
use crate::devices::radio_energy::{RadioEnergyModel, RadioParams};
use crate::devices::sender::{EnergyAwareSender, SenderParams};
use crate::devices::uplink::UplinkParams;
use crate::error::EnergyError;
use crate::io::trace::TraceRecorder;
use crate::sim::engine::Engine;
use crate::sim::kpi::EnergyReport;
use crate::sim::types::SimConfig;

/// Seed offsets so the random streams of one device stay independent.
const HARVESTER_SEED_OFFSET: u64 = 1;
const SENDER_SEED_OFFSET: u64 = 2;
const VOLTAGE_SEED_OFFSET: u64 = 3;

/// Outcome of [`run_scenario`].
pub struct SimulationResult<R> {
    pub report: EnergyReport,
    pub recorder: R,
}

/// Converts a config time field; out-of-range values saturate instead of
/// panicking for callers that skip validation.
fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s.clamp(0.0, MAX_DURATION_S)).unwrap_or(Duration::ZERO)
}

fn capacitor_params(cfg: &ScenarioConfig) -> CapacitorParams {
    let c = &cfg.capacitor;
    CapacitorParams {
        capacitance_f: c.capacitance_f,
        supply_voltage_v: c.supply_voltage_v,
        low_threshold: c.low_threshold,
        high_threshold: c.high_threshold,
        update_interval: secs(c.update_interval_s),
    }
}

fn radio_params(cfg: &ScenarioConfig) -> RadioParams {
    let r = &cfg.radio;
    let tx_current_model = match r.tx_model.as_str() {
        "constant" => Some(TxCurrentModel::Constant {
            current_a: r.tx_constant_current_a,
        }),
        "linear" => Some(TxCurrentModel::Linear {
            eta: r.tx_eta,
            voltage_v: r.tx_voltage_v,
            standby_current_a: r.tx_standby_current_a,
        }),
        _ => None,
    };
    RadioParams {
        reference_voltage_v: r.reference_voltage_v,
        enter_sleep_if_depleted: r.enter_sleep_if_depleted,
        turn_on_duration: secs(r.turn_on_duration_s),
        tx_current_model,
    }
}

fn sender_params(cfg: &ScenarioConfig) -> SenderParams {
    let a = &cfg.application;
    SenderParams {
        energy_threshold_j: a.energy_threshold_j,
        min_interval: secs(a.min_interval_s),
        max_desync_delay: secs(a.max_desync_delay_s),
        packet_size: a.packet_size,
        packet_size_jitter: a.packet_size_jitter,
    }
}

fn uplink_params(cfg: &ScenarioConfig) -> UplinkParams {
    let u = &cfg.uplink;
    UplinkParams {
        tx_power_dbm: u.tx_power_dbm,
        time_on_air: secs(u.time_on_air_s),
        receive_delay: secs(u.receive_delay_s),
        receive_window: secs(u.receive_window_s),
    }
}

fn build_harvester(cfg: &ScenarioConfig, seed: u64) -> Result<HarvesterKind, EnergyError> {
    let h = &cfg.harvester;
    let interval = secs(h.update_interval_s);
    let harvester = match h.model.as_str() {
        "constant" => HarvesterKind::Constant(ConstantRangeHarvester::new(
            h.min_power_w,
            h.max_power_w,
            interval,
            seed,
        )),
        "file" => {
            let format = TraceFormat {
                has_header: h.has_header,
                power_column: h.power_column,
            };
            let mut rng = StdRng::seed_from_u64(seed);
            HarvesterKind::File(FileHarvester::load(
                &h.files,
                format,
                h.variability_w,
                interval,
                &mut rng,
            )?)
        }
        _ => HarvesterKind::Disabled,
    };
    Ok(harvester)
}

/// Builds device `index` of the fleet described by `cfg`.
///
/// # Errors
///
/// Returns an error if the radio currents are incomplete, the capacitor
/// parameters are invalid or a harvester trace cannot be parsed.
pub fn build_device(cfg: &ScenarioConfig, sim: &SimConfig, index: usize) -> Result<EndDevice, EnergyError> {
    let seed = sim.device_seed(index);
    let table = RadioCurrentTable::from_map(&cfg.radio.current_map()?)?;
    let radio = RadioEnergyModel::new(table, radio_params(cfg));

    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(VOLTAGE_SEED_OFFSET));
    let source = CapacitorEnergySource::with_random_initial_voltage(
        capacitor_params(cfg),
        cfg.capacitor.min_initial_voltage_v,
        cfg.capacitor.max_initial_voltage_v,
        &mut rng,
    )?;

    let harvester = build_harvester(cfg, seed.wrapping_add(HARVESTER_SEED_OFFSET))?;
    let device = EndDevice::new(index, source, radio, harvester);
    if cfg.application.enabled {
        let sender = EnergyAwareSender::new(
            sender_params(cfg),
            seed.wrapping_add(SENDER_SEED_OFFSET),
        );
        Ok(device.with_application(sender, uplink_params(cfg)))
    } else {
        Ok(device)
    }
}

/// Validates `cfg` and builds an engine holding its whole fleet.
///
/// # Errors
///
/// Returns the first validation error, or any error of [`build_device`].
pub fn build_engine<R: TraceRecorder>(cfg: &ScenarioConfig, recorder: R) -> Result<Engine<R>, EnergyError> {
    if let Some(first) = cfg.validate().into_iter().next() {
        return Err(first.into());
    }
    let s = &cfg.simulation;
    let sim = SimConfig::new(s.duration_s, s.devices, s.seed);
    let devices = (0..sim.devices)
        .map(|i| build_device(cfg, &sim, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Engine::new(sim, devices, recorder))
}

/// Runs the scenario to completion and reports on every device.
///
/// # Errors
///
/// Returns an error if the scenario is invalid or the recorder fails.
pub fn run_scenario<R: TraceRecorder>(
    cfg: &ScenarioConfig,
    recorder: R,
) -> Result<SimulationResult<R>, EnergyError> {
    let mut engine = build_engine(cfg, recorder)?;
    engine.run()?;
    let report = EnergyReport::from_fleet(engine.devices(), cfg.simulation.duration_s);
    info!(
        devices = report.devices.len(),
        consumed_j = report.total_consumed_j,
        depleted = report.depleted_devices,
        "scenario finished"
    );
    Ok(SimulationResult {
        report,
        recorder: engine.into_recorder(),
    })
}
