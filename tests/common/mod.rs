//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use capsim::config::ScenarioConfig;
use capsim::devices::{
    CapacitorEnergySource, CapacitorParams, ConstantRangeHarvester, EndDevice, HarvesterKind,
    RadioCurrentTable, RadioEnergyModel, RadioParams,
};
use capsim::io::trace::MemoryRecorder;
use capsim::sim::engine::Engine;
use capsim::sim::types::SimConfig;

/// Supply voltage of the default capacitor.
pub const VS: f64 = 3.3;

/// Default capacitor (10 mF, 3.3 V, thresholds 0.545 / 0.909) charged to `v0`.
pub fn capacitor(v0: f64) -> CapacitorEnergySource {
    CapacitorEnergySource::new(CapacitorParams::default(), v0)
        .unwrap_or_else(|e| panic!("fixture capacitor: {e}"))
}

/// Harvester delivering exactly `power_w`, or none for zero.
pub fn harvester(power_w: f64) -> HarvesterKind {
    if power_w > 0.0 {
        HarvesterKind::Constant(ConstantRangeHarvester::new(
            power_w,
            power_w,
            Duration::from_secs(10),
            1,
        ))
    } else {
        HarvesterKind::Disabled
    }
}

/// Device without application, default currents, 0.3 s turn-on delay.
pub fn device(id: usize, v0: f64, harvest_w: f64, sleep_if_depleted: bool) -> EndDevice {
    let radio = RadioEnergyModel::new(
        RadioCurrentTable::default(),
        RadioParams {
            enter_sleep_if_depleted: sleep_if_depleted,
            turn_on_duration: Duration::from_millis(300),
            ..RadioParams::default()
        },
    );
    EndDevice::new(id, capacitor(v0), radio, harvester(harvest_w))
}

/// Engine over `devices` recording every trace point in memory.
pub fn engine(duration_s: f64, devices: Vec<EndDevice>) -> Engine<MemoryRecorder> {
    let n = devices.len();
    Engine::new(SimConfig::new(duration_s, n, 42), devices, MemoryRecorder::new())
}

/// Preset shortened to `duration_s` with `devices` devices.
pub fn preset(name: &str, duration_s: f64, devices: usize) -> ScenarioConfig {
    let mut cfg =
        ScenarioConfig::from_preset(name).unwrap_or_else(|e| panic!("fixture preset: {e}"));
    cfg.simulation.duration_s = duration_s;
    cfg.simulation.devices = devices;
    cfg
}
