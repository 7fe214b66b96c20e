//! Post-run energy reports, per device and for the fleet.

use std::fmt;

use serde::Serialize;

use crate::devices::end_device::EndDevice;
use crate::devices::types::PhyState;

/// End-of-run snapshot of one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device: usize,
    pub final_state: PhyState,
    pub depleted: bool,
    pub initial_voltage_v: f64,
    pub final_voltage_v: f64,
    pub initial_energy_j: f64,
    pub remaining_energy_j: f64,
    /// Remaining energy relative to a capacitor charged to the supply voltage.
    pub energy_fraction: f64,
    pub consumed_j: f64,
    pub harvested_j: f64,
    pub depletions: u64,
    pub recharges: u64,
    pub transitions_refused: u64,
    pub tx_started: u64,
    pub tx_refused: u64,
    pub uplinks_completed: u64,
    pub uplinks_aborted: u64,
    pub packets_generated: u64,
}

impl DeviceReport {
    /// Reads the counters and the last capacitor state of `device`.
    ///
    /// The capacitor is not updated; call this after the engine finished.
    pub fn from_device(device: &EndDevice) -> Self {
        let source = device.source();
        let stats = device.stats();
        Self {
            device: device.id(),
            final_state: device.state(),
            depleted: device.is_depleted(),
            initial_voltage_v: source.initial_voltage_v(),
            final_voltage_v: source.voltage_v(),
            initial_energy_j: source.initial_energy_j(),
            remaining_energy_j: source.remaining_energy_j(),
            energy_fraction: source.energy_fraction(),
            consumed_j: device.total_energy_consumption_j(),
            harvested_j: device.total_energy_harvested_j(),
            depletions: stats.depletions,
            recharges: stats.recharges,
            transitions_refused: stats.transitions_refused,
            tx_started: stats.tx_started,
            tx_refused: stats.tx_refused,
            uplinks_completed: device.uplink().completed(),
            uplinks_aborted: device.uplink().aborted(),
            packets_generated: device.sender().map_or(0, |s| s.packets_generated()),
        }
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device {:>3}: {:<7} V={:.3} V ({:.1}% energy), consumed={:.4} J, \
             harvested={:.4} J, depletions={}, recharges={}, uplinks={}/{}",
            self.device,
            self.final_state.as_str(),
            self.final_voltage_v,
            100.0 * self.energy_fraction,
            self.consumed_j,
            self.harvested_j,
            self.depletions,
            self.recharges,
            self.uplinks_completed,
            self.tx_started,
        )
    }
}

/// Fleet-level aggregate of the device reports.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyReport {
    pub duration_s: f64,
    pub devices: Vec<DeviceReport>,
    pub total_consumed_j: f64,
    pub total_harvested_j: f64,
    /// Devices still depleted at the end of the run.
    pub depleted_devices: usize,
    pub total_depletions: u64,
    pub total_recharges: u64,
    pub uplinks_completed: u64,
    pub uplinks_aborted: u64,
    pub packets_generated: u64,
    pub mean_energy_fraction: f64,
}

impl EnergyReport {
    /// Aggregates the reports of a complete run.
    ///
    /// # Arguments
    ///
    /// * `devices` - One report per device
    /// * `duration_s` - Simulated time covered by the run
    pub fn from_devices(devices: Vec<DeviceReport>, duration_s: f64) -> Self {
        let mean_energy_fraction = if devices.is_empty() {
            0.0
        } else {
            devices.iter().map(|d| d.energy_fraction).sum::<f64>() / devices.len() as f64
        };
        Self {
            duration_s,
            total_consumed_j: devices.iter().map(|d| d.consumed_j).sum(),
            total_harvested_j: devices.iter().map(|d| d.harvested_j).sum(),
            depleted_devices: devices.iter().filter(|d| d.depleted).count(),
            total_depletions: devices.iter().map(|d| d.depletions).sum(),
            total_recharges: devices.iter().map(|d| d.recharges).sum(),
            uplinks_completed: devices.iter().map(|d| d.uplinks_completed).sum(),
            uplinks_aborted: devices.iter().map(|d| d.uplinks_aborted).sum(),
            packets_generated: devices.iter().map(|d| d.packets_generated).sum(),
            mean_energy_fraction,
            devices,
        }
    }

    /// Builds the fleet report straight from the devices.
    pub fn from_fleet(devices: &[EndDevice], duration_s: f64) -> Self {
        Self::from_devices(devices.iter().map(DeviceReport::from_device).collect(), duration_s)
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Report ({:.0} s) ---", self.duration_s)?;
        writeln!(f, "Devices:               {}", self.devices.len())?;
        writeln!(f, "Depleted at end:       {}", self.depleted_devices)?;
        writeln!(f, "Total consumed:        {:.4} J", self.total_consumed_j)?;
        writeln!(f, "Total harvested:       {:.4} J", self.total_harvested_j)?;
        writeln!(
            f,
            "Depletions/recharges:  {} / {}",
            self.total_depletions, self.total_recharges
        )?;
        writeln!(
            f,
            "Uplinks:               {} completed, {} aborted, {} packets generated",
            self.uplinks_completed, self.uplinks_aborted, self.packets_generated
        )?;
        write!(
            f,
            "Mean energy left:      {:.1}%",
            100.0 * self.mean_energy_fraction
        )
    }
}
