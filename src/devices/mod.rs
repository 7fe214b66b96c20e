//! Energy models of a capacitor-powered LoRaWAN end device.

/// Analytic RC capacitor energy source.
pub mod capacitor;
/// Per-state radio current table and TX power model.
pub mod current_table;
/// End device wiring source, radio, harvester and application together.
pub mod end_device;
pub mod harvester;
/// Power traces read from files.
pub mod harvester_trace;
/// Observable radio state machine.
pub mod phy;
/// Radio energy accounting.
pub mod radio_energy;
/// Energy-aware traffic generator.
pub mod sender;
pub mod types;
/// Class-A uplink sequencing.
pub mod uplink;

// Re-export the main types for convenience
pub use capacitor::{CapacitorEnergySource, CapacitorParams, OperatingPoint};
pub use current_table::{RadioCurrentTable, TxCurrentModel};
pub use end_device::{DeviceStats, EndDevice};
pub use harvester::{ConstantRangeHarvester, HarvesterKind};
pub use harvester_trace::{FileHarvester, TraceFormat};
pub use radio_energy::{RadioEnergyModel, RadioParams};
pub use sender::{EnergyAwareSender, SenderParams};
pub use types::{DeviceEvent, EnergyNotification, Harvester, PhyState, TracePoint};
pub use uplink::{UplinkCycle, UplinkParams};
