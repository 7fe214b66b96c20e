//! Energy simulator for battery-less LoRaWAN end devices powered by a
//! harvester-fed capacitor.

pub mod config;
pub mod devices;
pub mod error;
/// Trace recording and report export.
pub mod io;
pub mod runner;
/// Event queue, fleet engine and reports.
pub mod sim;
