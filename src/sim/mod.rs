/// Virtual simulation time.
pub mod clock;
pub mod engine;
/// Cancelable event scheduling.
pub mod event;
pub mod kpi;
pub mod types;
