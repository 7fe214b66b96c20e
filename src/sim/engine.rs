//! Fleet engine: one shared event queue driving every end device.

use tracing::{debug, info};

use crate::devices::end_device::EndDevice;
use crate::devices::types::DeviceEvent;
use crate::error::EnergyError;
use crate::io::trace::TraceRecorder;

use super::clock::SimTime;
use super::event::{EventId, EventQueue, Scheduler};
use super::types::SimConfig;

/// Per-device view of the fleet queue: events scheduled through it are
/// tagged with the device index.
pub struct Tagged<'a> {
    queue: &'a mut EventQueue<(usize, DeviceEvent)>,
    device: usize,
}

impl<'a> Tagged<'a> {
    pub fn new(queue: &'a mut EventQueue<(usize, DeviceEvent)>, device: usize) -> Self {
        Self { queue, device }
    }
}

impl Scheduler<DeviceEvent> for Tagged<'_> {
    fn now(&self) -> SimTime {
        self.queue.now()
    }

    fn schedule_at(&mut self, at: SimTime, event: DeviceEvent) -> EventId {
        self.queue.schedule_at(at, (self.device, event))
    }

    fn cancel(&mut self, id: EventId) -> bool {
        self.queue.cancel(id)
    }

    fn is_pending(&self, id: EventId) -> bool {
        self.queue.is_pending(id)
    }
}

/// Simulation engine owning the devices, the event queue and the trace sink.
///
/// Generic over `R: TraceRecorder` for static dispatch; the recorder is
/// handed back by [`Engine::into_recorder`] once the run is over.
pub struct Engine<R: TraceRecorder> {
    config: SimConfig,
    devices: Vec<EndDevice>,
    queue: EventQueue<(usize, DeviceEvent)>,
    recorder: R,
    started: bool,
    events_dispatched: u64,
}

impl<R: TraceRecorder> Engine<R> {
    /// Creates an engine at t = 0. Nothing runs until [`Engine::start`].
    ///
    /// # Arguments
    ///
    /// * `config` - Duration and seeding of the run
    /// * `devices` - The fleet; device `i` receives the events tagged `i`
    /// * `recorder` - Sink for the trace points the devices emit
    pub fn new(config: SimConfig, devices: Vec<EndDevice>, recorder: R) -> Self {
        Self {
            config,
            devices,
            queue: EventQueue::new(),
            recorder,
            started: false,
            events_dispatched: 0,
        }
    }

    /// Starts every device at the current time. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder fails.
    pub fn start(&mut self) -> Result<(), EnergyError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        info!(devices = self.devices.len(), duration = ?self.config.duration, "simulation started");
        for i in 0..self.devices.len() {
            let mut sched = Tagged::new(&mut self.queue, i);
            self.devices[i].start(&mut sched);
            self.flush_trace(i)?;
        }
        Ok(())
    }

    /// Dispatches every event due no later than `until`, then moves the clock there.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder fails.
    pub fn run_until(&mut self, until: SimTime) -> Result<(), EnergyError> {
        self.start()?;
        while let Some((_, (i, event))) = self.queue.pop_until(until) {
            let mut sched = Tagged::new(&mut self.queue, i);
            self.devices[i].handle(event, &mut sched);
            self.events_dispatched += 1;
            self.flush_trace(i)?;
        }
        if until > self.queue.now() {
            self.queue.advance_to(until);
        }
        Ok(())
    }

    /// Runs to the configured stop time and stops every device.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder fails.
    pub fn run(&mut self) -> Result<(), EnergyError> {
        self.run_until(self.config.stop_time())?;
        self.finish()
    }

    /// Brings every device up to date, cancels its timers and closes the recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder fails.
    pub fn finish(&mut self) -> Result<(), EnergyError> {
        for i in 0..self.devices.len() {
            let mut sched = Tagged::new(&mut self.queue, i);
            self.devices[i].stop(&mut sched);
            self.flush_trace(i)?;
        }
        debug!(
            events = self.events_dispatched,
            pending = self.queue.len(),
            "simulation finished"
        );
        self.recorder.finish()
    }

    /// Runs `f` on device `index` with its scheduler, the way a MAC layer would.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder fails.
    pub fn act_on<T>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut EndDevice, &mut dyn Scheduler<DeviceEvent>) -> T,
    ) -> Result<T, EnergyError> {
        let mut sched = Tagged::new(&mut self.queue, index);
        let out = f(&mut self.devices[index], &mut sched);
        self.flush_trace(index)?;
        Ok(out)
    }

    fn flush_trace(&mut self, index: usize) -> Result<(), EnergyError> {
        for point in self.devices[index].drain_trace() {
            self.recorder.record(index, &point)?;
        }
        Ok(())
    }

    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    pub fn devices(&self) -> &[EndDevice] {
        &self.devices
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn into_recorder(self) -> R {
        self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::capacitor::{CapacitorEnergySource, CapacitorParams};
    use crate::devices::current_table::RadioCurrentTable;
    use crate::devices::harvester::HarvesterKind;
    use crate::devices::radio_energy::{RadioEnergyModel, RadioParams};
    use crate::devices::types::PhyState;
    use crate::io::trace::MemoryRecorder;

    fn dark_device(id: usize, v0: f64) -> EndDevice {
        let source = CapacitorEnergySource::new(CapacitorParams::default(), v0)
            .unwrap_or_else(|e| panic!("{e}"));
        let radio = RadioEnergyModel::new(RadioCurrentTable::default(), RadioParams::default());
        EndDevice::new(id, source, radio, HarvesterKind::Disabled)
    }

    #[test]
    fn tagged_scheduler_routes_events_to_their_device() {
        let mut q = EventQueue::new();
        let id = {
            let mut s = Tagged::new(&mut q, 4);
            s.schedule_in(std::time::Duration::from_secs(1), DeviceEvent::AppSend)
        };
        assert!(Tagged::new(&mut q, 0).is_pending(id));
        let popped = q.pop_until(SimTime::from_secs_f64(2.0));
        assert_eq!(popped.map(|(_, e)| e), Some((4, DeviceEvent::AppSend)));
    }

    #[test]
    fn run_stops_at_configured_time() {
        let devices = vec![dark_device(0, 3.3), dark_device(1, 3.0)];
        let mut engine = Engine::new(SimConfig::new(10.0, 2, 1), devices, MemoryRecorder::new());
        engine.run().ok();
        assert_eq!(engine.now(), SimTime::from_secs_f64(10.0));
        // one periodic update per second per device
        assert!(engine.events_dispatched() >= 20);
        for d in engine.devices() {
            assert_eq!(d.source().last_update(), SimTime::from_secs_f64(10.0));
        }
    }

    #[test]
    fn act_on_drives_a_device_and_records_its_trace() {
        let devices = vec![dark_device(0, 3.3)];
        let mut engine = Engine::new(SimConfig::new(5.0, 1, 1), devices, MemoryRecorder::new());
        engine.start().ok();
        let ok = engine
            .act_on(0, |d, s| d.request_transition(PhyState::Rx, None, s))
            .unwrap_or(false);
        assert!(ok);
        engine.run_until(SimTime::from_secs_f64(2.0)).ok();
        let fraction = engine
            .act_on(0, |d, s| d.voltage_fraction(s))
            .unwrap_or(1.0);
        assert!(fraction < 1.0);
        assert!(engine.recorder().for_device(0).any(|p| matches!(
            p,
            crate::devices::types::TracePoint::State { to: PhyState::Rx, .. }
        )));
    }
}
