//! A battery-less end device: capacitor, radio, harvester and application.
//!
//! Every state transition of the radio goes through
//! [`EndDevice::request_transition`], which consults the capacitor, charges the
//! dwell in the previous state to the radio energy model and updates the
//! capacitor. Capacitor notifications flow back: a drain forces the radio
//! down, a recharge turns it back on, and changed/constant notifications
//! give the application a chance to send.

use tracing::{debug, info, warn};

use super::capacitor::{CapacitorEnergySource, EnergySubscriber, OperatingPoint};
use super::harvester::HarvesterKind;
use super::phy::{Admission, PhyStateMachine, StateListener};
use super::radio_energy::RadioEnergyModel;
use super::sender::EnergyAwareSender;
use super::types::{
    DeviceEvent, EnergyEvent, EnergyNotification, Harvester, PhyState, StateChange, TracePoint,
};
use super::uplink::{UplinkCycle, UplinkParams, UplinkPhase};
use crate::error::EnergyError;
use crate::sim::event::{EventId, Scheduler};

/// Counters kept per device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Drained notifications.
    pub depletions: u64,
    /// Recharged notifications.
    pub recharges: u64,
    /// Energy-gated transitions refused because the source was depleted.
    pub transitions_refused: u64,
    /// Uplinks that entered TX.
    pub tx_started: u64,
    /// Uplinks that could not enter TX.
    pub tx_refused: u64,
}

pub struct EndDevice {
    id: usize,
    source: CapacitorEnergySource,
    radio: RadioEnergyModel,
    phy: PhyStateMachine,
    harvester: HarvesterKind,
    sender: Option<EnergyAwareSender>,
    uplink: UplinkCycle,
    harvester_event: Option<EventId>,
    turn_on_event: Option<EventId>,
    trace: Vec<TracePoint>,
    stats: DeviceStats,
}

impl EndDevice {
    /// Assembles a device without an application.
    ///
    /// # Arguments
    ///
    /// * `id` - Device index, used in logs
    /// * `source` - Capacitor energy source
    /// * `radio` - Radio energy model, starting in SLEEP like the phy
    /// * `harvester` - Ambient power source
    pub fn new(
        id: usize,
        source: CapacitorEnergySource,
        radio: RadioEnergyModel,
        harvester: HarvesterKind,
    ) -> Self {
        Self {
            id,
            source,
            radio,
            phy: PhyStateMachine::new(),
            harvester,
            sender: None,
            uplink: UplinkCycle::new(UplinkParams::default()),
            harvester_event: None,
            turn_on_event: None,
            trace: Vec::new(),
            stats: DeviceStats::default(),
        }
    }

    /// Attaches an energy-aware sender that drives uplinks with `uplink` timing.
    pub fn with_application(mut self, sender: EnergyAwareSender, uplink: UplinkParams) -> Self {
        self.sender = Some(sender);
        self.uplink = UplinkCycle::new(uplink);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Current phy state.
    pub fn state(&self) -> PhyState {
        self.phy.state()
    }

    pub fn is_depleted(&self) -> bool {
        self.source.is_depleted()
    }

    pub fn source(&self) -> &CapacitorEnergySource {
        &self.source
    }

    pub fn radio(&self) -> &RadioEnergyModel {
        &self.radio
    }

    pub fn sender(&self) -> Option<&EnergyAwareSender> {
        self.sender.as_ref()
    }

    pub fn uplink(&self) -> &UplinkCycle {
        &self.uplink
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    pub fn total_energy_consumption_j(&self) -> f64 {
        self.radio.total_energy_consumption_j()
    }

    pub fn total_energy_harvested_j(&self) -> f64 {
        self.harvester.total_energy_harvested_j()
    }

    /// Stored energy, bringing the capacitor up to date first.
    pub fn remaining_energy_j(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) -> f64 {
        self.update_energy_source(sched);
        self.source.remaining_energy_j()
    }

    /// Voltage relative to the supply voltage, bringing the capacitor up to date first.
    pub fn voltage_fraction(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) -> f64 {
        self.update_energy_source(sched);
        self.source.voltage_fraction()
    }

    /// Registers a callback for every capacitor update.
    pub fn subscribe_energy(&mut self, subscriber: EnergySubscriber) {
        self.source.subscribe(subscriber);
    }

    /// Registers a callback for every phy transition.
    ///
    /// A refused request that leaves the radio where it was is delivered too,
    /// as a change with `from == to`.
    pub fn subscribe_state(&mut self, listener: StateListener) {
        self.phy.register_listener(listener);
    }

    /// Takes the trace points produced since the last call.
    pub fn drain_trace(&mut self) -> Vec<TracePoint> {
        std::mem::take(&mut self.trace)
    }

    fn operating_point(&self) -> OperatingPoint {
        OperatingPoint::new(self.radio.load_current_a(), self.harvester.power_w())
    }

    /// Starts the harvester schedule and the first capacitor evaluation.
    pub fn start(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        info!(
            device = self.id,
            voltage_v = self.source.voltage_v(),
            harvester = self.harvester.harvester_type(),
            "device started"
        );
        let interval = self.harvester.update_interval();
        if !interval.is_zero() {
            self.harvester_event = Some(sched.schedule_in(interval, DeviceEvent::HarvesterUpdate));
        }
        self.update_energy_source(sched);
    }

    /// Brings the capacitor up to date and cancels the device's own timers.
    pub fn stop(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        self.update_energy_source(sched);
        self.source.stop(sched);
        if let Some(id) = self.harvester_event.take() {
            sched.cancel(id);
        }
        if let Some(id) = self.turn_on_event.take() {
            sched.cancel(id);
        }
    }

    /// Dispatches a scheduled event addressed to this device.
    pub fn handle(&mut self, event: DeviceEvent, sched: &mut dyn Scheduler<DeviceEvent>) {
        match event {
            DeviceEvent::VoltageUpdate | DeviceEvent::ThresholdCheck => {
                self.update_energy_source(sched);
            }
            DeviceEvent::HarvesterUpdate => self.update_harvester(sched),
            DeviceEvent::TurnOnComplete => {
                self.turn_on_event = None;
                if self.phy.state() == PhyState::TurnOn {
                    self.request_transition(PhyState::Sleep, None, sched);
                }
            }
            DeviceEvent::AppSend => self.start_uplink(sched),
            DeviceEvent::TxEnd => self.end_tx(sched),
            DeviceEvent::RxWindowOpen => self.open_rx_window(sched),
            DeviceEvent::RxWindowClose => self.close_rx_window(sched),
        }
    }

    /// Requests a move to `target`. Returns `true` if the radio ends up there.
    ///
    /// SLEEP and OFF are always reachable (SLEEP not from OFF). TURNON only
    /// from OFF. Other states need a non-depleted capacitor; when it is
    /// depleted the radio is forced to SLEEP or OFF per policy instead.
    /// Repeating the current state is a successful no-op.
    pub fn request_transition(
        &mut self,
        target: PhyState,
        tx_power_dbm: Option<f64>,
        sched: &mut dyn Scheduler<DeviceEvent>,
    ) -> bool {
        match self.phy.admission(target) {
            Admission::AlreadyThere => true,
            Admission::Rejected => {
                debug!(device = self.id, from = %self.phy.state(), to = %target, "transition rejected");
                false
            }
            Admission::Unconditional => {
                self.commit(target, None, sched);
                self.phy.state() == target
            }
            Admission::EnergyGated => {
                self.update_energy_source(sched);
                if self.source.is_depleted() {
                    self.stats.transitions_refused += 1;
                    debug!(device = self.id, requested = %target, "energy depleted, transition refused");
                    let before = self.phy.state();
                    let fallback = self.radio.depletion_state();
                    self.request_transition(fallback, None, sched);
                    if self.phy.state() == before {
                        self.phy.apply(StateChange {
                            time: sched.now(),
                            from: before,
                            to: before,
                            tx_power_dbm: None,
                        });
                    }
                    return false;
                }
                if self.phy.state() == target {
                    return true;
                }
                if target == PhyState::Tx {
                    if let Some(power) = tx_power_dbm {
                        self.radio.apply_tx_power(power);
                    }
                }
                self.commit(target, tx_power_dbm, sched);
                self.phy.state() == target
            }
        }
    }

    fn commit(
        &mut self,
        target: PhyState,
        tx_power_dbm: Option<f64>,
        sched: &mut dyn Scheduler<DeviceEvent>,
    ) {
        let change = StateChange {
            time: sched.now(),
            from: self.phy.state(),
            to: target,
            tx_power_dbm,
        };
        self.phy.apply(change);
        if change.from == PhyState::TurnOn {
            if let Some(id) = self.turn_on_event.take() {
                sched.cancel(id);
            }
        }
        self.trace.push(TracePoint::State {
            time: change.time,
            from: change.from,
            to: change.to,
        });
        self.radio_change_state(target, sched);
    }

    /// Charges the dwell in the recorded state, updates the capacitor with
    /// that state's load, then records `new_state` unless a nested transition
    /// triggered by the update superseded it.
    fn radio_change_state(&mut self, new_state: PhyState, sched: &mut dyn Scheduler<DeviceEvent>) {
        let now = sched.now();
        let since_update = now.saturating_since(self.source.last_update()).as_secs_f64();
        let end_v = match self.source.predict_voltage(self.operating_point(), since_update) {
            Ok(v) => v,
            // open circuit: the voltage is held, and the update below reports it
            Err(EnergyError::NoConductionPath) => self.source.voltage_v(),
            Err(e) => {
                warn!(device = self.id, error = %e, "dwell voltage unavailable, using last value");
                self.source.voltage_v()
            }
        };
        self.radio.begin_change(now, end_v);
        self.trace.push(TracePoint::Consumption {
            time: now,
            total_j: self.radio.total_energy_consumption_j(),
        });

        self.update_energy_source(sched);

        if self.radio.finish_change(new_state) {
            self.source
                .rearm_threshold_check(self.operating_point(), sched);
        }
    }

    fn update_energy_source(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) -> EnergyEvent {
        let event = self.source.update(self.operating_point(), sched);
        self.trace.push(TracePoint::Voltage {
            time: event.time,
            voltage_v: event.voltage_v,
            energy_j: event.remaining_energy_j,
        });

        match event.kind {
            EnergyNotification::Drained => {
                self.stats.depletions += 1;
                self.trace.push(TracePoint::Notification {
                    time: event.time,
                    kind: event.kind,
                });
                self.handle_depletion(sched);
            }
            EnergyNotification::Recharged => {
                self.stats.recharges += 1;
                self.trace.push(TracePoint::Notification {
                    time: event.time,
                    kind: event.kind,
                });
                self.handle_recharge(sched);
            }
            EnergyNotification::Changed | EnergyNotification::Constant => {
                if let Some(sender) = self.sender.as_mut() {
                    sender.on_energy(&event, sched);
                }
            }
        }
        event
    }

    fn handle_depletion(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        let target = self.radio.depletion_state();
        info!(device = self.id, state = %self.phy.state(), target = %target, "energy depleted, forcing radio down");
        self.request_transition(target, None, sched);
    }

    fn handle_recharge(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        info!(device = self.id, state = %self.phy.state(), "energy recharged");
        if self.phy.state() == PhyState::Off {
            if self.request_transition(PhyState::TurnOn, None, sched) {
                let delay = self.radio.params().turn_on_duration;
                self.turn_on_event = Some(sched.schedule_in(delay, DeviceEvent::TurnOnComplete));
            }
        } else {
            self.request_transition(PhyState::Sleep, None, sched);
        }
    }

    /// Credits the old power to the elapsed interval, then resamples.
    fn update_harvester(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        self.update_energy_source(sched);
        let power = self.harvester.resample(sched.now());
        debug!(device = self.id, power_w = power, "harvester resampled");
        self.harvester_event = Some(sched.schedule_in(
            self.harvester.update_interval(),
            DeviceEvent::HarvesterUpdate,
        ));
        self.source
            .rearm_threshold_check(self.operating_point(), sched);
    }

    fn start_uplink(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        let now = sched.now();
        let Some(sender) = self.sender.as_mut() else {
            return;
        };
        let size = sender.send(now);
        if self.uplink.is_busy() {
            debug!(device = self.id, "uplink in progress, packet not sent");
            sender.on_sending_not_possible();
            self.stats.tx_refused += 1;
            return;
        }

        let power = self.uplink.params().tx_power_dbm;
        let started = self.request_transition(PhyState::Tx, Some(power), sched);
        if let Some(sender) = self.sender.as_mut() {
            if started {
                sender.on_started_sending();
            } else {
                sender.on_sending_not_possible();
            }
        }
        if started {
            debug!(device = self.id, size, "uplink started");
            self.stats.tx_started += 1;
            self.uplink.advance(UplinkPhase::Transmitting);
            sched.schedule_in(self.uplink.params().time_on_air, DeviceEvent::TxEnd);
        } else {
            self.stats.tx_refused += 1;
        }
    }

    fn end_tx(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        if !self.uplink.check(UplinkPhase::Transmitting, self.phy.state()) {
            return;
        }
        if self.request_transition(PhyState::Standby, None, sched) {
            self.uplink.advance(UplinkPhase::AwaitingWindow);
            sched.schedule_in(self.uplink.params().receive_delay, DeviceEvent::RxWindowOpen);
        } else {
            self.uplink.abort();
        }
    }

    fn open_rx_window(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        if !self.uplink.check(UplinkPhase::AwaitingWindow, self.phy.state()) {
            return;
        }
        if self.request_transition(PhyState::Rx, None, sched) {
            self.uplink.advance(UplinkPhase::Receiving);
            sched.schedule_in(self.uplink.params().receive_window, DeviceEvent::RxWindowClose);
        } else {
            self.uplink.abort();
        }
    }

    fn close_rx_window(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        if !self.uplink.check(UplinkPhase::Receiving, self.phy.state()) {
            return;
        }
        if self.request_transition(PhyState::Sleep, None, sched) {
            self.uplink.complete();
        } else {
            self.uplink.abort();
        }
    }
}
