//! Analytic RC model of a harvester-fed storage capacitor.
//!
//! Between two events the load current and the harvested power are constant,
//! so the capacitor voltage follows the closed-form solution of
//! `dV/dt = (A - V) / tau`:
//!
//! ```text
//! V(t) = A * (1 - e^(-t/tau)) + V0 * e^(-t/tau)
//! ```
//!
//! with the harvester modelled as a source of internal resistance
//! `ri = Vs^2 / P`, the load as `Rload = Vs / I`, `tau = Req * C` and
//! `A = Vs * Req / ri`. The voltage is only evaluated when something asks for
//! it or when a predicted threshold crossing fires.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::types::{DeviceEvent, EnergyEvent, EnergyNotification};
use crate::error::EnergyError;
use crate::sim::clock::SimTime;
use crate::sim::event::{EventId, Scheduler};

/// Tolerance applied at the depletion threshold to absorb rounding residue.
pub const VOLTAGE_EPSILON: f64 = 1e-6;

/// Load current and harvested power held constant over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub load_current_a: f64,
    pub harvested_power_w: f64,
}

impl OperatingPoint {
    pub fn new(load_current_a: f64, harvested_power_w: f64) -> Self {
        Self {
            load_current_a,
            harvested_power_w,
        }
    }

    fn check(&self) -> Result<(), EnergyError> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if ok(self.load_current_a) && ok(self.harvested_power_w) {
            Ok(())
        } else {
            Err(EnergyError::InvalidOperatingPoint(format!(
                "load {} A and harvest {} W must be finite and >= 0",
                self.load_current_a, self.harvested_power_w
            )))
        }
    }
}

/// Thevenin-equivalent resistances of the harvester/load circuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resistances {
    /// `Vs / I`, absent when no load current flows.
    pub load_ohm: Option<f64>,
    /// `Vs^2 / P`, absent when nothing is harvested.
    pub harvester_ohm: Option<f64>,
    /// Parallel combination of whichever branches are active.
    pub equivalent_ohm: f64,
}

impl Resistances {
    /// Derives the circuit resistances for `point` at supply voltage `supply_voltage_v`.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::NoConductionPath`] when both the load current and
    /// the harvested power are zero, and [`EnergyError::InvalidOperatingPoint`]
    /// for negative or non-finite inputs.
    pub fn new(supply_voltage_v: f64, point: OperatingPoint) -> Result<Self, EnergyError> {
        point.check()?;
        let load_ohm =
            (point.load_current_a > 0.0).then(|| supply_voltage_v / point.load_current_a);
        let harvester_ohm = (point.harvested_power_w > 0.0)
            .then(|| supply_voltage_v * supply_voltage_v / point.harvested_power_w);

        let equivalent_ohm = match (load_ohm, harvester_ohm) {
            (Some(rl), Some(ri)) => rl * ri / (rl + ri),
            (None, Some(ri)) => ri,
            (Some(rl), None) => rl,
            (None, None) => return Err(EnergyError::NoConductionPath),
        };

        Ok(Self {
            load_ohm,
            harvester_ohm,
            equivalent_ohm,
        })
    }

    /// Voltage the capacitor tends to: `Vs * Req / ri`, or 0 without harvest.
    pub fn asymptote_v(&self, supply_voltage_v: f64) -> f64 {
        match self.harvester_ohm {
            Some(ri) => supply_voltage_v * self.equivalent_ohm / ri,
            None => 0.0,
        }
    }
}

/// Exponential voltage trajectory from `initial_v` toward `asymptote_v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub initial_v: f64,
    pub asymptote_v: f64,
    pub tau_s: f64,
}

impl Trajectory {
    /// Trajectory of a capacitor starting at `initial_v` under `point`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Resistances::new`].
    pub fn new(
        capacitance_f: f64,
        supply_voltage_v: f64,
        initial_v: f64,
        point: OperatingPoint,
    ) -> Result<Self, EnergyError> {
        let r = Resistances::new(supply_voltage_v, point)?;
        Ok(Self {
            initial_v,
            asymptote_v: r.asymptote_v(supply_voltage_v),
            tau_s: r.equivalent_ohm * capacitance_f,
        })
    }

    /// Voltage after `dt_s` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::NegativeDuration`] if `dt_s` is negative or not finite.
    pub fn voltage_at(&self, dt_s: f64) -> Result<f64, EnergyError> {
        if !(dt_s.is_finite() && dt_s >= 0.0) {
            return Err(EnergyError::NegativeDuration(dt_s));
        }
        let decay = (-dt_s / self.tau_s).exp();
        Ok(self.asymptote_v * (1.0 - decay) + self.initial_v * decay)
    }

    /// Time until the trajectory reaches `target_v`: `-tau * ln((Vt - A) / (V0 - A))`.
    ///
    /// Returns `None` unless the result is a finite, strictly positive time,
    /// i.e. the trajectory actually heads toward the target.
    pub fn time_to_reach(&self, target_v: f64) -> Option<f64> {
        let ratio = (target_v - self.asymptote_v) / (self.initial_v - self.asymptote_v);
        let t = -self.tau_s * ratio.ln();
        (t.is_finite() && t > 0.0).then_some(t)
    }

    /// Energy dissipated in a load of `load_ohm` over `dt_s` seconds, `∫ V(t)^2 / R dt`.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::NegativeDuration`] if `dt_s` is negative or not finite.
    pub fn load_energy_j(&self, dt_s: f64, load_ohm: f64) -> Result<f64, EnergyError> {
        if !(dt_s.is_finite() && dt_s >= 0.0) {
            return Err(EnergyError::NegativeDuration(dt_s));
        }
        let a = self.asymptote_v;
        let d = self.initial_v - a;
        let tau = self.tau_s;
        let integral = a * a * dt_s
            + 2.0 * a * d * tau * (1.0 - (-dt_s / tau).exp())
            + 0.5 * d * d * tau * (1.0 - (-2.0 * dt_s / tau).exp());
        Ok(integral / load_ohm)
    }
}

/// Electrical and timing parameters of the capacitor.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacitorParams {
    pub capacitance_f: f64,
    /// Maximum (and reference) voltage.
    pub supply_voltage_v: f64,
    /// Depletion threshold as a fraction of the supply voltage.
    pub low_threshold: f64,
    /// Recharge threshold as a fraction of the supply voltage.
    pub high_threshold: f64,
    /// Cadence of the periodic re-evaluation.
    pub update_interval: Duration,
}

impl Default for CapacitorParams {
    fn default() -> Self {
        Self {
            capacitance_f: 0.01,
            supply_voltage_v: 3.3,
            low_threshold: 0.545,
            high_threshold: 0.909,
            update_interval: Duration::from_secs(1),
        }
    }
}

impl CapacitorParams {
    /// # Errors
    ///
    /// Returns [`EnergyError::ThresholdOrder`] unless `0 < low < high <= 1`, and
    /// [`EnergyError::InvalidOperatingPoint`] for a non-positive capacitance,
    /// supply voltage or update interval.
    pub fn validate(&self) -> Result<(), EnergyError> {
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !(low > 0.0 && low < high && high <= 1.0) {
            return Err(EnergyError::ThresholdOrder { low, high });
        }
        if !(self.capacitance_f > 0.0 && self.capacitance_f.is_finite()) {
            return Err(EnergyError::InvalidOperatingPoint(format!(
                "capacitance must be > 0, got {} F",
                self.capacitance_f
            )));
        }
        if !(self.supply_voltage_v > 0.0 && self.supply_voltage_v.is_finite()) {
            return Err(EnergyError::InvalidOperatingPoint(format!(
                "supply voltage must be > 0, got {} V",
                self.supply_voltage_v
            )));
        }
        if self.update_interval.is_zero() {
            return Err(EnergyError::InvalidOperatingPoint(
                "update interval must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Depletion voltage, `low_threshold * supply`.
    pub fn low_voltage_v(&self) -> f64 {
        self.low_threshold * self.supply_voltage_v
    }

    /// Recharge voltage, `high_threshold * supply`.
    pub fn high_voltage_v(&self) -> f64 {
        self.high_threshold * self.supply_voltage_v
    }
}

/// Callback invoked with every energy update.
pub type EnergySubscriber = Box<dyn FnMut(&EnergyEvent)>;

/// Capacitor energy source with hysteresis between *charged* and *depleted*.
///
/// The voltage is recomputed lazily from the value at the last update and the
/// operating point that held since then. Each update re-arms one periodic
/// timer and one predicted threshold-crossing check, cancelling stale ones.
pub struct CapacitorEnergySource {
    params: CapacitorParams,
    initial_voltage_v: f64,
    voltage_v: f64,
    depleted: bool,
    open_circuit: bool,
    last_update: SimTime,
    periodic_event: Option<EventId>,
    threshold_event: Option<EventId>,
    subscribers: Vec<EnergySubscriber>,
}

impl CapacitorEnergySource {
    /// Creates a source charged to `initial_voltage_v`.
    ///
    /// # Errors
    ///
    /// Returns the parameter validation error, or
    /// [`EnergyError::InvalidOperatingPoint`] if the initial voltage is outside
    /// `[0, supply]`.
    pub fn new(params: CapacitorParams, initial_voltage_v: f64) -> Result<Self, EnergyError> {
        params.validate()?;
        if !(0.0..=params.supply_voltage_v).contains(&initial_voltage_v) {
            return Err(EnergyError::InvalidOperatingPoint(format!(
                "initial voltage {initial_voltage_v} V outside [0, {}]",
                params.supply_voltage_v
            )));
        }
        Ok(Self {
            params,
            initial_voltage_v,
            voltage_v: initial_voltage_v,
            depleted: false,
            open_circuit: false,
            last_update: SimTime::ZERO,
            periodic_event: None,
            threshold_event: None,
            subscribers: Vec::new(),
        })
    }

    /// Creates a source with an initial voltage drawn uniformly from `[min_v, max_v]`.
    ///
    /// # Errors
    ///
    /// Same as [`CapacitorEnergySource::new`].
    pub fn with_random_initial_voltage(
        params: CapacitorParams,
        min_v: f64,
        max_v: f64,
        rng: &mut impl Rng,
    ) -> Result<Self, EnergyError> {
        let v0 = if max_v > min_v {
            rng.random_range(min_v..=max_v)
        } else {
            min_v
        };
        Self::new(params, v0)
    }

    pub fn params(&self) -> &CapacitorParams {
        &self.params
    }

    /// Voltage at the last update.
    pub fn voltage_v(&self) -> f64 {
        self.voltage_v
    }

    pub fn initial_voltage_v(&self) -> f64 {
        self.initial_voltage_v
    }

    pub fn supply_voltage_v(&self) -> f64 {
        self.params.supply_voltage_v
    }

    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    pub fn last_update(&self) -> SimTime {
        self.last_update
    }

    /// `true` while the last interval had neither load nor harvest, so the
    /// voltage was held rather than computed.
    pub fn is_open_circuit(&self) -> bool {
        self.open_circuit
    }

    /// Stored energy at the last update, `C * V^2 / 2`.
    pub fn remaining_energy_j(&self) -> f64 {
        self.energy_at(self.voltage_v)
    }

    /// Stored energy at construction.
    pub fn initial_energy_j(&self) -> f64 {
        self.energy_at(self.initial_voltage_v)
    }

    /// Voltage relative to the supply voltage, in `[0, 1]`.
    pub fn voltage_fraction(&self) -> f64 {
        self.voltage_v / self.params.supply_voltage_v
    }

    /// Stored energy relative to a capacitor charged to the supply voltage.
    pub fn energy_fraction(&self) -> f64 {
        self.remaining_energy_j() / self.energy_at(self.params.supply_voltage_v)
    }

    fn energy_at(&self, voltage_v: f64) -> f64 {
        0.5 * self.params.capacitance_f * voltage_v * voltage_v
    }

    /// Voltage the capacitor would reach after `duration_s` under `point`,
    /// starting from the last update. Does not change the source.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::NegativeDuration`] for a negative duration and
    /// the errors of [`Resistances::new`] for an unmodelable operating point.
    pub fn predict_voltage(
        &self,
        point: OperatingPoint,
        duration_s: f64,
    ) -> Result<f64, EnergyError> {
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(EnergyError::NegativeDuration(duration_s));
        }
        if duration_s == 0.0 {
            return Ok(self.voltage_v);
        }
        let traj = self.trajectory(point)?;
        Ok(traj
            .voltage_at(duration_s)?
            .clamp(0.0, self.params.supply_voltage_v))
    }

    fn trajectory(&self, point: OperatingPoint) -> Result<Trajectory, EnergyError> {
        Trajectory::new(
            self.params.capacitance_f,
            self.params.supply_voltage_v,
            self.voltage_v,
            point,
        )
    }

    /// Brings the voltage up to `sched.now()` assuming `point` held since the
    /// last update, applies the hysteresis, re-arms both timers and notifies
    /// subscribers.
    ///
    /// An interval with neither load nor harvest cannot be modelled; the
    /// voltage is held, the event is flagged `open_circuit` and a warning is
    /// logged once on entering that regime.
    pub fn update(
        &mut self,
        point: OperatingPoint,
        sched: &mut dyn Scheduler<DeviceEvent>,
    ) -> EnergyEvent {
        let now = sched.now();
        let previous_v = self.voltage_v;
        let dt = now.saturating_since(self.last_update).as_secs_f64();

        if dt > 0.0 {
            match self.trajectory(point).and_then(|t| t.voltage_at(dt)) {
                Ok(v) => {
                    self.voltage_v = v.clamp(0.0, self.params.supply_voltage_v);
                    if self.open_circuit {
                        self.open_circuit = false;
                        info!(time = %now, voltage_v = self.voltage_v, "conduction path restored");
                    }
                }
                Err(EnergyError::NoConductionPath) => {
                    if !self.open_circuit {
                        self.open_circuit = true;
                        warn!(
                            time = %now,
                            voltage_v = self.voltage_v,
                            "no conduction path (no load, no harvest), holding capacitor voltage"
                        );
                    }
                }
                Err(e) => warn!(error = %e, dt_s = dt, "holding capacitor voltage"),
            }
        }
        self.last_update = now;

        let kind = self.classify(previous_v);
        debug!(
            time = %now,
            voltage_v = self.voltage_v,
            load_a = point.load_current_a,
            harvest_w = point.harvested_power_w,
            kind = kind.as_str(),
            "capacitor updated"
        );

        if let Some(id) = self.periodic_event.take() {
            sched.cancel(id);
        }
        self.periodic_event =
            Some(sched.schedule_in(self.params.update_interval, DeviceEvent::VoltageUpdate));
        self.rearm_threshold_check(point, sched);

        let event = EnergyEvent {
            kind,
            time: now,
            voltage_v: self.voltage_v,
            remaining_energy_j: self.remaining_energy_j(),
            depleted: self.depleted,
            open_circuit: self.open_circuit,
        };
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
        event
    }

    fn classify(&mut self, previous_v: f64) -> EnergyNotification {
        if !self.depleted && self.voltage_v <= self.params.low_voltage_v() + VOLTAGE_EPSILON {
            self.depleted = true;
            info!(voltage_v = self.voltage_v, "energy depleted");
            EnergyNotification::Drained
        } else if self.depleted && self.voltage_v > self.params.high_voltage_v() {
            self.depleted = false;
            info!(voltage_v = self.voltage_v, "energy recharged");
            EnergyNotification::Recharged
        } else if self.voltage_v != previous_v {
            EnergyNotification::Changed
        } else {
            EnergyNotification::Constant
        }
    }

    /// Schedules a single check at the moment the trajectory under `point`
    /// crosses the next relevant threshold: the low one while charged, just
    /// above the high one while depleted. Any previous check is cancelled.
    pub fn rearm_threshold_check(
        &mut self,
        point: OperatingPoint,
        sched: &mut dyn Scheduler<DeviceEvent>,
    ) {
        if let Some(id) = self.threshold_event.take() {
            sched.cancel(id);
        }
        let target_v = if self.depleted {
            self.params.high_voltage_v() + VOLTAGE_EPSILON
        } else {
            self.params.low_voltage_v()
        };
        let Ok(traj) = self.trajectory(point) else {
            return;
        };
        let Some(t) = traj.time_to_reach(target_v) else {
            return;
        };
        // Round up so the check never lands just before the crossing.
        if let Ok(delay) = Duration::try_from_secs_f64(t) {
            let delay = delay + Duration::from_nanos(1);
            debug!(delay_s = delay.as_secs_f64(), target_v, "threshold check armed");
            self.threshold_event = Some(sched.schedule_in(delay, DeviceEvent::ThresholdCheck));
        }
    }

    /// Pending predicted-crossing check, if any.
    pub fn threshold_event(&self) -> Option<EventId> {
        self.threshold_event
    }

    /// Registers a callback run after every update.
    pub fn subscribe(&mut self, subscriber: EnergySubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Cancels both timers.
    pub fn stop(&mut self, sched: &mut dyn Scheduler<DeviceEvent>) {
        for id in [self.periodic_event.take(), self.threshold_event.take()]
            .into_iter()
            .flatten()
        {
            sched.cancel(id);
        }
    }
}
