//! Energy accounting for the radio state machine.

use std::time::Duration;

use tracing::debug;

use super::current_table::{RadioCurrentTable, TxCurrentModel};
use super::types::PhyState;
use crate::sim::clock::SimTime;

/// Policy and electrical parameters of the radio energy model.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioParams {
    /// Voltage at which the table currents were characterised.
    pub reference_voltage_v: f64,
    /// On depletion go to SLEEP instead of OFF.
    pub enter_sleep_if_depleted: bool,
    /// Dwell in TURNON before the radio reaches SLEEP.
    pub turn_on_duration: Duration,
    /// Overrides the TX entry of the table from the transmit power.
    pub tx_current_model: Option<TxCurrentModel>,
}

impl Default for RadioParams {
    fn default() -> Self {
        Self {
            reference_voltage_v: 3.3,
            enter_sleep_if_depleted: false,
            turn_on_duration: Duration::from_secs(13),
            tx_current_model: None,
        }
    }
}

/// Converts radio state dwell times into consumed energy.
///
/// A transition is bracketed by [`RadioEnergyModel::begin_change`] and
/// [`RadioEnergyModel::finish_change`]. Updating the capacitor in between may
/// drain it, which forces a nested transition; the nested one commits its
/// state and the interrupted outer one is marked superseded so it cannot
/// overwrite it. The recorded state therefore always matches the phy.
#[derive(Debug, Clone)]
pub struct RadioEnergyModel {
    table: RadioCurrentTable,
    params: RadioParams,
    current_state: PhyState,
    last_update: SimTime,
    total_energy_j: f64,
    pending_changes: u32,
    superseded: bool,
}

impl RadioEnergyModel {
    /// Creates a model in SLEEP at time zero.
    pub fn new(table: RadioCurrentTable, params: RadioParams) -> Self {
        Self {
            table,
            params,
            current_state: PhyState::Sleep,
            last_update: SimTime::ZERO,
            total_energy_j: 0.0,
            pending_changes: 0,
            superseded: false,
        }
    }

    pub fn params(&self) -> &RadioParams {
        &self.params
    }

    pub fn current_state(&self) -> PhyState {
        self.current_state
    }

    pub fn last_update(&self) -> SimTime {
        self.last_update
    }

    /// Energy consumed since the start, in joules. Never decreases.
    pub fn total_energy_consumption_j(&self) -> f64 {
        self.total_energy_j
    }

    /// Current drawn in `state`.
    pub fn current_a(&self, state: PhyState) -> f64 {
        self.table.current_a(state)
    }

    /// Current drawn in the recorded state.
    pub fn load_current_a(&self) -> f64 {
        self.table.current_a(self.current_state)
    }

    /// Updates the TX current from the transmit power, if a model is configured.
    pub fn apply_tx_power(&mut self, tx_power_dbm: f64) {
        if let Some(model) = self.params.tx_current_model {
            let current = model.current_a(tx_power_dbm);
            debug!(tx_power_dbm, current_a = current, "tx current from power model");
            self.table.set_current_a(PhyState::Tx, current);
        }
    }

    /// State forced on depletion.
    pub fn depletion_state(&self) -> PhyState {
        if self.params.enter_sleep_if_depleted {
            PhyState::Sleep
        } else {
            PhyState::Off
        }
    }

    /// Energy of a dwell in `state` that ended at voltage `voltage_v`.
    ///
    /// The table current is scaled to the actual voltage through the load
    /// resistance `V_ref / I`, so `E = t * V^2 * I / V_ref`.
    pub fn dwell_energy_j(&self, state: PhyState, dwell_s: f64, voltage_v: f64) -> f64 {
        let current = self.table.current_a(state);
        if current <= 0.0 || dwell_s <= 0.0 || self.params.reference_voltage_v <= 0.0 {
            return 0.0;
        }
        dwell_s * voltage_v * voltage_v * current / self.params.reference_voltage_v
    }

    /// Opens a transition at `now`: charges the dwell in the recorded state,
    /// which ended at `end_voltage_v`, and returns that energy.
    pub fn begin_change(&mut self, now: SimTime, end_voltage_v: f64) -> f64 {
        let dwell_s = now.saturating_since(self.last_update).as_secs_f64();
        let energy = self.dwell_energy_j(self.current_state, dwell_s, end_voltage_v);
        self.total_energy_j += energy;
        self.last_update = now;
        self.pending_changes += 1;
        energy
    }

    /// Closes the innermost open transition. Returns `true` if `new_state`
    /// was recorded, `false` if a nested transition superseded it.
    pub fn finish_change(&mut self, new_state: PhyState) -> bool {
        let committed = !self.superseded;
        if committed {
            debug!(from = %self.current_state, to = %new_state, "radio state recorded");
            self.current_state = new_state;
        }
        self.superseded = self.pending_changes > 1;
        self.pending_changes = self.pending_changes.saturating_sub(1);
        committed
    }
}
