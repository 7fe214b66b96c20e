//! Per-state current draw of the radio.

use std::collections::BTreeMap;

use super::types::PhyState;
use crate::error::EnergyError;

/// Lookup of the current drawn in each radio state, in amperes.
///
/// Built from a configuration map; every state must be present.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioCurrentTable {
    currents: [f64; 7],
}

impl RadioCurrentTable {
    /// Builds the table from a state → current map.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::MissingCurrent`] for the first state without an
    /// entry and [`EnergyError::InvalidOperatingPoint`] for a negative or
    /// non-finite current.
    pub fn from_map(map: &BTreeMap<PhyState, f64>) -> Result<Self, EnergyError> {
        let mut currents = [0.0; 7];
        for state in PhyState::ALL {
            let current = *map.get(&state).ok_or(EnergyError::MissingCurrent(state))?;
            if !(current.is_finite() && current >= 0.0) {
                return Err(EnergyError::InvalidOperatingPoint(format!(
                    "current for {state} must be finite and >= 0, got {current}"
                )));
            }
            currents[state.index()] = current;
        }
        Ok(Self { currents })
    }

    /// Current drawn in `state`, in amperes.
    pub fn current_a(&self, state: PhyState) -> f64 {
        self.currents[state.index()]
    }

    /// Replaces the current for one state.
    pub(crate) fn set_current_a(&mut self, state: PhyState, current_a: f64) {
        self.currents[state.index()] = current_a.max(0.0);
    }
}

/// Typical SX1272-class currents at 3.3 V.
pub fn default_currents() -> BTreeMap<PhyState, f64> {
    BTreeMap::from([
        (PhyState::Standby, 0.0014),
        (PhyState::Tx, 0.028),
        (PhyState::Rx, 0.0112),
        (PhyState::Sleep, 0.0000015),
        (PhyState::Idle, 0.000007),
        (PhyState::Off, 0.0),
        (PhyState::TurnOn, 0.0221),
    ])
}

impl Default for RadioCurrentTable {
    fn default() -> Self {
        let mut currents = [0.0; 7];
        for (state, current) in default_currents() {
            currents[state.index()] = current;
        }
        Self { currents }
    }
}

/// How the TX current depends on the configured output power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TxCurrentModel {
    /// Fixed TX current regardless of output power.
    Constant { current_a: f64 },
    /// Linear power amplifier: `P_out / (V * eta) + standby_current`.
    Linear {
        eta: f64,
        voltage_v: f64,
        standby_current_a: f64,
    },
}

impl TxCurrentModel {
    /// Current drawn while transmitting at `tx_power_dbm`.
    pub fn current_a(&self, tx_power_dbm: f64) -> f64 {
        match *self {
            TxCurrentModel::Constant { current_a } => current_a,
            TxCurrentModel::Linear {
                eta,
                voltage_v,
                standby_current_a,
            } => dbm_to_w(tx_power_dbm) / (voltage_v * eta) + standby_current_a,
        }
    }
}

/// Converts dBm to watts.
pub fn dbm_to_w(dbm: f64) -> f64 {
    10.0_f64.powf((dbm - 30.0) / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_state() {
        let table = RadioCurrentTable::from_map(&default_currents());
        assert!(table.is_ok());
        let table = table.ok();
        assert_eq!(table.as_ref().map(|t| t.current_a(PhyState::Tx)), Some(0.028));
        assert_eq!(table.as_ref().map(|t| t.current_a(PhyState::Off)), Some(0.0));
        assert_eq!(table, Some(RadioCurrentTable::default()));
    }

    #[test]
    fn missing_state_is_an_error() {
        let mut map = default_currents();
        map.remove(&PhyState::Rx);
        let err = RadioCurrentTable::from_map(&map);
        assert!(matches!(err, Err(EnergyError::MissingCurrent(PhyState::Rx))));
    }

    #[test]
    fn negative_current_is_rejected() {
        let mut map = default_currents();
        map.insert(PhyState::Idle, -1.0);
        assert!(matches!(
            RadioCurrentTable::from_map(&map),
            Err(EnergyError::InvalidOperatingPoint(_))
        ));
    }

    #[test]
    fn linear_tx_model_at_14_dbm() {
        let model = TxCurrentModel::Linear {
            eta: 0.10,
            voltage_v: 3.3,
            standby_current_a: 0.0014,
        };
        // 14 dBm = 25.12 mW
        let expected = 0.025_118_864 / 0.33 + 0.0014;
        assert!((model.current_a(14.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn constant_tx_model_ignores_power() {
        let model = TxCurrentModel::Constant { current_a: 0.028 };
        assert_eq!(model.current_a(2.0), 0.028);
        assert_eq!(model.current_a(20.0), 0.028);
    }

    #[test]
    fn dbm_conversion() {
        assert!((dbm_to_w(30.0) - 1.0).abs() < 1e-12);
        assert!((dbm_to_w(0.0) - 0.001).abs() < 1e-12);
    }
}
