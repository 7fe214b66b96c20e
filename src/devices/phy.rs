//! Observable radio state machine.

use tracing::trace;

use super::types::{PhyState, StateChange};

/// Callback invoked after every committed transition.
pub type StateListener = Box<dyn FnMut(&StateChange)>;

/// How a requested transition is admitted from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Already in the target state: no-op success.
    AlreadyThere,
    /// Not allowed from the current state: SLEEP while OFF, TURNON unless OFF.
    Rejected,
    /// Always allowed: entering SLEEP or OFF.
    Unconditional,
    /// Allowed only if the energy source is not depleted.
    EnergyGated,
}

/// Radio state plus the listeners notified of each transition.
///
/// Starts in SLEEP. The state only changes through
/// [`PhyStateMachine::apply`], which the end device calls once a transition
/// has been admitted.
pub struct PhyStateMachine {
    state: PhyState,
    listeners: Vec<StateListener>,
}

impl Default for PhyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhyStateMachine {
    pub fn new() -> Self {
        Self {
            state: PhyState::Sleep,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> PhyState {
        self.state
    }

    /// Classifies a request to move to `target`.
    pub fn admission(&self, target: PhyState) -> Admission {
        match (target, self.state) {
            (PhyState::Sleep, PhyState::Off) => Admission::Rejected,
            (PhyState::TurnOn, current) if current != PhyState::Off => Admission::Rejected,
            (target, current) if target == current => Admission::AlreadyThere,
            (PhyState::Sleep | PhyState::Off, _) => Admission::Unconditional,
            _ => Admission::EnergyGated,
        }
    }

    pub fn register_listener(&mut self, listener: StateListener) {
        self.listeners.push(listener);
    }

    /// Sets the new state, then notifies every listener.
    pub(crate) fn apply(&mut self, change: StateChange) {
        trace!(from = %change.from, to = %change.to, "phy transition");
        self.state = change.to;
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}
