//! Lifecycle management for safety components

use crate::common::SafetyResult;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send + Sync {
    /// Validate settings and prepare inputs
    fn on_configure(&mut self) -> SafetyResult<()>;

    /// Reset run state and start accepting work
    fn on_activate(&mut self) -> SafetyResult<()>;

    /// Stop accepting work, keeping results
    fn on_deactivate(&mut self) -> SafetyResult<()>;

    /// Drop results and return to the unconfigured state
    fn on_cleanup(&mut self) -> SafetyResult<()>;
}

/// Base implementation for lifecycle nodes
#[derive(Debug, Clone)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    /// Set the state
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }
}
