pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod navigation;
pub mod perception;

pub use crate::behaviors::{DecisionLoop, SimulationReport, StepOutcome};
pub use crate::common::types::{Path, Position};
pub use crate::common::{SafetyError, SafetyResult};
pub use crate::config::{ObstacleSource, PredictorKind, SafetyConfig};

use tracing::info;

/// Core functionality: wires the path sources, predictor and avoidance
/// settings of a configuration into a decision loop
pub struct MotionSafetyCore {
    config: SafetyConfig,
}

impl MotionSafetyCore {
    /// Create a new instance from a validated configuration
    pub fn new(config: SafetyConfig) -> SafetyResult<Self> {
        config.validate()?;
        Ok(MotionSafetyCore { config })
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Build a decision loop over the configured agent and obstacle paths
    pub fn decision_loop(&self) -> SafetyResult<DecisionLoop> {
        let agent_path = self.config.agent_path()?;
        let obstacle_path = self.config.obstacle_path(&agent_path)?;
        info!(
            "Agent path has {} steps, obstacle path has {} steps",
            agent_path.len(),
            obstacle_path.len()
        );
        let predictor = self.config.trajectory_predictor()?;
        Ok(DecisionLoop::with_boxed_predictor(
            self.config.clone(),
            agent_path,
            obstacle_path,
            predictor,
        ))
    }

    /// Run a complete simulation
    pub fn run(&self) -> SafetyResult<SimulationReport> {
        let mut decision_loop = self.decision_loop()?;
        info!("Running decision loop with {} predictor", decision_loop.predictor_name());
        decision_loop.run()
    }
}
