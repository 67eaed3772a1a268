//! Avoidance trajectory synthesis
//!
//! Close to the obstacle the agent is pushed away by an exponential
//! repulsive field (`A · exp(−d / B)` along the obstacle→agent direction).
//! Further out, the agent is moved the minimum amount needed to keep the
//! required separation; if that optimisation fails the agent is left where
//! it was.

use super::optimization::{MinimalDeviationSolver, SolverOutcome};
use crate::common::geometry::displacement;
use crate::common::types::{Path, Position};
use crate::common::{SafetyError, SafetyResult};
use nalgebra::DVector;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default repulsive force magnitude (A)
pub const DEFAULT_FORCE_MAGNITUDE: f64 = 2.1;
/// Default repulsive force decay length (B)
pub const DEFAULT_FORCE_DECAY: f64 = 0.3;

/// Computes corrected agent positions around an obstacle
#[derive(Debug, Clone)]
pub struct AvoidanceSynthesizer {
    force_magnitude: f64,
    force_decay: f64,
    solver: MinimalDeviationSolver,
}

impl Default for AvoidanceSynthesizer {
    fn default() -> Self {
        AvoidanceSynthesizer {
            force_magnitude: DEFAULT_FORCE_MAGNITUDE,
            force_decay: DEFAULT_FORCE_DECAY,
            solver: MinimalDeviationSolver::default(),
        }
    }
}

impl AvoidanceSynthesizer {
    pub fn new() -> Self {
        AvoidanceSynthesizer::default()
    }

    /// Use custom force constants
    pub fn with_constants(force_magnitude: f64, force_decay: f64) -> SafetyResult<Self> {
        let mut synthesizer = AvoidanceSynthesizer::default();
        let mut params = HashMap::new();
        params.insert("force_magnitude".to_string(), force_magnitude);
        params.insert("force_decay".to_string(), force_decay);
        synthesizer.configure(&params)?;
        Ok(synthesizer)
    }

    /// Replace the long-range solver
    pub fn with_solver(mut self, solver: MinimalDeviationSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Configure force constants and solver limits
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> SafetyResult<()> {
        if let Some(&force_magnitude) = params.get("force_magnitude") {
            if !(force_magnitude > 0.0) {
                return Err(SafetyError::invalid("force_magnitude", "must be positive"));
            }
            self.force_magnitude = force_magnitude;
        }
        if let Some(&force_decay) = params.get("force_decay") {
            if !(force_decay > 0.0) {
                return Err(SafetyError::invalid("force_decay", "must be positive"));
            }
            self.force_decay = force_decay;
        }
        self.solver.configure(params)
    }

    /// Repulsive force acting on the agent, pointing away from the obstacle.
    ///
    /// Coincident positions have no direction and yield `DegenerateGeometry`.
    pub fn repulsive_force(&self, agent: &Position, obstacle: &Position) -> SafetyResult<DVector<f64>> {
        let away = displacement(obstacle, agent)?;
        let dist = away.norm();
        if dist == 0.0 {
            return Err(SafetyError::DegenerateGeometry(format!(
                "agent and obstacle coincide at {}",
                agent
            )));
        }
        let magnitude = self.force_magnitude * (-dist / self.force_decay).exp();
        Ok(away * (magnitude / dist))
    }

    /// Corrected position for a single agent/obstacle pair
    pub fn adjust_position(
        &self,
        agent: &Position,
        obstacle: &Position,
        min_distance: f64,
        short_range_threshold: f64,
    ) -> SafetyResult<Position> {
        let dist = displacement(obstacle, agent)?.norm();

        if dist < short_range_threshold {
            return match self.repulsive_force(agent, obstacle) {
                Ok(force) => Ok(Position::from_vector(agent.vector() + force)),
                Err(SafetyError::DegenerateGeometry(reason)) => {
                    warn!("No repulsive direction ({}), leaving agent in place", reason);
                    Ok(agent.clone())
                }
                Err(e) => Err(e),
            };
        }

        match self.solver.solve(agent, obstacle, min_distance)? {
            SolverOutcome::Converged { position, iterations } => {
                debug!("Repositioned {} -> {} in {} iterations", agent, position, iterations);
                Ok(position)
            }
            SolverOutcome::DidNotConverge { iterations, reason } => {
                warn!(
                    "Avoidance optimisation failed after {} iterations ({}), keeping {}",
                    iterations, reason, agent
                );
                Ok(agent.clone())
            }
        }
    }

    /// Adjust every index present in both paths
    pub fn adjust_path(
        &self,
        agent_path: &[Position],
        obstacle_path: &[Position],
        min_distance: f64,
        short_range_threshold: f64,
    ) -> SafetyResult<Path> {
        agent_path
            .iter()
            .zip(obstacle_path.iter())
            .map(|(agent, obstacle)| {
                self.adjust_position(agent, obstacle, min_distance, short_range_threshold)
            })
            .collect()
    }
}

/// [`AvoidanceSynthesizer::adjust_path`] with default constants
pub fn adjust_path(
    agent_path: &[Position],
    obstacle_path: &[Position],
    min_distance: f64,
    short_range_threshold: f64,
) -> SafetyResult<Path> {
    AvoidanceSynthesizer::default().adjust_path(agent_path, obstacle_path, min_distance, short_range_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geometry::distance;
    use crate::common::types::path_from_grid;

    #[test]
    fn short_range_pushes_agent_away() {
        let synthesizer = AvoidanceSynthesizer::new();
        let agent = Position::xy(1.0, 0.0);
        let obstacle = Position::xy(0.0, 0.0);
        let adjusted = synthesizer.adjust_position(&agent, &obstacle, 1.5, 3.0).unwrap();
        assert_ne!(adjusted, agent);
        assert!(distance(&adjusted, &obstacle).unwrap() > 1.0);

        let expected = 1.0 + 2.1 * (-1.0f64 / 0.3).exp();
        assert!((adjusted.coords()[0] - expected).abs() < 1e-12);
        assert_eq!(adjusted.coords()[1], 0.0);
    }

    #[test]
    fn short_range_nudge_is_never_zero_near_threshold() {
        let synthesizer = AvoidanceSynthesizer::new();
        let agent = Position::xy(2.99, 0.0);
        let adjusted = synthesizer
            .adjust_position(&agent, &Position::xy(0.0, 0.0), 1.5, 3.0)
            .unwrap();
        assert_ne!(adjusted, agent);
    }

    #[test]
    fn coincident_positions_get_no_force() {
        let synthesizer = AvoidanceSynthesizer::new();
        let here = Position::xy(2.0, 2.0);
        assert!(matches!(
            synthesizer.repulsive_force(&here, &here),
            Err(SafetyError::DegenerateGeometry(_))
        ));
        assert_eq!(synthesizer.adjust_position(&here, &here, 1.5, 3.0).unwrap(), here);
    }

    #[test]
    fn long_range_keeps_minimum_separation() {
        let synthesizer = AvoidanceSynthesizer::new();
        let obstacle = Position::xy(0.0, 0.0);
        let adjusted = synthesizer
            .adjust_position(&Position::xy(0.0, 1.0), &obstacle, 1.5, 0.5)
            .unwrap();
        assert!(distance(&adjusted, &obstacle).unwrap() >= 1.5 - 1e-9);
        assert!(adjusted.approx_eq(&Position::xy(0.0, 1.5)));
    }

    #[test]
    fn long_range_already_safe_is_unchanged() {
        let agent = Position::xy(5.0, 5.0);
        let adjusted = AvoidanceSynthesizer::new()
            .adjust_position(&agent, &Position::xy(0.0, 0.0), 1.5, 3.0)
            .unwrap();
        assert_eq!(adjusted, agent);
    }

    #[test]
    fn solver_failure_keeps_original_position() {
        let synthesizer =
            AvoidanceSynthesizer::new().with_solver(MinimalDeviationSolver::new(1, 1e-9));
        let agent = Position::xy(0.0, 1.0);
        let adjusted = synthesizer
            .adjust_position(&agent, &Position::xy(0.0, 0.0), 1.5, 0.5)
            .unwrap();
        assert_eq!(adjusted, agent);
    }

    #[test]
    fn adjust_path_is_bounded_by_shorter_path() {
        let agent = path_from_grid(&[(0, 0), (0, 1), (0, 2), (0, 3)]);
        let obstacle = path_from_grid(&[(5, 5), (0, 0)]);
        let adjusted = adjust_path(&agent, &obstacle, 1.5, 3.0).unwrap();
        assert_eq!(adjusted.len(), 2);
        assert_eq!(adjusted[0], agent[0]);
        assert!(adjusted[1].coords()[1] > 1.0);
    }

    #[test]
    fn constants_must_be_positive() {
        assert!(AvoidanceSynthesizer::with_constants(0.0, 0.3).is_err());
        assert!(AvoidanceSynthesizer::with_constants(2.1, -1.0).is_err());
        assert!(AvoidanceSynthesizer::with_constants(f64::NAN, 0.3).is_err());
        assert!(AvoidanceSynthesizer::with_constants(2.1, f64::NAN).is_err());
        assert!(AvoidanceSynthesizer::with_constants(1.0, 1.0).is_ok());
    }
}
