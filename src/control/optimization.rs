//! Minimal-deviation repositioning under a keep-out constraint
//!
//! Solves `min ‖x − origin‖` subject to `‖x − center‖ ≥ radius` with a
//! projected gradient method. The objective is minimised through its square,
//! which has the same minimiser and a gradient defined everywhere.

use crate::common::geometry::displacement;
use crate::common::types::Position;
use crate::common::{SafetyError, SafetyResult};
use nalgebra::DVector;
use std::collections::HashMap;
use tracing::debug;

/// Result of a solver run
#[derive(Debug, Clone, PartialEq)]
pub enum SolverOutcome {
    Converged { position: Position, iterations: usize },
    DidNotConverge { iterations: usize, reason: String },
}

impl SolverOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolverOutcome::Converged { .. })
    }
}

/// Projected gradient solver for the keep-out problem
#[derive(Debug, Clone)]
pub struct MinimalDeviationSolver {
    max_iterations: usize,
    tolerance: f64,
    step_size: f64,
}

impl Default for MinimalDeviationSolver {
    fn default() -> Self {
        MinimalDeviationSolver {
            max_iterations: 100,
            tolerance: 1e-9,
            step_size: 0.5,
        }
    }
}

impl MinimalDeviationSolver {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        MinimalDeviationSolver {
            max_iterations,
            tolerance,
            ..Default::default()
        }
    }

    /// Configure the solver with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> SafetyResult<()> {
        if let Some(&max_iterations) = params.get("solver_max_iterations") {
            if !(max_iterations >= 1.0) {
                return Err(SafetyError::invalid("solver_max_iterations", "must be at least 1"));
            }
            self.max_iterations = max_iterations as usize;
        }
        if let Some(&tolerance) = params.get("solver_tolerance") {
            if !(tolerance > 0.0) {
                return Err(SafetyError::invalid("solver_tolerance", "must be positive"));
            }
            self.tolerance = tolerance;
        }
        if let Some(&step_size) = params.get("solver_step_size") {
            if !(step_size > 0.0 && step_size <= 1.0) {
                return Err(SafetyError::invalid("solver_step_size", "must be in (0, 1]"));
            }
            self.step_size = step_size;
        }
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Find the point closest to `origin` that is at least `radius` away
    /// from `center`, starting the search at `origin`
    pub fn solve(&self, origin: &Position, center: &Position, radius: f64) -> SafetyResult<SolverOutcome> {
        // Validates dimensions once; everything below works on raw vectors
        displacement(origin, center)?;

        let target = origin.vector();
        let mut x = target.clone();
        for iteration in 1..=self.max_iterations {
            let gradient = &x - target;
            let stepped = &x - gradient * self.step_size;
            let projected = match project_outside(&stepped, center.vector(), radius) {
                Some(p) => p,
                None => {
                    return Ok(SolverOutcome::DidNotConverge {
                        iterations: iteration,
                        reason: "iterate coincides with the keep-out center".to_string(),
                    })
                }
            };

            let change = (&projected - &x).norm();
            x = projected;
            if change <= self.tolerance {
                debug!("Keep-out solver converged after {} iterations", iteration);
                return Ok(SolverOutcome::Converged {
                    position: Position::from_vector(x),
                    iterations: iteration,
                });
            }
        }

        Ok(SolverOutcome::DidNotConverge {
            iterations: self.max_iterations,
            reason: "iteration limit reached".to_string(),
        })
    }
}

/// Radial projection onto `{ p : ‖p − center‖ ≥ radius }`.
/// `None` when the point sits exactly on the center (direction undefined).
fn project_outside(point: &DVector<f64>, center: &DVector<f64>, radius: f64) -> Option<DVector<f64>> {
    let offset = point - center;
    let dist = offset.norm();
    if dist >= radius {
        return Some(point.clone());
    }
    if dist == 0.0 {
        return None;
    }
    Some(center + offset * (radius / dist))
}
