//! Geometry helpers shared by prediction, collision detection and avoidance

use super::error::{SafetyError, SafetyResult};
use super::types::Position;
use nalgebra::DVector;

fn ensure_same_dimension(a: &Position, b: &Position) -> SafetyResult<()> {
    if a.dim() != b.dim() {
        return Err(SafetyError::DimensionMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }
    Ok(())
}

/// Vector pointing from `from` to `to`
pub fn displacement(from: &Position, to: &Position) -> SafetyResult<DVector<f64>> {
    ensure_same_dimension(from, to)?;
    Ok(to.vector() - from.vector())
}

/// Euclidean distance between two points
pub fn distance(a: &Position, b: &Position) -> SafetyResult<f64> {
    Ok(displacement(a, b)?.norm())
}

/// True if the two points are strictly closer than `min_distance`
pub fn within_range(a: &Position, b: &Position, min_distance: f64) -> SafetyResult<bool> {
    Ok(distance(a, b)? < min_distance)
}

/// Unit vector from `from` towards `to`, `None` when the points coincide
pub fn unit_vector(from: &Position, to: &Position) -> SafetyResult<Option<DVector<f64>>> {
    let diff = displacement(from, to)?;
    let norm = diff.norm();
    if norm == 0.0 {
        return Ok(None);
    }
    Ok(Some(diff / norm))
}
