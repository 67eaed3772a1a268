//! Path sources feeding the safety core

use crate::common::types::{Path, Position};
use crate::common::{SafetyError, SafetyResult};

/// Trait for anything that produces a fixed, index-aligned path
pub trait PathSource: Send + Sync {
    /// Produce the full path
    fn generate(&self) -> SafetyResult<Path>;
}

/// Lawnmower sweep over a rectangular grid.
///
/// Row `i` visits columns `0..cols` when `i` is even and `cols-1..=0` when
/// odd, giving `(i, j)` grid coordinates offset by the sweep origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LawnmowerSweep {
    rows: usize,
    cols: usize,
    origin: Position,
}

impl LawnmowerSweep {
    /// Create a sweep planner for a `rows × cols` grid anchored at (0, 0)
    pub fn new(rows: usize, cols: usize) -> Self {
        LawnmowerSweep {
            rows,
            cols,
            origin: Position::xy(0.0, 0.0),
        }
    }

    /// Anchor the grid's first cell at `origin`
    pub fn starting_at(mut self, origin: Position) -> Self {
        self.origin = origin;
        self
    }

    /// Plan the sweep
    pub fn plan(&self) -> Path {
        let (ox, oy) = match self.origin.coords() {
            [x, y] => (*x, *y),
            _ => (0.0, 0.0),
        };
        let mut path = Vec::with_capacity(self.rows * self.cols);
        for i in 0..self.rows {
            let x = ox + i as f64;
            if i % 2 == 0 {
                for j in 0..self.cols {
                    path.push(Position::xy(x, oy + j as f64));
                }
            } else {
                for j in (0..self.cols).rev() {
                    path.push(Position::xy(x, oy + j as f64));
                }
            }
        }
        path
    }
}

impl PathSource for LawnmowerSweep {
    fn generate(&self) -> SafetyResult<Path> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SafetyError::invalid("grid_size", "both dimensions must be positive"));
        }
        if self.origin.dim() != 2 {
            return Err(SafetyError::DimensionMismatch {
                expected: 2,
                found: self.origin.dim(),
            });
        }
        Ok(self.plan())
    }
}

/// Extend `path` to `length` by repeating its final position
pub fn pad_to_length(mut path: Path, length: usize) -> SafetyResult<Path> {
    let last = path
        .last()
        .cloned()
        .ok_or_else(|| SafetyError::EmptyPath("cannot pad a path with no positions".to_string()))?;
    if path.len() < length {
        path.resize(length, last);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::path_from_grid;

    #[test]
    fn sweep_alternates_direction_per_row() {
        let path = LawnmowerSweep::new(2, 3).generate().unwrap();
        assert_eq!(
            path,
            path_from_grid(&[(0, 0), (0, 1), (0, 2), (1, 2), (1, 1), (1, 0)])
        );
    }

    #[test]
    fn origin_offsets_the_sweep() {
        let path = LawnmowerSweep::new(2, 2)
            .starting_at(Position::xy(3.0, -1.0))
            .generate()
            .unwrap();
        assert_eq!(path, path_from_grid(&[(3, -1), (3, 0), (4, 0), (4, -1)]));
        assert!(LawnmowerSweep::new(2, 2)
            .starting_at(Position::new(vec![1.0]))
            .generate()
            .is_err());
    }

    #[test]
    fn default_grid_has_one_hundred_steps() {
        assert_eq!(LawnmowerSweep::new(10, 10).plan().len(), 100);
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(LawnmowerSweep::new(0, 4).generate().is_err());
    }

    #[test]
    fn padding_repeats_last_position() {
        let padded = pad_to_length(path_from_grid(&[(1, 1), (2, 2)]), 4).unwrap();
        assert_eq!(padded, path_from_grid(&[(1, 1), (2, 2), (2, 2), (2, 2)]));
    }

    #[test]
    fn padding_never_truncates() {
        let path = path_from_grid(&[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(pad_to_length(path.clone(), 2).unwrap(), path);
    }

    #[test]
    fn padding_empty_path_fails() {
        assert!(matches!(
            pad_to_length(Vec::new(), 3),
            Err(SafetyError::EmptyPath(_))
        ));
    }
}
