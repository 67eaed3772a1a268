//! Common utilities and types for the motion safety core
pub mod error;
pub mod geometry;

pub use error::{SafetyError, SafetyResult};

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::DVector;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Relative tolerance used for approximate position equality
    pub const RELATIVE_TOLERANCE: f64 = 1e-5;
    /// Absolute tolerance used for approximate position equality
    pub const ABSOLUTE_TOLERANCE: f64 = 1e-8;

    /// A point in n-dimensional space (2D in practice)
    ///
    /// `==` is exact coordinate equality. Use [`Position::approx_eq`] when
    /// positions come out of arithmetic and only need to be "the same place".
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(from = "Vec<f64>", into = "Vec<f64>")]
    pub struct Position(DVector<f64>);

    /// An index-aligned sequence of positions, one per simulated time step
    pub type Path = Vec<Position>;

    impl Position {
        /// Create a position from raw coordinates
        pub fn new(coords: Vec<f64>) -> Self {
            Position(DVector::from_vec(coords))
        }

        /// Create a 2D position
        pub fn xy(x: f64, y: f64) -> Self {
            Position(DVector::from_vec(vec![x, y]))
        }

        pub fn from_vector(vector: DVector<f64>) -> Self {
            Position(vector)
        }

        /// Number of coordinates
        pub fn dim(&self) -> usize {
            self.0.len()
        }

        pub fn coords(&self) -> &[f64] {
            self.0.as_slice()
        }

        pub fn vector(&self) -> &DVector<f64> {
            &self.0
        }

        /// Tolerance-based equality, same rule as `numpy.allclose`
        pub fn approx_eq(&self, other: &Position) -> bool {
            self.dim() == other.dim()
                && self.0.iter().zip(other.0.iter()).all(|(a, b)| {
                    (a - b).abs() <= ABSOLUTE_TOLERANCE + RELATIVE_TOLERANCE * b.abs()
                })
        }
    }

    impl From<Vec<f64>> for Position {
        fn from(coords: Vec<f64>) -> Self {
            Position::new(coords)
        }
    }

    impl From<Position> for Vec<f64> {
        fn from(position: Position) -> Self {
            position.0.iter().copied().collect()
        }
    }

    impl From<(f64, f64)> for Position {
        fn from((x, y): (f64, f64)) -> Self {
            Position::xy(x, y)
        }
    }

    impl From<(i32, i32)> for Position {
        fn from((x, y): (i32, i32)) -> Self {
            Position::xy(x as f64, y as f64)
        }
    }

    impl fmt::Display for Position {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "(")?;
            for (i, c) in self.0.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, ")")
        }
    }

    /// Convert integer grid coordinates into a path
    pub fn path_from_grid(points: &[(i32, i32)]) -> Path {
        points.iter().map(|&p| Position::from(p)).collect()
    }
}
