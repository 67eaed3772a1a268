//! Control module: avoidance trajectory synthesis
pub mod avoidance;
pub mod optimization;

pub use self::avoidance::{adjust_path, AvoidanceSynthesizer};
pub use self::optimization::{MinimalDeviationSolver, SolverOutcome};
