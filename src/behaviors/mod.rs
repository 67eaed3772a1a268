//! Behaviors module: the per-step safety decision loop
pub mod decision_loop;

pub use self::decision_loop::{
    DecisionLoop, LoopState, SafetyEvent, SimulationReport, StepOutcome, StepSnapshot,
};
