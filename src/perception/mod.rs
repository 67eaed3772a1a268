//! Perception module: obstacle observation windows and trajectory prediction
pub mod prediction;
pub mod window;

pub use self::prediction::{
    forecast, heuristic_predict_next, predict_next, ConstantVelocityPredictor, Forecast,
    HeuristicAccelerationPredictor, TargetSeekingPredictor, TrajectoryPredictor,
};
pub use self::window::PredictionWindow;
