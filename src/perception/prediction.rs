//! Short-horizon trajectory prediction for a tracked obstacle
//!
//! Predictors extrapolate from the last two observations in a
//! [`PredictionWindow`]. The default model adds a heuristic quadratic
//! correction on top of constant velocity; see [`heuristic_correction`].

use super::window::PredictionWindow;
use crate::common::geometry::{displacement, unit_vector};
use crate::common::types::Position;
use crate::common::{SafetyError, SafetyResult};
use nalgebra::DVector;
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::debug;

/// Trait for obstacle trajectory predictors
pub trait TrajectoryPredictor: Debug + Send + Sync {
    /// Forecast exactly `steps_ahead` future positions
    fn predict(&self, window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Vec<Position>>;

    /// Get the name of this predictor
    fn name(&self) -> &str;

    /// Configure the predictor with parameters
    fn configure(&mut self, _params: &HashMap<String, f64>) -> SafetyResult<()> {
        Ok(())
    }
}

/// Lazy forecast: `origin + velocity·k + 0.5·acceleration·k²` for k = 1..=steps
///
/// Cloning the iterator restarts nothing and shares nothing; a clone taken
/// before iteration yields the same sequence again.
#[derive(Debug, Clone)]
pub struct Forecast {
    origin: DVector<f64>,
    velocity: DVector<f64>,
    acceleration: DVector<f64>,
    step: usize,
    steps_ahead: usize,
}

impl Forecast {
    fn hold(position: &Position, steps_ahead: usize) -> Self {
        let zero = DVector::zeros(position.dim());
        Forecast {
            origin: position.vector().clone(),
            velocity: zero.clone(),
            acceleration: zero,
            step: 0,
            steps_ahead,
        }
    }

    fn empty() -> Self {
        Forecast {
            origin: DVector::zeros(0),
            velocity: DVector::zeros(0),
            acceleration: DVector::zeros(0),
            step: 0,
            steps_ahead: 0,
        }
    }
}

impl Iterator for Forecast {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.step >= self.steps_ahead {
            return None;
        }
        self.step += 1;
        let k = self.step as f64;
        let next = &self.origin + &self.velocity * k + &self.acceleration * (0.5 * k * k);
        Some(Position::from_vector(next))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps_ahead - self.step;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Forecast {}

/// Heuristic acceleration term: desired unit direction minus velocity.
///
/// This is not a kinematic model. It pulls the quadratic term towards unit
/// speed along the current heading. Replace this function to plug in a
/// validated motion model.
pub fn heuristic_correction(velocity: &DVector<f64>) -> DVector<f64> {
    let desired_direction = velocity / velocity.norm();
    desired_direction - velocity
}

/// Velocity between the last two observations, `None` when fewer than two
fn window_velocity(window: &PredictionWindow) -> SafetyResult<Option<(Position, DVector<f64>)>> {
    match window.last_two() {
        Some((previous, current)) => {
            let velocity = displacement(previous, current)?;
            Ok(Some((current.clone(), velocity)))
        }
        None => Ok(None),
    }
}

/// Forecast `steps_ahead` positions using constant velocity plus the
/// heuristic correction
pub fn forecast(window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Forecast> {
    let (current, velocity) = match window_velocity(window)? {
        Some(state) => state,
        None => {
            return Ok(match window.last() {
                Some(last) => Forecast::hold(last, steps_ahead),
                None => Forecast::empty(),
            })
        }
    };

    if velocity.iter().all(|v| *v == 0.0) {
        return Ok(Forecast::hold(&current, steps_ahead));
    }

    let acceleration = heuristic_correction(&velocity);
    Ok(Forecast {
        origin: current.vector().clone(),
        velocity,
        acceleration,
        step: 0,
        steps_ahead,
    })
}

/// Eager form of [`forecast`]
pub fn predict_next(window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Vec<Position>> {
    Ok(forecast(window, steps_ahead)?.collect())
}

/// Advance one step towards a known target.
///
/// The new heading is the normalized average of `heading` and the unit
/// vector towards `target`. If that average vanishes the target direction
/// is used, then the bare heading; with no usable direction the position is
/// held.
pub fn heuristic_predict_next(
    current: &Position,
    heading: &DVector<f64>,
    speed: f64,
    time_step: f64,
    target: &Position,
) -> SafetyResult<Position> {
    if heading.len() != current.dim() {
        return Err(SafetyError::DimensionMismatch {
            expected: current.dim(),
            found: heading.len(),
        });
    }
    let toward_target = unit_vector(current, target)?;

    let mut candidates = Vec::with_capacity(3);
    if let Some(t) = &toward_target {
        candidates.push((heading + t) / 2.0);
        candidates.push(t.clone());
    }
    candidates.push(heading.clone());

    match candidates.into_iter().find(|c| c.norm() > 0.0) {
        Some(direction) => {
            let new_heading = &direction / direction.norm();
            Ok(Position::from_vector(
                current.vector() + new_heading * (speed * time_step),
            ))
        }
        None => {
            debug!("No usable heading at {}, holding position", current);
            Ok(current.clone())
        }
    }
}

/// Constant velocity with the heuristic quadratic correction
#[derive(Debug, Default)]
pub struct HeuristicAccelerationPredictor;

impl HeuristicAccelerationPredictor {
    pub fn new() -> Self {
        HeuristicAccelerationPredictor
    }
}

impl TrajectoryPredictor for HeuristicAccelerationPredictor {
    fn predict(&self, window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Vec<Position>> {
        predict_next(window, steps_ahead)
    }

    fn name(&self) -> &str {
        "HeuristicAcceleration"
    }
}

/// Plain linear extrapolation of the last observed velocity
#[derive(Debug, Default)]
pub struct ConstantVelocityPredictor;

impl ConstantVelocityPredictor {
    pub fn new() -> Self {
        ConstantVelocityPredictor
    }
}

impl TrajectoryPredictor for ConstantVelocityPredictor {
    fn predict(&self, window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Vec<Position>> {
        let forecast = match window_velocity(window)? {
            Some((current, velocity)) => Forecast {
                origin: current.vector().clone(),
                acceleration: DVector::zeros(velocity.len()),
                velocity,
                step: 0,
                steps_ahead,
            },
            None => match window.last() {
                Some(last) => Forecast::hold(last, steps_ahead),
                None => Forecast::empty(),
            },
        };
        Ok(forecast.collect())
    }

    fn name(&self) -> &str {
        "ConstantVelocity"
    }
}

/// Walks towards a known end point, repeatedly applying
/// [`heuristic_predict_next`] starting from the observed heading
#[derive(Debug)]
pub struct TargetSeekingPredictor {
    target: Position,
    speed: f64,
    time_step: f64,
}

impl TargetSeekingPredictor {
    pub fn new(target: Position, speed: f64, time_step: f64) -> Self {
        TargetSeekingPredictor {
            target,
            speed,
            time_step,
        }
    }

    pub fn target(&self) -> &Position {
        &self.target
    }

    /// Distance covered per predicted step
    pub fn step_length(&self) -> f64 {
        self.speed * self.time_step
    }
}

impl TrajectoryPredictor for TargetSeekingPredictor {
    fn predict(&self, window: &PredictionWindow, steps_ahead: usize) -> SafetyResult<Vec<Position>> {
        let (mut current, mut heading) = match window_velocity(window)? {
            Some(state) => state,
            None => match window.last() {
                Some(last) => (last.clone(), DVector::zeros(last.dim())),
                None => return Ok(Vec::new()),
            },
        };
        if heading.norm() > 0.0 {
            heading.normalize_mut();
        }

        let mut predicted = Vec::with_capacity(steps_ahead);
        for _ in 0..steps_ahead {
            let next = heuristic_predict_next(&current, &heading, self.speed, self.time_step, &self.target)?;
            let step = displacement(&current, &next)?;
            if step.norm() > 0.0 {
                heading = &step / step.norm();
            }
            predicted.push(next.clone());
            current = next;
        }
        Ok(predicted)
    }

    fn name(&self) -> &str {
        "TargetSeeking"
    }

    fn configure(&mut self, params: &HashMap<String, f64>) -> SafetyResult<()> {
        if let Some(&speed) = params.get("speed") {
            if !(speed >= 0.0 && speed.is_finite()) {
                return Err(SafetyError::invalid("speed", "must be finite and non-negative"));
            }
            self.speed = speed;
        }
        if let Some(&time_step) = params.get("time_step") {
            if !(time_step > 0.0 && time_step.is_finite()) {
                return Err(SafetyError::invalid("time_step", "must be finite and positive"));
            }
            self.time_step = time_step;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::path_from_grid;

    fn window(points: &[(i32, i32)]) -> PredictionWindow {
        path_from_grid(points).into_iter().collect()
    }

    fn assert_close(a: &Position, b: &Position) {
        assert!(
            a.approx_eq(b),
            "expected {} to be close to {}",
            a,
            b
        );
    }

    #[test]
    fn single_observation_holds_position() {
        let predicted = predict_next(&window(&[(3, 4)]), 5).unwrap();
        assert_eq!(predicted.len(), 5);
        assert!(predicted.iter().all(|p| *p == Position::xy(3.0, 4.0)));
    }

    #[test]
    fn empty_window_forecasts_nothing() {
        assert!(predict_next(&PredictionWindow::new(10), 4).unwrap().is_empty());
    }

    #[test]
    fn zero_velocity_holds_current_position() {
        let predicted = predict_next(&window(&[(0, 0), (2, 2), (2, 2)]), 3).unwrap();
        assert_eq!(predicted, vec![Position::xy(2.0, 2.0); 3]);
    }

    #[test]
    fn unit_speed_reduces_to_linear_extrapolation() {
        let predicted = predict_next(&window(&[(0, 0), (1, 0)]), 2).unwrap();
        assert_close(&predicted[0], &Position::xy(2.0, 0.0));
        assert_close(&predicted[1], &Position::xy(3.0, 0.0));
    }

    #[test]
    fn axis_aligned_motion_is_not_treated_as_stationary() {
        let predicted = predict_next(&window(&[(0, 0), (0, 1)]), 1).unwrap();
        assert_close(&predicted[0], &Position::xy(0.0, 2.0));
    }

    #[test]
    fn heuristic_correction_bends_fast_motion() {
        // v = (2, 0), correction = (1, 0) - (2, 0) = (-1, 0)
        let predicted = predict_next(&window(&[(0, 0), (2, 0)]), 3).unwrap();
        assert_close(&predicted[0], &Position::xy(3.5, 0.0));
        assert_close(&predicted[1], &Position::xy(4.0, 0.0));
        assert_close(&predicted[2], &Position::xy(3.5, 0.0));
    }

    #[test]
    fn forecast_is_exact_size_and_restartable() {
        let lazy = forecast(&window(&[(0, 0), (1, 1)]), 4).unwrap();
        assert_eq!(lazy.len(), 4);
        let first: Vec<Position> = lazy.clone().collect();
        let second: Vec<Position> = lazy.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn mixed_dimensions_in_window_fail() {
        let mut w = PredictionWindow::new(10);
        w.push(Position::xy(0.0, 0.0));
        w.push(Position::new(vec![1.0, 0.0, 0.0]));
        assert!(matches!(
            predict_next(&w, 2),
            Err(SafetyError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn heuristic_step_blends_heading_and_target() {
        let heading = DVector::from_vec(vec![1.0, 0.0]);
        let next = heuristic_predict_next(
            &Position::xy(0.0, 0.0),
            &heading,
            2.0,
            0.5,
            &Position::xy(0.0, 10.0),
        )
        .unwrap();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_close(&next, &Position::xy(s, s));
    }

    #[test]
    fn heuristic_step_at_target_with_no_heading_holds() {
        let here = Position::xy(4.0, 5.0);
        let next = heuristic_predict_next(&here, &DVector::zeros(2), 10.0, 0.1, &here).unwrap();
        assert_eq!(next, here);
    }

    #[test]
    fn heuristic_step_facing_away_turns_to_target() {
        let heading = DVector::from_vec(vec![-1.0, 0.0]);
        let next = heuristic_predict_next(
            &Position::xy(0.0, 0.0),
            &heading,
            1.0,
            1.0,
            &Position::xy(5.0, 0.0),
        )
        .unwrap();
        assert_close(&next, &Position::xy(1.0, 0.0));
    }

    #[test]
    fn constant_velocity_predictor_is_linear() {
        let predictor = ConstantVelocityPredictor::new();
        let predicted = predictor.predict(&window(&[(0, 0), (2, 0)]), 2).unwrap();
        assert_close(&predicted[1], &Position::xy(6.0, 0.0));
    }

    #[test]
    fn target_seeking_predictor_reaches_target_direction() {
        let predictor = TargetSeekingPredictor::new(Position::xy(0.0, 5.0), 1.0, 1.0);
        let predicted = predictor.predict(&window(&[(0, 0), (0, 1)]), 3).unwrap();
        assert_close(&predicted[2], &Position::xy(0.0, 4.0));
    }

    #[test]
    fn target_seeking_configure_updates_step_length() {
        let mut predictor = TargetSeekingPredictor::new(Position::xy(0.0, 9.0), 1.0, 1.0);
        let mut params = HashMap::new();
        params.insert("speed".to_string(), 10.0);
        params.insert("time_step".to_string(), 0.2);
        predictor.configure(&params).unwrap();
        assert!((predictor.step_length() - 2.0).abs() < 1e-12);

        let predicted = predictor.predict(&window(&[(0, 0)]), 2).unwrap();
        assert_close(&predicted[0], &Position::xy(0.0, 2.0));
        assert_close(&predicted[1], &Position::xy(0.0, 4.0));
    }

    #[test]
    fn target_seeking_configure_rejects_bad_values() {
        let mut predictor = TargetSeekingPredictor::new(Position::xy(0.0, 9.0), 1.0, 1.0);
        for (key, value) in [
            ("speed", -1.0),
            ("speed", f64::NAN),
            ("time_step", 0.0),
            ("time_step", f64::NAN),
            ("time_step", f64::INFINITY),
        ] {
            let mut params = HashMap::new();
            params.insert(key.to_string(), value);
            assert!(
                matches!(predictor.configure(&params), Err(SafetyError::InvalidParameter { .. })),
                "{} = {} accepted",
                key,
                value
            );
        }
        assert_eq!(predictor.step_length(), 1.0);
    }
}
