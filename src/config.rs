use crate::common::types::{Path, Position};
use crate::common::{SafetyError, SafetyResult};
use crate::control::avoidance::{AvoidanceSynthesizer, DEFAULT_FORCE_DECAY, DEFAULT_FORCE_MAGNITUDE};
use crate::navigation::pedestrian::{RandomCrossingPath, ScriptedPath};
use crate::navigation::planner::{pad_to_length, LawnmowerSweep, PathSource};
use crate::perception::prediction::{
    ConstantVelocityPredictor, HeuristicAccelerationPredictor, TargetSeekingPredictor, TrajectoryPredictor,
};
use crate::perception::window::DEFAULT_WINDOW_SIZE;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where the obstacle's route comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObstacleSource {
    /// One of the named routes, optionally walked back and repeated
    Preset {
        name: String,
        #[serde(default)]
        mirrored: bool,
        #[serde(default = "default_repeat")]
        repeat: usize,
    },
    /// Random walk from `obstacle_start` to `obstacle_end` crossing the
    /// agent path between 1 and `max_intersections` times
    Random {
        #[serde(default = "default_max_intersections")]
        max_intersections: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Literal coordinates
    Explicit { points: Vec<Position> },
}

/// Obstacle motion model used for forecasting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    #[default]
    HeuristicAcceleration,
    ConstantVelocity,
    /// Heads for `obstacle_end` at `assumed_speed`
    TargetSeeking,
}

/// Smallest short-range nudge `validate` accepts at the threshold distance.
/// Keeps the push visible for coordinates up to about 1e9 in magnitude.
pub const MIN_SHORT_RANGE_NUDGE: f64 = 1e-6;

fn default_repeat() -> usize {
    1
}

fn default_max_intersections() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Minimum required separation between agent and obstacle (meters)
    pub min_distance: f64,
    /// Sweep grid as (rows, columns)
    pub grid_size: (usize, usize),
    /// Origin of the sweep grid
    pub agent_start: Position,
    pub obstacle_start: Position,
    pub obstacle_end: Position,
    /// Seconds per simulated step
    pub time_step: f64,
    /// Total simulated duration (seconds)
    pub simulation_time: f64,
    /// Forecast horizon in steps (beta)
    pub lookahead_steps: usize,
    /// Time-to-interaction above which a replan is requested (alpha)
    pub replan_time_threshold: f64,
    /// Consecutive stagnant obstacle steps tolerated before a replan (tau)
    pub stagnation_threshold: usize,
    /// Below this distance the repulsive field is used instead of the solver.
    /// Bounded so that `force_magnitude · exp(−threshold / force_decay)`
    /// stays at or above [`MIN_SHORT_RANGE_NUDGE`].
    pub short_range_threshold: f64,
    pub force_magnitude: f64,
    pub force_decay: f64,
    /// Speed assumed when converting distance into time-to-interaction
    pub assumed_speed: f64,
    pub window_size: usize,
    /// Realize the avoidance suggestion instead of the planned position
    pub apply_avoidance: bool,
    pub solver_max_iterations: usize,
    pub solver_tolerance: f64,
    pub predictor: PredictorKind,
    pub obstacle: ObstacleSource,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_distance: 1.5,
            grid_size: (10, 10),
            agent_start: Position::xy(0.0, 0.0),
            obstacle_start: Position::xy(0.0, 1.0),
            obstacle_end: Position::xy(4.0, 5.0),
            time_step: 0.1,
            simulation_time: 20.0,
            lookahead_steps: 10,
            replan_time_threshold: 5.0,
            stagnation_threshold: 3,
            short_range_threshold: 3.0,
            force_magnitude: DEFAULT_FORCE_MAGNITUDE,
            force_decay: DEFAULT_FORCE_DECAY,
            assumed_speed: 10.0,
            window_size: DEFAULT_WINDOW_SIZE,
            apply_avoidance: false,
            solver_max_iterations: 100,
            solver_tolerance: 1e-9,
            predictor: PredictorKind::default(),
            obstacle: ObstacleSource::Preset {
                name: "path11".to_string(),
                mirrored: true,
                repeat: 5,
            },
        }
    }
}

impl SafetyConfig {
    pub async fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = SafetyConfig::from_toml_str(&content)?;
        Ok(config)
    }

    /// Parse and validate a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> SafetyResult<Self> {
        let config: SafetyConfig =
            toml::from_str(content).map_err(|e| SafetyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Override numeric parameters by name
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> SafetyResult<()> {
        for (key, &value) in params {
            match key.as_str() {
                "min_distance" => self.min_distance = value,
                "time_step" => self.time_step = value,
                "simulation_time" => self.simulation_time = value,
                "lookahead_steps" | "beta" => self.lookahead_steps = count(key, value)?,
                "replan_time_threshold" | "alpha" => self.replan_time_threshold = value,
                "stagnation_threshold" | "tau" => self.stagnation_threshold = count(key, value)?,
                "short_range_threshold" => self.short_range_threshold = value,
                "force_magnitude" => self.force_magnitude = value,
                "force_decay" => self.force_decay = value,
                "assumed_speed" => self.assumed_speed = value,
                "window_size" => self.window_size = count(key, value)?,
                "solver_max_iterations" => self.solver_max_iterations = count(key, value)?,
                "solver_tolerance" => self.solver_tolerance = value,
                _ => return Err(SafetyError::invalid(key, "unknown parameter")),
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> SafetyResult<()> {
        // Comparisons are written so that NaN fails them
        let positive = [
            ("min_distance", self.min_distance),
            ("time_step", self.time_step),
            ("simulation_time", self.simulation_time),
            ("force_magnitude", self.force_magnitude),
            ("force_decay", self.force_decay),
            ("assumed_speed", self.assumed_speed),
            ("solver_tolerance", self.solver_tolerance),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SafetyError::invalid(name, "must be finite and positive"));
            }
        }
        let non_negative = [
            ("replan_time_threshold", self.replan_time_threshold),
            ("short_range_threshold", self.short_range_threshold),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(SafetyError::invalid(name, "must be finite and non-negative"));
            }
        }
        if self.grid_size.0 == 0 || self.grid_size.1 == 0 {
            return Err(SafetyError::invalid("grid_size", "both dimensions must be positive"));
        }
        if self.lookahead_steps == 0 {
            return Err(SafetyError::invalid("lookahead_steps", "must be at least 1"));
        }
        if self.window_size < 2 {
            return Err(SafetyError::invalid("window_size", "must hold at least 2 positions"));
        }
        if self.solver_max_iterations == 0 {
            return Err(SafetyError::invalid("solver_max_iterations", "must be at least 1"));
        }
        let nudge = self.force_magnitude * (-self.short_range_threshold / self.force_decay).exp();
        if !(nudge >= MIN_SHORT_RANGE_NUDGE) {
            return Err(SafetyError::invalid(
                "short_range_threshold",
                &format!(
                    "repulsive push at {} would be {:e}, below {:e}",
                    self.short_range_threshold, nudge, MIN_SHORT_RANGE_NUDGE
                ),
            ));
        }
        Ok(())
    }

    /// Number of steps that fit in the simulated duration
    pub fn max_steps(&self) -> usize {
        (self.simulation_time / self.time_step).round() as usize
    }

    /// Avoidance synthesizer built from the force and solver settings
    pub fn avoidance_synthesizer(&self) -> SafetyResult<AvoidanceSynthesizer> {
        let mut params = HashMap::new();
        params.insert("force_magnitude".to_string(), self.force_magnitude);
        params.insert("force_decay".to_string(), self.force_decay);
        params.insert("solver_max_iterations".to_string(), self.solver_max_iterations as f64);
        params.insert("solver_tolerance".to_string(), self.solver_tolerance);
        let mut synthesizer = AvoidanceSynthesizer::new();
        synthesizer.configure(&params)?;
        Ok(synthesizer)
    }

    /// Obstacle predictor selected by `predictor`
    pub fn trajectory_predictor(&self) -> SafetyResult<Box<dyn TrajectoryPredictor>> {
        let predictor: Box<dyn TrajectoryPredictor> = match self.predictor {
            PredictorKind::HeuristicAcceleration => Box::new(HeuristicAccelerationPredictor::new()),
            PredictorKind::ConstantVelocity => Box::new(ConstantVelocityPredictor::new()),
            PredictorKind::TargetSeeking => {
                let mut predictor = TargetSeekingPredictor::new(self.obstacle_end.clone(), 1.0, 1.0);
                let mut params = HashMap::new();
                params.insert("speed".to_string(), self.assumed_speed);
                params.insert("time_step".to_string(), self.time_step);
                predictor.configure(&params)?;
                Box::new(predictor)
            }
        };
        Ok(predictor)
    }

    /// The agent's sweep over the configured grid
    pub fn agent_path(&self) -> SafetyResult<Path> {
        LawnmowerSweep::new(self.grid_size.0, self.grid_size.1)
            .starting_at(self.agent_start.clone())
            .generate()
    }

    /// The obstacle route, padded to the agent path's length
    pub fn obstacle_path(&self, agent_path: &[Position]) -> SafetyResult<Path> {
        let path = match &self.obstacle {
            ObstacleSource::Preset {
                name,
                mirrored,
                repeat,
            } => ScriptedPath::preset(name)?
                .mirrored(*mirrored)
                .repeated(*repeat)
                .generate()?,
            ObstacleSource::Random {
                max_intersections,
                seed,
            } => {
                let mut source = RandomCrossingPath::new(
                    self.obstacle_start.clone(),
                    self.obstacle_end.clone(),
                    agent_path.to_vec(),
                    *max_intersections,
                );
                if let Some(seed) = seed {
                    source = source.with_seed(*seed);
                }
                source.generate()?
            }
            ObstacleSource::Explicit { points } => ScriptedPath::new(points.clone()).generate()?,
        };
        pad_to_length(path, agent_path.len())
    }
}

fn count(name: &str, value: f64) -> SafetyResult<usize> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(SafetyError::invalid(name, "must be a non-negative whole number"));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SafetyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_steps(), 200);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SafetyConfig::from_toml_str(
            r#"
            min_distance = 2.0
            grid_size = [4, 6]

            [obstacle]
            kind = "random"
            max_intersections = 2
            seed = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.min_distance, 2.0);
        assert_eq!(config.grid_size, (4, 6));
        assert_eq!(config.lookahead_steps, 10);
        assert_eq!(
            config.obstacle,
            ObstacleSource::Random {
                max_intersections: 2,
                seed: Some(3)
            }
        );
    }

    #[test]
    fn explicit_points_parse_as_arrays() {
        let config = SafetyConfig::from_toml_str(
            r#"
            [obstacle]
            kind = "explicit"
            points = [[0.0, 1.0], [1.0, 1.0]]
            "#,
        )
        .unwrap();
        let agent = config.agent_path().unwrap();
        let obstacle = config.obstacle_path(&agent).unwrap();
        assert_eq!(obstacle.len(), agent.len());
        assert_eq!(obstacle[1], Position::xy(1.0, 1.0));
        assert_eq!(obstacle[99], Position::xy(1.0, 1.0));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            SafetyConfig::from_toml_str("min_distance = \"far\""),
            Err(SafetyError::Config(_))
        ));
    }

    #[test]
    fn parameter_overrides_are_validated() {
        let mut config = SafetyConfig::default();
        let mut params = HashMap::new();
        params.insert("tau".to_string(), 5.0);
        params.insert("alpha".to_string(), 2.5);
        config.configure(&params).unwrap();
        assert_eq!(config.stagnation_threshold, 5);
        assert_eq!(config.replan_time_threshold, 2.5);

        params.insert("assumed_speed".to_string(), 0.0);
        assert!(config.configure(&params).is_err());

        let mut unknown = HashMap::new();
        unknown.insert("warp_factor".to_string(), 9.0);
        assert!(SafetyConfig::default().configure(&unknown).is_err());
    }

    #[test]
    fn nan_values_are_rejected() {
        for key in ["min_distance", "time_step", "assumed_speed", "replan_time_threshold"] {
            let doc = format!("{} = nan", key);
            assert!(
                matches!(
                    SafetyConfig::from_toml_str(&doc),
                    Err(SafetyError::InvalidParameter { .. })
                ),
                "{} accepted",
                doc
            );
        }

        let mut config = SafetyConfig::default();
        config.short_range_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut params = HashMap::new();
        params.insert("force_decay".to_string(), f64::NAN);
        assert!(SafetyConfig::default().configure(&params).is_err());
    }

    #[test]
    fn short_range_threshold_must_leave_a_visible_push() {
        let mut config = SafetyConfig::default();
        config.short_range_threshold = 20.0;
        assert!(matches!(
            config.validate(),
            Err(SafetyError::InvalidParameter { ref name, .. }) if name == "short_range_threshold"
        ));

        // 2.1 · exp(−4.3 / 0.3) ≈ 1.2e-6
        config.short_range_threshold = 4.3;
        assert!(config.validate().is_ok());
        let synthesizer = config.avoidance_synthesizer().unwrap();
        for agent in [Position::xy(4.29, 0.0), Position::xy(1.0e6 + 4.29, 1.0e6)] {
            let obstacle = Position::xy(agent.coords()[0] - 4.29, agent.coords()[1]);
            let adjusted = synthesizer
                .adjust_position(&agent, &obstacle, config.min_distance, config.short_range_threshold)
                .unwrap();
            assert_ne!(adjusted, agent);
        }
    }

    #[test]
    fn predictor_kind_selects_model() {
        let config = SafetyConfig::default();
        assert_eq!(config.predictor, PredictorKind::HeuristicAcceleration);
        assert_eq!(config.trajectory_predictor().unwrap().name(), "HeuristicAcceleration");

        let config = SafetyConfig::from_toml_str("predictor = \"constant_velocity\"").unwrap();
        assert_eq!(config.trajectory_predictor().unwrap().name(), "ConstantVelocity");

        let config = SafetyConfig::from_toml_str(
            r#"
            predictor = "target_seeking"
            obstacle_end = [5.0, 9.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.trajectory_predictor().unwrap().name(), "TargetSeeking");

        assert!(matches!(
            SafetyConfig::from_toml_str("predictor = \"psychic\""),
            Err(SafetyError::Config(_))
        ));
    }

    #[test]
    fn default_obstacle_route_is_mirrored_preset() {
        let config = SafetyConfig::default();
        let agent = config.agent_path().unwrap();
        let obstacle = config.obstacle_path(&agent).unwrap();
        assert_eq!(obstacle.len(), 100);
        assert_eq!(obstacle[0], Position::xy(5.0, 5.0));
        assert_eq!(obstacle[99], Position::xy(5.0, 5.0));
    }
}
