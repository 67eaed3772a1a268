//! Step-wise stop / continue / replan controller
//!
//! One call to [`DecisionLoop::step`] processes one simulated time step:
//! forecast the obstacle, update stagnation tracking, check for conflicts,
//! then decide whether the agent advances, holds, or hands off to a
//! replanner. `Stopped` only holds the agent for that step; `ReplanTriggered`
//! ends the run.

use crate::common::geometry::{distance, within_range};
use crate::common::types::{Path, Position};
use crate::common::{SafetyError, SafetyResult};
use crate::config::SafetyConfig;
use crate::control::avoidance::AvoidanceSynthesizer;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::navigation::collision::{find_collisions, ConflictRecord};
use crate::navigation::planner::pad_to_length;
use crate::perception::prediction::{HeuristicAccelerationPredictor, TrajectoryPredictor};
use crate::perception::window::PredictionWindow;
use serde::Serialize;
use tracing::{debug, info};

/// Decision taken for a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    /// The agent advanced to its next planned position
    Continue,
    /// Agent and obstacle share a position; the agent held in place
    Stopped,
    /// Interaction too distant in time or obstacle stalled; run halted
    ReplanTriggered,
}

/// Markers handed to presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SafetyEvent {
    Stop {
        step: usize,
        position: Position,
    },
    Replan {
        step: usize,
        position: Position,
        stagnant_steps: usize,
        time_to_interaction: f64,
    },
}

/// Everything observed and decided during one step
#[derive(Debug, Clone, Serialize)]
pub struct StepSnapshot {
    pub step: usize,
    /// Index into the agent path evaluated at this step
    pub agent_step: usize,
    pub obstacle: Position,
    pub realized: Position,
    pub forecast: Vec<Position>,
    pub outcome: StepOutcome,
    pub stagnant_steps: usize,
    pub time_to_interaction: Option<f64>,
    /// Conflicts between the agent's upcoming positions and the forecast;
    /// entry `i` is `i + 1` steps ahead
    pub lookahead_conflicts: ConflictRecord,
    /// Avoidance position for this step when a conflict was found
    pub suggested: Option<Position>,
}

/// Mutable run state, reset whenever the loop is (re)activated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopState {
    pub sim_step: usize,
    pub agent_step: usize,
    pub stagnant_steps: usize,
    pub realized: Path,
    pub predictions: Vec<Path>,
    pub halted: bool,
}

/// Output of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub realized: Path,
    pub snapshots: Vec<StepSnapshot>,
    pub events: Vec<SafetyEvent>,
    pub replan_step: Option<usize>,
}

/// Per-step safety controller for one agent and one obstacle
#[derive(Debug)]
pub struct DecisionLoop {
    base: LifecycleNodeBase,
    config: SafetyConfig,
    predictor: Box<dyn TrajectoryPredictor>,
    /// Rebuild the predictor from `config.predictor` on configure
    predictor_from_config: bool,
    synthesizer: AvoidanceSynthesizer,
    agent_path: Path,
    obstacle_path: Path,
    state: LoopState,
    snapshots: Vec<StepSnapshot>,
    events: Vec<SafetyEvent>,
}

impl DecisionLoop {
    /// Create a loop whose predictor follows `config.predictor`.
    ///
    /// The predictor is built when the loop is configured.
    pub fn new(config: SafetyConfig, agent_path: Path, obstacle_path: Path) -> Self {
        let mut decision_loop = DecisionLoop::with_boxed_predictor(
            config,
            agent_path,
            obstacle_path,
            Box::new(HeuristicAccelerationPredictor::new()),
        );
        decision_loop.predictor_from_config = true;
        decision_loop
    }

    /// Create a loop with a specific predictor
    pub fn with_predictor<T: TrajectoryPredictor + 'static>(
        config: SafetyConfig,
        agent_path: Path,
        obstacle_path: Path,
        predictor: T,
    ) -> Self {
        DecisionLoop::with_boxed_predictor(config, agent_path, obstacle_path, Box::new(predictor))
    }

    pub fn with_boxed_predictor(
        config: SafetyConfig,
        agent_path: Path,
        obstacle_path: Path,
        predictor: Box<dyn TrajectoryPredictor>,
    ) -> Self {
        DecisionLoop {
            base: LifecycleNodeBase::new("decision_loop"),
            config,
            predictor,
            predictor_from_config: false,
            synthesizer: AvoidanceSynthesizer::new(),
            agent_path,
            obstacle_path,
            state: LoopState::default(),
            snapshots: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Get the name of the predictor in use
    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    pub fn lifecycle_state(&self) -> State {
        self.base.get_state()
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Obstacle path after padding (padded during configuration)
    pub fn obstacle_path(&self) -> &[Position] {
        &self.obstacle_path
    }

    /// Steps this run can take at most
    pub fn total_steps(&self) -> usize {
        self.agent_path.len().min(self.config.max_steps())
    }

    /// Process the next step. Returns `None` once the run is over.
    pub fn step(&mut self) -> SafetyResult<Option<StepOutcome>> {
        if !self.base.is_active() {
            return Err(SafetyError::NotActive {
                component: self.base.name.clone(),
            });
        }
        if self.state.halted || self.state.sim_step >= self.total_steps() {
            return Ok(None);
        }

        let s = self.state.sim_step;
        let obstacle = self.obstacle_path[s].clone();
        let agent = self.agent_path[self.state.agent_step].clone();

        // Fallible work first; loop state is only touched once nothing can fail
        let window = PredictionWindow::from_history(&self.obstacle_path, s, self.config.window_size);
        let forecast = self.predictor.predict(&window, self.config.lookahead_steps)?;

        let stagnant_steps = if s > 0 && obstacle.approx_eq(&self.obstacle_path[s - 1]) {
            self.state.stagnant_steps + 1
        } else {
            0
        };

        let upcoming_start = (self.state.agent_step + 1).min(self.agent_path.len());
        let lookahead_conflicts = find_collisions(
            &self.agent_path[upcoming_start..],
            &forecast,
            self.config.min_distance,
        )?;
        let suggested = if !lookahead_conflicts.is_empty()
            || within_range(&agent, &obstacle, self.config.min_distance)?
        {
            Some(self.synthesizer.adjust_position(
                &agent,
                &obstacle,
                self.config.min_distance,
                self.config.short_range_threshold,
            )?)
        } else {
            None
        };

        let time_to_interaction = if agent == obstacle {
            None
        } else {
            Some(distance(&agent, &obstacle)? / self.config.assumed_speed)
        };

        let (outcome, realized, event) = match time_to_interaction {
            None => {
                let held = self.state.realized.last().cloned().unwrap_or_else(|| agent.clone());
                info!("Stop at step {}: agent and obstacle would collide at {}", s, agent);
                let event = SafetyEvent::Stop {
                    step: s,
                    position: held.clone(),
                };
                (StepOutcome::Stopped, held, Some(event))
            }
            Some(tti)
                if tti > self.config.replan_time_threshold
                    || stagnant_steps > self.config.stagnation_threshold =>
            {
                info!(
                    "Replan at step {}: obstacle at {} (stagnant for {} steps, time to interaction {:.2})",
                    s, obstacle, stagnant_steps, tti
                );
                let event = SafetyEvent::Replan {
                    step: s,
                    position: agent.clone(),
                    stagnant_steps,
                    time_to_interaction: tti,
                };
                (StepOutcome::ReplanTriggered, agent.clone(), Some(event))
            }
            Some(_) => {
                let next = match (&suggested, self.config.apply_avoidance) {
                    (Some(adjusted), true) => adjusted.clone(),
                    _ => agent.clone(),
                };
                (StepOutcome::Continue, next, None)
            }
        };

        debug!(
            "Step {}: {:?}, agent {} -> {}, {} lookahead conflicts",
            s,
            outcome,
            agent,
            realized,
            lookahead_conflicts.len()
        );

        self.state.stagnant_steps = stagnant_steps;
        self.state.predictions.push(forecast.clone());
        self.state.realized.push(realized.clone());
        match outcome {
            StepOutcome::Continue => self.state.agent_step += 1,
            StepOutcome::ReplanTriggered => self.state.halted = true,
            StepOutcome::Stopped => {}
        }
        self.events.extend(event);
        self.snapshots.push(StepSnapshot {
            step: s,
            agent_step: self.state.agent_step - usize::from(outcome == StepOutcome::Continue),
            obstacle,
            realized,
            forecast,
            outcome,
            stagnant_steps,
            time_to_interaction,
            lookahead_conflicts,
            suggested,
        });
        self.state.sim_step += 1;

        Ok(Some(outcome))
    }

    /// Run from the start until the paths are exhausted or a replan halts
    pub fn run(&mut self) -> SafetyResult<SimulationReport> {
        self.on_activate()?;
        while self.step()?.is_some() {}
        self.on_deactivate()?;
        Ok(self.report())
    }

    /// Results accumulated so far
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            realized: self.state.realized.clone(),
            snapshots: self.snapshots.clone(),
            events: self.events.clone(),
            replan_step: self.events.iter().find_map(|event| match event {
                SafetyEvent::Replan { step, .. } => Some(*step),
                _ => None,
            }),
        }
    }

    fn reset(&mut self) {
        self.state = LoopState::default();
        self.snapshots.clear();
        self.events.clear();
    }
}

impl LifecycleNode for DecisionLoop {
    fn on_configure(&mut self) -> SafetyResult<()> {
        debug!("Configuring {}", self.base.name);
        self.config.validate()?;
        self.synthesizer = self.config.avoidance_synthesizer()?;
        if self.predictor_from_config {
            self.predictor = self.config.trajectory_predictor()?;
        }
        self.obstacle_path = pad_to_length(std::mem::take(&mut self.obstacle_path), self.agent_path.len())?;
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> SafetyResult<()> {
        if self.base.get_state() == State::Unconfigured {
            self.on_configure()?;
        }
        debug!("Activating {}", self.base.name);
        self.reset();
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> SafetyResult<()> {
        debug!("Deactivating {}", self.base.name);
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> SafetyResult<()> {
        debug!("Cleaning up {}", self.base.name);
        self.reset();
        self.base.set_state(State::Unconfigured);
        Ok(())
    }
}
