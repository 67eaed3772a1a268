//! Obstacle (pedestrian) path sources: scripted presets and random crossings

use super::planner::PathSource;
use crate::common::types::{path_from_grid, Path, Position};
use crate::common::{SafetyError, SafetyResult};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Named pedestrian routes on the sweep grid
pub mod presets {
    pub const PATH1: &[(i32, i32)] = &[(5, 5), (4, 5), (3, 5), (2, 5), (1, 5), (0, 5), (1, 5)];
    pub const PATH2: &[(i32, i32)] = &[
        (2, 0), (2, 1), (2, 2), (2, 3), (2, 4), (2, 5), (3, 5), (3, 4), (3, 3), (2, 3),
    ];
    pub const PATH3: &[(i32, i32)] = &[
        (4, 0), (3, 1), (2, 2), (1, 3), (0, 4), (1, 4), (2, 4), (3, 4), (4, 4), (5, 4),
    ];
    pub const PATH4: &[(i32, i32)] = &[
        (5, 0), (4, 1), (3, 2), (2, 3), (1, 4), (0, 5), (1, 6), (2, 7), (3, 8), (4, 9),
    ];
    pub const PATH5: &[(i32, i32)] = &[
        (3, 3), (3, 4), (4, 4), (4, 3), (3, 3), (2, 3), (2, 4), (1, 4), (1, 3), (0, 3),
    ];
    pub const PATH6: &[(i32, i32)] = &[
        (5, 0), (4, 1), (5, 2), (4, 3), (5, 4), (4, 5), (5, 6), (4, 7), (5, 8), (4, 9),
    ];
    pub const PATH7: &[(i32, i32)] = &[
        (1, 0), (1, 1), (1, 2), (1, 3), (1, 4), (1, 5), (1, 6), (1, 7), (1, 8), (1, 9),
    ];
    pub const PATH8: &[(i32, i32)] = &[
        (0, 5), (1, 5), (2, 5), (3, 5), (4, 5), (5, 5), (5, 5), (5, 5), (5, 5), (5, 5),
    ];
    pub const PATH9: &[(i32, i32)] = &[
        (2, 0), (3, 1), (4, 2), (5, 3), (5, 4), (5, 5), (4, 6), (3, 7), (2, 8), (1, 9),
    ];
    pub const PATH10: &[(i32, i32)] = &[
        (5, 0), (4, 1), (3, 2), (2, 3), (1, 4), (0, 5), (1, 6), (2, 7), (3, 8), (4, 9),
    ];
    pub const PATH11: &[(i32, i32)] = &[(5, 5), (4, 5), (3, 5), (2, 5), (1, 5), (0, 5)];

    /// Look up a preset by name (`path1` … `path11`)
    pub fn by_name(name: &str) -> Option<&'static [(i32, i32)]> {
        let preset = match name.to_ascii_lowercase().as_str() {
            "path1" => PATH1,
            "path2" => PATH2,
            "path3" => PATH3,
            "path4" => PATH4,
            "path5" => PATH5,
            "path6" => PATH6,
            "path7" => PATH7,
            "path8" => PATH8,
            "path9" => PATH9,
            "path10" => PATH10,
            "path11" => PATH11,
            _ => return None,
        };
        Some(preset)
    }
}

/// A fixed route, optionally walked back (mirrored) and repeated
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedPath {
    points: Path,
    mirrored: bool,
    repeat: usize,
}

impl ScriptedPath {
    pub fn new(points: Path) -> Self {
        ScriptedPath {
            points,
            mirrored: false,
            repeat: 1,
        }
    }

    /// Build from a named preset
    pub fn preset(name: &str) -> SafetyResult<Self> {
        presets::by_name(name)
            .map(|points| ScriptedPath::new(path_from_grid(points)))
            .ok_or_else(|| SafetyError::invalid("obstacle preset", &format!("unknown preset '{}'", name)))
    }

    /// Append the reversed route after the forward one
    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    /// Repeat the (possibly mirrored) route `repeat` times
    pub fn repeated(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }
}

impl PathSource for ScriptedPath {
    fn generate(&self) -> SafetyResult<Path> {
        if self.points.is_empty() {
            return Err(SafetyError::EmptyPath("scripted obstacle route".to_string()));
        }
        if self.repeat == 0 {
            return Err(SafetyError::invalid("repeat", "must be at least 1"));
        }
        let mut cycle = self.points.clone();
        if self.mirrored {
            cycle.extend(self.points.iter().rev().cloned());
        }
        let mut path = Vec::with_capacity(cycle.len() * self.repeat);
        for _ in 0..self.repeat {
            path.extend(cycle.iter().cloned());
        }
        Ok(path)
    }
}

/// Random walk from `start` towards `end` that jumps onto the agent path at
/// between 1 and `max_intersections` distinct time steps
#[derive(Debug, Clone)]
pub struct RandomCrossingPath {
    start: Position,
    end: Position,
    agent_path: Path,
    max_intersections: usize,
    seed: Option<u64>,
}

impl RandomCrossingPath {
    pub fn new(start: Position, end: Position, agent_path: Path, max_intersections: usize) -> Self {
        RandomCrossingPath {
            start,
            end,
            agent_path,
            max_intersections,
            seed: None,
        }
    }

    /// Use a fixed seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate the path using the given random source
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> SafetyResult<Path> {
        if self.max_intersections == 0 {
            return Err(SafetyError::invalid("max_intersections", "must be at least 1"));
        }
        if self.start.dim() != self.end.dim() {
            return Err(SafetyError::DimensionMismatch {
                expected: self.start.dim(),
                found: self.end.dim(),
            });
        }

        let num_steps = self.agent_path.len();
        if num_steps == 0 {
            return Ok(vec![self.start.clone()]);
        }

        let crossings = self.crossing_steps(rng);
        debug!("Random obstacle path crosses the agent path at steps {:?}", crossings);

        let mut path = Vec::with_capacity(num_steps);
        let mut current = self.start.clone();
        path.push(current.clone());
        for step in 1..num_steps {
            let next = if crossings.contains(&step) {
                self.agent_path[step].clone()
            } else {
                step_towards(&current, &self.end)
            };
            path.push(next.clone());
            current = next;
        }
        Ok(path)
    }
}

impl RandomCrossingPath {
    /// Distinct interior steps (`1..num_steps-1`) where the walk jumps onto
    /// the agent path; between 1 and `max_intersections` of them whenever
    /// the agent path has an interior
    pub(crate) fn crossing_steps<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let candidates = self.agent_path.len().saturating_sub(2);
        let wanted = rng.gen_range(1..=self.max_intersections.max(1));
        if candidates == 0 {
            return Vec::new();
        }
        sample(rng, candidates, wanted.min(candidates))
            .into_iter()
            .map(|i| i + 1)
            .collect()
    }
}

impl PathSource for RandomCrossingPath {
    fn generate(&self) -> SafetyResult<Path> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with(&mut rng)
    }
}

/// One grid move towards `target`: each coordinate changes by -1, 0 or +1
fn step_towards(current: &Position, target: &Position) -> Position {
    let coords = current
        .coords()
        .iter()
        .zip(target.coords())
        .map(|(c, t)| {
            let delta = t - c;
            if delta > 0.0 {
                c + 1.0
            } else if delta < 0.0 {
                c - 1.0
            } else {
                *c
            }
        })
        .collect();
    Position::new(coords)
}
