//! Bounded history of recent obstacle observations

use crate::common::types::Position;
use std::collections::VecDeque;

/// Default number of observations kept for prediction
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// The most recent observed positions of a tracked obstacle, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionWindow {
    capacity: usize,
    positions: VecDeque<Position>,
}

impl PredictionWindow {
    /// Create an empty window holding at most `capacity` positions
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        PredictionWindow {
            capacity,
            positions: VecDeque::with_capacity(capacity),
        }
    }

    /// Build the window seen at time step `step`: observations up to and
    /// including `step`, limited to the last `capacity` of them
    pub fn from_history(history: &[Position], step: usize, capacity: usize) -> Self {
        let mut window = PredictionWindow::new(capacity);
        if history.is_empty() {
            return window;
        }
        let end = step.min(history.len() - 1) + 1;
        let start = end.saturating_sub(window.capacity);
        for position in &history[start..end] {
            window.push(position.clone());
        }
        window
    }

    /// Add an observation, evicting the oldest one when full
    pub fn push(&mut self, position: Position) {
        if self.positions.len() == self.capacity {
            self.positions.pop_front();
        }
        self.positions.push_back(position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent observation
    pub fn last(&self) -> Option<&Position> {
        self.positions.back()
    }

    /// The two most recent observations as (previous, current)
    pub fn last_two(&self) -> Option<(&Position, &Position)> {
        let n = self.positions.len();
        if n < 2 {
            return None;
        }
        Some((&self.positions[n - 2], &self.positions[n - 1]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }
}

impl FromIterator<Position> for PredictionWindow {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut window = PredictionWindow::new(DEFAULT_WINDOW_SIZE);
        for position in iter {
            window.push(position);
        }
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::path_from_grid;

    #[test]
    fn early_steps_use_all_prior_observations() {
        let history = path_from_grid(&[(0, 0), (1, 0), (2, 0), (3, 0)]);
        let window = PredictionWindow::from_history(&history, 2, 10);
        assert_eq!(window.len(), 3);
        assert_eq!(window.last(), Some(&Position::xy(2.0, 0.0)));
    }

    #[test]
    fn late_steps_keep_only_the_last_ten() {
        let points: Vec<(i32, i32)> = (0..15).map(|i| (i, 0)).collect();
        let history = path_from_grid(&points);
        let window = PredictionWindow::from_history(&history, 12, 10);
        assert_eq!(window.len(), 10);
        assert_eq!(window.iter().next(), Some(&Position::xy(3.0, 0.0)));
        assert_eq!(window.last(), Some(&Position::xy(12.0, 0.0)));
    }

    #[test]
    fn push_evicts_oldest() {
        let mut window = PredictionWindow::new(2);
        window.push(Position::xy(0.0, 0.0));
        window.push(Position::xy(1.0, 0.0));
        window.push(Position::xy(2.0, 0.0));
        let (prev, cur) = window.last_two().unwrap();
        assert_eq!(prev, &Position::xy(1.0, 0.0));
        assert_eq!(cur, &Position::xy(2.0, 0.0));
    }
}
