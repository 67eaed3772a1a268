//! Pointwise conflict detection between two index-aligned paths

use crate::common::geometry::within_range;
use crate::common::types::Position;
use crate::common::SafetyResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Time-step index → (position on path A, position on path B) for every
/// index closer than the minimum safe distance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictRecord {
    conflicts: BTreeMap<usize, (Position, Position)>,
}

impl ConflictRecord {
    pub fn new() -> Self {
        ConflictRecord::default()
    }

    pub fn insert(&mut self, index: usize, a: Position, b: Position) {
        self.conflicts.insert(index, (a, b));
    }

    pub fn get(&self, index: usize) -> Option<&(Position, Position)> {
        self.conflicts.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.conflicts.contains_key(&index)
    }

    /// Conflicting indices in ascending order
    pub fn indices(&self) -> Vec<usize> {
        self.conflicts.keys().copied().collect()
    }

    /// Earliest conflicting index
    pub fn first(&self) -> Option<(usize, &(Position, Position))> {
        self.conflicts.iter().next().map(|(i, pair)| (*i, pair))
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &(Position, Position))> {
        self.conflicts.iter()
    }
}

/// Report every index where the two paths are within `min_distance`.
///
/// Only indices present in both paths are compared. This is a same-time-step
/// test; crossings between steps are not detected.
pub fn find_collisions(
    path_a: &[Position],
    path_b: &[Position],
    min_distance: f64,
) -> SafetyResult<ConflictRecord> {
    let mut record = ConflictRecord::new();
    for (i, (a, b)) in path_a.iter().zip(path_b.iter()).enumerate() {
        if within_range(a, b, min_distance)? {
            record.insert(i, a.clone(), b.clone());
        }
    }
    Ok(record)
}
