//! Navigation module: path sources and conflict detection
pub mod collision;
pub mod pedestrian;
pub mod planner;

pub use self::collision::{find_collisions, ConflictRecord};
pub use self::pedestrian::{RandomCrossingPath, ScriptedPath};
pub use self::planner::{pad_to_length, LawnmowerSweep, PathSource};
