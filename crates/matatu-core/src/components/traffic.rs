//! Traffic components - NPC cars and static roadside obstacles.

use serde::{Deserialize, Serialize};

/// An NPC car driving along the loop axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcVehicle {
    pub speed: f32,
    /// Cruising speed this car relaxes toward.
    pub target_speed: f32,
    /// +1 drives toward +z, -1 toward -z.
    pub direction: f32,
    /// Lateral lane offset from the road center.
    pub lane: f32,
}

/// Marker for static obstacles (potholes, barriers, broken-down lorries).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle;
