//! Road geometry - a straight two-lane road whose ends are joined into a loop.
//!
//! The travel axis is `z`. Positions are meters, with `z = 0` at the road
//! center and the loop seam at `±length/2`. Lateral position `x` is bounded
//! by the road width. A single crossing sits at `intersection_z`.
//!
//! ```text
//!   -half ............ [ crossing ] ............ +half
//!     ^                                            |
//!     └──────────── loop seam (wrap) ──────────────┘
//! ```

use crate::config::RoadConfig;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundRect {
    pub x_min: f32,
    pub x_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl GroundRect {
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.x_min && x <= self.x_max && z >= self.z_min && z <= self.z_max
    }
}

/// Wrap `z` into `[-half, half]` so the road loops.
pub fn wrap_z(road: &RoadConfig, z: f32) -> f32 {
    let half = road.half_length();
    if (-half..=half).contains(&z) {
        return z;
    }
    // rem_euclid instead of repeated add/subtract so huge values stay O(1).
    (z + half).rem_euclid(road.length) - half
}

/// Shortest signed distance from `from_z` to `to_z` around the loop.
///
/// The result lies in `(-half, half]`; exact half-loop ties resolve to the
/// positive direction. Antisymmetric except on that tie.
pub fn shortest_delta_z(road: &RoadConfig, from_z: f32, to_z: f32) -> f32 {
    let half = road.half_length();
    let mut d = (to_z - from_z).rem_euclid(road.length);
    if d > half {
        d -= road.length;
    }
    d
}

/// Squared ground distance to a target, taking the short way round the loop.
pub fn shortest_dist_sq(road: &RoadConfig, x: f32, z: f32, target_x: f32, target_z: f32) -> f32 {
    let dx = target_x - x;
    let dz = shortest_delta_z(road, z, target_z);
    dx * dx + dz * dz
}

pub fn road_bounds(road: &RoadConfig) -> GroundRect {
    GroundRect {
        x_min: -road.width / 2.0,
        x_max: road.width / 2.0,
        z_min: -road.half_length(),
        z_max: road.half_length(),
    }
}

pub fn intersection_bounds(road: &RoadConfig) -> GroundRect {
    let half_w = road.intersection_width / 2.0;
    GroundRect {
        x_min: -half_w,
        x_max: half_w,
        z_min: road.intersection_z - half_w,
        z_max: road.intersection_z + half_w,
    }
}

/// Is the point inside the signalised crossing (red-light zone)?
pub fn is_in_intersection(road: &RoadConfig, x: f32, z: f32) -> bool {
    intersection_bounds(road).contains(x, z)
}

/// Lateral position of the pull-over lane buses stop in.
pub fn pull_over_x(road: &RoadConfig) -> f32 {
    road.width / 2.0 - road.pull_over_inset
}

/// World position of a stop located at `z` along the loop.
pub fn stop_position(road: &RoadConfig, z: f32) -> (f32, f32) {
    (pull_over_x(road), z)
}

/// Distance ahead to the crossing for a vehicle travelling in `direction`
/// (±1 along z). Negative once the crossing is behind it.
pub fn distance_to_intersection(road: &RoadConfig, z: f32, direction: f32) -> f32 {
    if direction >= 0.0 {
        road.intersection_z - z
    } else {
        z - road.intersection_z
    }
}

/// Loop teleport for the player: crossing `half - margin` at either end
/// re-enters at the mirrored point on the other side, preserving overshoot.
pub fn wrap_player_z(road: &RoadConfig, z: f32) -> f32 {
    let limit = road.half_length() - road.wrap_margin;
    let span = 2.0 * limit;
    if span <= 0.0 {
        return wrap_z(road, z);
    }
    if (-limit..=limit).contains(&z) {
        z
    } else {
        (z + limit).rem_euclid(span) - limit
    }
}

/// Result of keeping a vehicle between the curbs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurbClamp {
    pub x: f32,
    pub speed: f32,
    pub hit_curb: bool,
}

/// Clamp lateral position to the drivable edge. Hitting the curb above
/// 0.5 m/s scrubs 10% of the speed.
pub fn clamp_to_road(road: &RoadConfig, x: f32, speed: f32) -> CurbClamp {
    let edge = pull_over_x(road);
    if x.abs() <= edge {
        return CurbClamp {
            x,
            speed,
            hit_curb: false,
        };
    }
    let speed = if speed > 0.5 { speed * 0.9 } else { speed };
    CurbClamp {
        x: x.clamp(-edge, edge),
        speed,
        hit_curb: true,
    }
}
