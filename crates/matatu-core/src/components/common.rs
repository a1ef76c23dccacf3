//! Common components used by every collidable entity.

use serde::{Deserialize, Serialize};

/// Ground-plane placement. `heading` follows the dynamics convention:
/// forward is `(sin h, cos h)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub z: f32,
    pub heading: f32,
}

impl Transform {
    pub fn new(x: f32, z: f32, heading: f32) -> Self {
        Self { x, z, heading }
    }
}

/// Rectangular footprint, `width` across and `length` along the heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub width: f32,
    pub length: f32,
}

impl Collider {
    pub fn new(width: f32, length: f32) -> Self {
        Self { width, length }
    }

    /// World-space bounds of this footprint at `transform`.
    pub fn bounds(&self, transform: &Transform) -> Aabb {
        Aabb::from_footprint(transform.x, transform.z, transform.heading, self.width, self.length)
    }
}

/// Axis-aligned bounding box on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Aabb {
    /// Box enclosing a `width` × `length` rectangle centred at `(x, z)` and
    /// rotated by `heading`.
    pub fn from_footprint(x: f32, z: f32, heading: f32, width: f32, length: f32) -> Self {
        let (s, c) = heading.sin_cos();
        let half_w = width / 2.0;
        let half_l = length / 2.0;
        // Along-heading axis is (s, c), across axis is (c, -s).
        let ext_x = (s * half_l).abs() + (c * half_w).abs();
        let ext_z = (c * half_l).abs() + (s * half_w).abs();
        Self {
            min_x: x - ext_x,
            max_x: x + ext_x,
            min_z: z - ext_z,
            max_z: z + ext_z,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_z <= other.max_z
            && self.max_z >= other.min_z
    }
}
