//! Collision queries between the matatu and everything in the ECS world.

use hecs::{Entity, World};
use matatu_logic::config::{EnforcementConfig, ObstacleSpec, VehicleConfig};
use matatu_logic::dynamics::VehicleState;

use crate::components::{Aabb, Collider, NpcVehicle, Obstacle, Transform};
use crate::presentation::EventQueue;
use crate::state::{GameState, Role};

/// The matatu's current footprint.
pub fn player_bounds(cfg: &VehicleConfig, vehicle: &VehicleState) -> Aabb {
    Aabb::from_footprint(vehicle.x, vehicle.z, vehicle.heading, cfg.width, cfg.length)
}

pub fn spawn_obstacle(world: &mut World, spec: &ObstacleSpec) -> Entity {
    world.spawn((
        Obstacle,
        Transform::new(spec.x, spec.z, 0.0),
        Collider::new(spec.width, spec.length),
    ))
}

/// First static obstacle overlapping `bounds`.
pub fn overlapping_obstacle(world: &World, bounds: &Aabb) -> Option<Entity> {
    world
        .query::<(&Obstacle, &Transform, &Collider)>()
        .iter()
        .find(|(_, (_, t, c))| c.bounds(t).overlaps(bounds))
        .map(|(entity, _)| entity)
}

/// First NPC car overlapping `bounds`.
pub fn overlapping_vehicle(world: &World, bounds: &Aabb) -> Option<Entity> {
    world
        .query::<(&NpcVehicle, &Transform, &Collider)>()
        .iter()
        .find(|(_, (_, t, c))| c.bounds(t).overlaps(bounds))
        .map(|(entity, _)| entity)
}

pub fn obstacle_count(world: &World) -> usize {
    world.query::<&Obstacle>().iter().count()
}

/// Slow the matatu after rubbing against NPC traffic.
///
/// Driver role only. The bump has its own short cooldown so speed can
/// recover between hits. Returns true when a bump was applied.
pub fn traffic_bump_system(
    world: &World,
    state: &mut GameState,
    vehicle_cfg: &VehicleConfig,
    cfg: &EnforcementConfig,
    events: &mut EventQueue,
) -> bool {
    if state.role != Role::Driver || state.is_modal_open {
        return false;
    }
    if let Some(t) = state.last_traffic_bump_at {
        if state.clock - t < cfg.traffic_cooldown_secs as f64 {
            return false;
        }
    }
    let bounds = player_bounds(vehicle_cfg, &state.vehicle);
    if overlapping_vehicle(world, &bounds).is_none() {
        return false;
    }

    let v = &mut state.vehicle;
    v.speed *= cfg.traffic_speed_factor;
    if v.speed.abs() < cfg.traffic_stop_speed {
        v.speed = 0.0;
    }
    state.last_traffic_bump_at = Some(state.clock);
    events.message("Traffic! Slow down.", 1500);
    log::debug!("NPC bump at z={:.1}, speed now {:.1}", v.z, v.speed);
    true
}
