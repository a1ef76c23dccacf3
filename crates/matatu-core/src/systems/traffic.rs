//! Traffic system - spawns NPC cars at the loop ends and drives them along
//! the road, braking for a red light ahead of them.
//!
//! Cars are never despawned. Running past a road end by more than the wrap
//! margin puts them back at the other end, so the pool only grows until it
//! reaches `max_vehicles`.

use std::f32::consts::PI;

use hecs::{Entity, World};
use matatu_logic::config::{RoadConfig, TrafficConfig};
use matatu_logic::road;
use matatu_logic::signal::SignalState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Collider, NpcVehicle, Transform};

/// What the renderer needs to draw one NPC car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcView {
    pub x: f32,
    pub z: f32,
    pub heading: f32,
    pub speed: f32,
    pub direction: f32,
}

/// Spawn scheduling for NPC traffic.
#[derive(Debug, Clone)]
pub struct TrafficController {
    /// Seconds since the last spawn.
    since_spawn: f32,
    interval: f32,
}

impl TrafficController {
    /// The first update spawns straight away.
    pub fn new(cfg: &TrafficConfig) -> Self {
        let interval = cfg.spawn_interval_ms as f32 / 1000.0;
        Self {
            since_spawn: interval,
            interval,
        }
    }

    pub fn reset(&mut self) {
        self.since_spawn = self.interval;
    }

    /// Spawn if due, then advance every car. Returns the entity spawned this
    /// frame, if any.
    pub fn update<R: Rng>(
        &mut self,
        world: &mut World,
        cfg: &TrafficConfig,
        road_cfg: &RoadConfig,
        signal: SignalState,
        dt: f32,
        rng: &mut R,
    ) -> Option<Entity> {
        self.since_spawn += dt.max(0.0);
        let mut spawned = None;
        if self.since_spawn >= self.interval {
            self.since_spawn = 0.0;
            if vehicle_count(world) < cfg.max_vehicles {
                spawned = Some(spawn_vehicle(world, cfg, road_cfg, rng));
            }
        }
        traffic_system(world, cfg, road_cfg, signal, dt);
        spawned
    }
}

/// Add one car at a random end of the loop, facing into the road.
pub fn spawn_vehicle<R: Rng>(
    world: &mut World,
    cfg: &TrafficConfig,
    road_cfg: &RoadConfig,
    rng: &mut R,
) -> Entity {
    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let z = if direction > 0.0 {
        -road_cfg.half_length() - cfg.spawn_margin
    } else {
        road_cfg.half_length() + cfg.spawn_margin
    };
    let lane = if rng.gen_bool(0.5) { cfg.lane_offset } else { -cfg.lane_offset };
    let heading = if direction > 0.0 { 0.0 } else { PI };
    let jitter = if cfg.speed_jitter > 0.0 {
        rng.gen_range(-cfg.speed_jitter..=cfg.speed_jitter)
    } else {
        0.0
    };
    let target_speed = cfg.nominal_speed * (1.0 + jitter);

    log::debug!(
        "Spawned NPC at z={:.0} lane={:+.1} dir={:+} target={:.1} m/s",
        z,
        lane,
        direction,
        target_speed
    );

    world.spawn((
        Transform::new(lane, z, heading),
        NpcVehicle {
            speed: 0.0,
            target_speed,
            direction,
            lane,
        },
        Collider::new(cfg.car_width, cfg.car_length),
    ))
}

/// Advance every NPC car by `dt`.
pub fn traffic_system(
    world: &mut World,
    cfg: &TrafficConfig,
    road_cfg: &RoadConfig,
    signal: SignalState,
    dt: f32,
) {
    let red = signal == SignalState::Red;
    let relax = (dt * 2.0).min(1.0);
    let limit = road_cfg.half_length() + cfg.wrap_margin;

    for (_, (transform, npc)) in world.query_mut::<(&mut Transform, &mut NpcVehicle)>() {
        let ahead = road::distance_to_intersection(road_cfg, transform.z, npc.direction);
        if red && ahead > 0.0 && ahead < cfg.brake_distance + cfg.brake_lookahead {
            npc.speed = braking_speed(cfg, npc.target_speed, ahead);
        } else {
            npc.speed += (npc.target_speed - npc.speed) * relax;
        }

        transform.z += npc.speed * dt * npc.direction;

        if transform.z > limit {
            transform.z -= road_cfg.length;
        } else if transform.z < -limit {
            transform.z += road_cfg.length;
        }
    }
}

/// Linear ramp toward the stop line, never below the floor fraction.
fn braking_speed(cfg: &TrafficConfig, target_speed: f32, distance: f32) -> f32 {
    let ramp = (distance / cfg.brake_distance).min(1.0).max(cfg.brake_floor);
    target_speed * ramp
}

/// Live NPC cars for rendering and collision queries.
pub fn npc_vehicles(world: &World) -> Vec<NpcView> {
    world
        .query::<(&Transform, &NpcVehicle)>()
        .iter()
        .map(|(_, (t, npc))| NpcView {
            x: t.x,
            z: t.z,
            heading: t.heading,
            speed: npc.speed,
            direction: npc.direction,
        })
        .collect()
}

pub fn vehicle_count(world: &World) -> usize {
    world.query::<&NpcVehicle>().iter().count()
}

/// Remove every NPC car, keeping static obstacles.
pub fn clear_traffic(world: &mut World) {
    let cars: Vec<Entity> = world
        .query::<&NpcVehicle>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for entity in cars {
        let _ = world.despawn(entity);
    }
}
