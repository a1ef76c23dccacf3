//! Conductor autopilot - drives the matatu while the player works the door.
//!
//! With a marker set it turns toward it at a capped rate, speeds up while
//! far away and brakes hard inside twice the arrival radius. Without one it
//! cruises at a fraction of top speed with an occasional small wobble.
//! While a stop action is pending the bus is held at rest.

use matatu_logic::config::{EconomyConfig, RoadConfig, VehicleConfig};
use matatu_logic::dynamics::{heading_to, normalize_angle, shortest_angle_diff};
use matatu_logic::road;
use rand::Rng;

use crate::state::GameState;

pub fn autopilot_system<R: Rng>(
    state: &mut GameState,
    vehicle_cfg: &VehicleConfig,
    eco: &EconomyConfig,
    road_cfg: &RoadConfig,
    dt: f32,
    rng: &mut R,
) {
    let dt = dt.clamp(0.0, eco.autopilot_max_dt);
    let max_speed = vehicle_cfg.max_speed;
    let accel = eco.autopilot_accel;

    if state.current_stop.is_some() {
        state.vehicle.speed = 0.0;
        return;
    }

    let v = &mut state.vehicle;
    let Some(target) = state.target_marker else {
        let cruise = max_speed * eco.autopilot_cruise;
        if v.speed < cruise {
            v.speed = (v.speed + accel * dt).min(cruise);
        }
        if rng.gen_bool(eco.autopilot_jitter_chance) {
            let wobble = (rng.gen::<f32>() - 0.5) * eco.autopilot_jitter;
            v.heading = normalize_angle(v.heading + wobble);
        }
        return;
    };

    let dx = target.x - v.x;
    let dz = road::shortest_delta_z(road_cfg, v.z, target.z);
    let diff = shortest_angle_diff(v.heading, heading_to(dx, dz));
    let max_turn = eco.autopilot_max_turn * dt;
    v.heading = normalize_angle(v.heading + diff.signum() * diff.abs().min(max_turn));

    let dist = (dx * dx + dz * dz).sqrt();
    let radius = eco.arrival_radius;
    if dist > radius * 2.0 {
        v.speed = (v.speed + accel * dt).min(max_speed);
    } else {
        v.speed = (v.speed - accel * 2.0 * dt).max(0.0);
    }
    if dist < radius {
        v.speed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Marker;
    use matatu_logic::config::GameConfig;
    use matatu_logic::fares::StopKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(state: &mut GameState, config: &GameConfig, frames: usize) {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..frames {
            autopilot_system(
                state,
                &config.vehicle,
                &config.economy,
                &config.road,
                0.05,
                &mut rng,
            );
        }
    }

    #[test]
    fn test_cruises_without_target() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        run(&mut state, &config, 400);
        assert!((state.vehicle.speed - 9.0).abs() < 1e-4);
        // Wobble stays tiny.
        assert!(state.vehicle.heading.abs() < 0.1);
    }

    #[test]
    fn test_turns_toward_target_at_capped_rate() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.target_marker = Some(Marker { x: 100.0, z: 0.0 });
        run(&mut state, &config, 1);
        // 0.6 rad/s * 0.05 s
        assert!((state.vehicle.heading - 0.03).abs() < 1e-5);
        assert!(state.vehicle.speed > 0.0);
    }

    #[test]
    fn test_target_behind_seam_is_ahead() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.vehicle.z = 560.0;
        state.target_marker = Some(Marker { x: 0.0, z: -560.0 });
        run(&mut state, &config, 1);
        // 80 m ahead across the seam: no turn needed.
        assert!(state.vehicle.heading.abs() < 1e-6);
    }

    #[test]
    fn test_stops_inside_arrival_radius() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.vehicle.speed = 8.0;
        state.vehicle.z = 95.0;
        state.target_marker = Some(Marker { x: 0.0, z: 100.0 });
        run(&mut state, &config, 1);
        assert_eq!(state.vehicle.speed, 0.0);
    }

    #[test]
    fn test_brakes_on_approach() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.vehicle.speed = 8.0;
        state.vehicle.z = 85.0;
        state.target_marker = Some(Marker { x: 0.0, z: 100.0 });
        run(&mut state, &config, 1);
        assert!((state.vehicle.speed - (8.0 - 0.18)).abs() < 1e-5);
    }

    #[test]
    fn test_holds_at_pending_stop() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.vehicle.speed = 3.0;
        state.current_stop = Some(StopKind::PickUp);
        run(&mut state, &config, 1);
        assert_eq!(state.vehicle.speed, 0.0);
    }
}
