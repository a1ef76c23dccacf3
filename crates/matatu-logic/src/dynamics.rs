//! Vehicle dynamics - arcade bicycle model for the matatu.
//!
//! One call to [`step`] integrates a single frame:
//! 1. Steering wheel angle ramps toward ±max while a key is held, otherwise
//!    returns to center geometrically.
//! 2. Longitudinal speed: handbrake > brake/reverse > throttle > coasting
//!    (quadratic drag + rolling resistance, snapped to rest below epsilon).
//! 3. Yaw rate `ω = v / L · tan(δ)`.
//! 4. Position advances along the heading; ride height is fixed.
//! 5. Body roll/pitch follow first-order filters (cosmetic only).
//!
//! Heading convention: forward is `(sin h, cos h)` in `(x, z)`, and a
//! positive steering angle increases `h`.
//!
//! ```
//! use matatu_logic::config::VehicleConfig;
//! use matatu_logic::dynamics::{step, ControlInput, ControlMode, VehicleState};
//!
//! let cfg = VehicleConfig::default();
//! let mut bus = VehicleState::default();
//! let throttle = ControlInput { accelerate: true, ..Default::default() };
//! for _ in 0..60 {
//!     step(&cfg, &mut bus, &throttle, ControlMode::Manual, 100.0, 1.0 / 60.0);
//! }
//! assert!(bus.speed > 2.0 && bus.z > 0.0);
//! ```

use crate::config::VehicleConfig;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Discrete pedal/steering signals for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    pub handbrake: bool,
}

/// Who is in control of the pedals this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Driver role: inputs drive steering and speed.
    Manual,
    /// Conductor role: inputs are ignored; speed is set externally by the
    /// autopilot and only integrated here.
    External,
}

/// Kinematic state of the player's vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians, normalized to (-π, π].
    pub heading: f32,
    /// Forward velocity in m/s (negative = reverse).
    pub speed: f32,
    /// Front wheel angle in radians.
    pub steering: f32,
    pub body_roll: f32,
    pub body_pitch: f32,
}

/// What the frame meant for the rest of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOutcome {
    pub is_driving: bool,
    /// Tank is empty: the route must stop.
    pub fuel_exhausted: bool,
}

/// Integrate one frame. `dt` is clamped to `cfg.max_dt`.
pub fn step(
    cfg: &VehicleConfig,
    state: &mut VehicleState,
    input: &ControlInput,
    mode: ControlMode,
    fuel: f32,
    dt: f32,
) -> DriveOutcome {
    let dt = dt.clamp(0.0, cfg.max_dt);

    if fuel <= 0.0 {
        state.speed = 0.0;
        state.steering = 0.0;
        settle(cfg, state, dt);
        return DriveOutcome {
            is_driving: false,
            fuel_exhausted: true,
        };
    }

    let manual = mode == ControlMode::Manual;

    // 1. Steering
    if manual && input.steer_left {
        state.steering = (state.steering - cfg.steer_rate * dt).max(-cfg.max_steer_angle);
    } else if manual && input.steer_right {
        state.steering = (state.steering + cfg.steer_rate * dt).min(cfg.max_steer_angle);
    } else {
        state.steering *= cfg.steer_return;
    }

    // 2. Longitudinal
    if manual {
        state.speed = longitudinal(cfg, state.speed, input, dt);
    }
    state.speed = state.speed.clamp(-cfg.reverse_max, cfg.max_speed);

    // 3-4. Yaw and translation
    let moving = state.speed.abs() > cfg.min_speed;
    if moving {
        let omega = (state.speed / cfg.wheelbase) * state.steering.tan();
        state.heading = normalize_angle(state.heading + omega * dt);
        let (fx, fz) = forward(state.heading);
        state.x += fx * state.speed * dt;
        state.z += fz * state.speed * dt;
    }
    state.y = cfg.ground_offset;

    // 5. Cosmetic body motion
    let roll_target = state.steering * (state.speed.abs() / cfg.max_speed) * cfg.roll_gain;
    let pitch_target = if !manual {
        0.0
    } else if input.brake || input.handbrake {
        cfg.pitch_brake
    } else if input.accelerate {
        cfg.pitch_accel
    } else {
        0.0
    };
    let k = (cfg.body_smoothing * dt).min(1.0);
    state.body_roll += (roll_target - state.body_roll) * k;
    state.body_pitch += (pitch_target - state.body_pitch) * k;

    DriveOutcome {
        is_driving: moving,
        fuel_exhausted: false,
    }
}

fn longitudinal(cfg: &VehicleConfig, speed: f32, input: &ControlInput, dt: f32) -> f32 {
    if input.handbrake {
        return if speed > 0.0 {
            (speed - cfg.handbrake_decel * dt).max(0.0)
        } else {
            (speed + cfg.handbrake_decel * dt).min(0.0)
        };
    }

    if input.brake {
        if speed > 0.0 {
            (speed - cfg.brake_decel * dt).max(0.0)
        } else if speed < 0.0 && speed > -cfg.reverse_max {
            // Already rolling backwards: keep reversing up to the cap.
            (speed - cfg.acceleration * 0.5 * dt).max(-cfg.reverse_max)
        } else if speed < 0.0 {
            speed
        } else {
            (-cfg.acceleration * 0.5 * dt).max(-cfg.reverse_max)
        }
    } else if input.accelerate {
        if speed >= 0.0 {
            let fraction = (speed / cfg.max_speed).min(1.0);
            let effective = cfg.acceleration * (1.0 - 0.65 * fraction);
            (speed + effective * dt).min(cfg.max_speed)
        } else {
            (speed + cfg.brake_decel * dt).min(0.0)
        }
    } else {
        coast(cfg, speed, dt)
    }
}

fn coast(cfg: &VehicleConfig, speed: f32, dt: f32) -> f32 {
    let decel = cfg.drag_coeff * speed * speed + cfg.rolling_resistance;
    let next = speed - speed.signum() * decel * dt;
    if next.abs() < cfg.min_speed || next.signum() != speed.signum() {
        0.0
    } else {
        next
    }
}

/// Relax roll/pitch toward level. Used while paused or out of fuel.
pub fn settle(cfg: &VehicleConfig, state: &mut VehicleState, dt: f32) {
    let k = (cfg.body_smoothing * dt.max(0.0)).min(1.0);
    state.body_roll -= state.body_roll * k;
    state.body_pitch -= state.body_pitch * k;
}

/// Unit forward vector for a heading, as `(x, z)`.
pub fn forward(heading: f32) -> (f32, f32) {
    (heading.sin(), heading.cos())
}

/// Heading that faces along `(dx, dz)`.
pub fn heading_to(dx: f32, dz: f32) -> f32 {
    dx.atan2(dz)
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed smallest rotation from `from` to `to`.
pub fn shortest_angle_diff(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

pub fn speed_kmh(speed: f32) -> f32 {
    speed * 3.6
}
