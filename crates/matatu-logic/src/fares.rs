//! Pure fare, fuel and cash arithmetic.
//!
//! Every cash mutation in the engine goes through [`apply_cash_delta`], so
//! the floor invariant holds at the point of mutation.

use serde::{Deserialize, Serialize};

/// What the conductor can do at the stop the bus is standing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopKind {
    PickUp,
    DropOff,
}

impl StopKind {
    pub fn label(self) -> &'static str {
        match self {
            StopKind::PickUp => "pick_up",
            StopKind::DropOff => "drop_off",
        }
    }
}

/// Apply a signed cash change, never going below `floor`.
///
/// If the balance already sits below the floor (e.g. a config change),
/// debits leave it where it is rather than pulling it up.
pub fn apply_cash_delta(cash: i64, delta: i64, floor: i64) -> i64 {
    let next = cash.saturating_add(delta);
    if delta < 0 {
        next.max(floor.min(cash))
    } else {
        next
    }
}

/// Fuel burned by one economic tick: the base rate, scaled up linearly with
/// the fraction of top speed.
pub fn fuel_burn(speed: f32, max_speed: f32, base_rate: f32) -> f32 {
    let fraction = if max_speed > 0.0 {
        (speed.abs() / max_speed).min(1.0)
    } else {
        0.0
    };
    base_rate * (1.0 + fraction)
}

/// Remove fuel, clamped to `[0, 100]`.
pub fn burn_fuel(fuel: f32, amount: f32) -> f32 {
    (fuel - amount).clamp(0.0, 100.0)
}

/// Lump sum paid when everyone aboard alights at a destination.
pub fn drop_off_fare(passengers: u32, base_fare: i64) -> i64 {
    passengers as i64 * base_fare
}

pub fn pick_up_fare(boarded: u32, per_head: i64) -> i64 {
    boarded as i64 * per_head
}

/// Seats left on the bus.
pub fn boarding_capacity(passengers: u32, max_passengers: u32) -> u32 {
    max_passengers.saturating_sub(passengers)
}

/// Arriving with paying passengers at a fare stop is a drop-off;
/// anything else is a pick-up.
pub fn classify_arrival(passengers: u32, base_fare: i64) -> StopKind {
    if passengers > 0 && base_fare > 0 {
        StopKind::DropOff
    } else {
        StopKind::PickUp
    }
}
