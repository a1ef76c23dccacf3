//! Pure simulation logic for the matatu simulator.
//!
//! This crate contains the game rules that need no ECS world, no random
//! source and no renderer. Functions take plain data and return results,
//! which keeps them unit-testable and shareable between the engine and the
//! headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Every tunable constant, defaults, validation |
//! | [`dynamics`] | Bicycle-model integrator, steering, drag, body roll |
//! | [`fares`] | Cash floor clamp, fuel burn, fare arithmetic, stop classification |
//! | [`road`] | Looped road coordinates, wrap, crossing zone, curb clamp |
//! | [`signal`] | GREEN/YELLOW/RED light cycle |

pub mod config;
pub mod dynamics;
pub mod fares;
pub mod road;
pub mod signal;
