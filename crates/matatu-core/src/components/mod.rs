//! Component definitions for the ECS world.
//!
//! The world holds what the player can bump into: NPC traffic and static
//! roadside obstacles. Components are pure data; behaviour lives in systems.

mod common;
mod traffic;

pub use common::*;
pub use traffic::*;
