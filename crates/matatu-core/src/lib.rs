//! Matatu Core - minibus simulator engine
//!
//! Drives one Nairobi matatu around a looped road: bicycle-model dynamics,
//! NPC traffic that stops for red, a driver/conductor economy and the
//! traffic police who would like a word.
//!
//! # Architecture
//!
//! - **State**: one [`state::GameState`] record, owned by the engine and
//!   mutated only inside engine calls
//! - **World**: a `hecs` ECS world holding what the bus can hit (NPC cars,
//!   static obstacles)
//! - **Systems**: plain functions over the state and the world
//! - **Presentation**: systems emit [`presentation::GameEvent`]s; the host
//!   drains them or hands a [`presentation::Presentation`] to
//!   [`engine::SimulationEngine::run_frame`]
//!
//! All randomness comes from one seedable `StdRng`, so a seed replays a
//! session exactly.
//!
//! # Example
//!
//! ```rust
//! use matatu_core::prelude::*;
//!
//! let mut engine = SimulationEngine::with_seed(GameConfig::default(), 42);
//! let throttle = ControlInput { accelerate: true, ..Default::default() };
//!
//! for _ in 0..120 {
//!     engine.update(&throttle, 1.0 / 60.0);
//! }
//! assert!(engine.state().on_route);
//! assert!(engine.state().vehicle.z > 0.0);
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod presentation;
pub mod state;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::SimulationEngine;
    pub use crate::error::ActionError;
    pub use crate::presentation::{GameEvent, Presentation, Snapshot};
    pub use crate::state::{GameState, Role};
    pub use crate::systems::{Decision, Outcome};
    pub use matatu_logic::config::GameConfig;
    pub use matatu_logic::dynamics::ControlInput;
    pub use matatu_logic::fares::StopKind;
    pub use matatu_logic::signal::SignalState;
}
