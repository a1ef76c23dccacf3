//! Systems - logic that runs over the game state and the ECS world

mod autopilot;
pub mod collision;
mod economy;
mod enforcement;
mod traffic;

pub use autopilot::*;
pub use collision::*;
pub use economy::*;
pub use enforcement::*;
pub use traffic::*;
