//! Rejected player actions.
//!
//! Nothing here is fatal: the engine refuses the action, shows a message and
//! carries on. Callers that don't care can ignore the `Result`.

use matatu_logic::fares::StopKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// A police encounter is waiting for a decision.
    ModalOpen,
    /// No encounter to resolve.
    NoEncounter,
    /// The update loop halted after a frame failure.
    Halted,
    /// Conductor actions need the route running.
    NotOnRoute,
    /// Only the conductor works the door.
    WrongRole,
    /// The bus is not at a stop of this kind.
    NotAtStop(StopKind),
    TankFull,
    TankEmpty,
    /// Refuelling needs a fuel station nearby.
    NoFuelStation,
    InsufficientFunds { needed: i64, available: i64 },
    RouteAlreadyRunning,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::ModalOpen => write!(f, "a police encounter is in progress"),
            ActionError::NoEncounter => write!(f, "no police encounter to resolve"),
            ActionError::Halted => write!(f, "the simulation has halted"),
            ActionError::NotOnRoute => write!(f, "the route is not running"),
            ActionError::WrongRole => write!(f, "only the conductor can do that"),
            ActionError::NotAtStop(kind) => write!(f, "not at a {} stop", kind.label()),
            ActionError::TankFull => write!(f, "fuel is already full"),
            ActionError::TankEmpty => write!(f, "fuel is empty"),
            ActionError::NoFuelStation => write!(f, "no fuel station nearby"),
            ActionError::InsufficientFunds { needed, available } => {
                write!(f, "insufficient funds: need KSh {}, have KSh {}", needed, available)
            }
            ActionError::RouteAlreadyRunning => write!(f, "route is already running"),
        }
    }
}

impl std::error::Error for ActionError {}
