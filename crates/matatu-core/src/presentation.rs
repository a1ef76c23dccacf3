//! Presentation boundary - everything the renderer/UI may see or be told.
//!
//! The engine never calls into the UI directly while simulating. Systems
//! push [`GameEvent`]s into an [`EventQueue`]; the host drains them (or lets
//! [`crate::engine::SimulationEngine::run_frame`] dispatch them to a
//! [`Presentation`] implementation).

use std::collections::VecDeque;

use matatu_logic::fares::StopKind;
use matatu_logic::signal::SignalState;
use serde::{Deserialize, Serialize};

use crate::state::{Accessories, GameState, Marker, Role};
use crate::systems::{Decision, NpcView, ViolationKind};

/// One-way notification from the simulation to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Message { text: String, duration_ms: u32 },
    /// A police encounter is waiting for a pay/deny decision.
    ViolationPrompt(ViolationPrompt),
    /// Which conductor button should be enabled (`None` = neither).
    ConductorAction(Option<StopKind>),
    SignalChanged(SignalState),
    GoalReached { cash: i64 },
    RouteStarted,
    RouteStopped,
    /// The update loop stopped for good after a frame failure.
    Halted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationPrompt {
    pub kind: ViolationKind,
    pub fine: i64,
    pub reason: String,
}

/// FIFO outbox of events produced since the last drain.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn message(&mut self, text: impl Into<String>, duration_ms: u32) {
        self.push(GameEvent::Message {
            text: text.into(),
            duration_ms,
        });
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }
}

/// Read-only view of the simulation for one rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub role: Role,
    pub cash: i64,
    pub fuel: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub heading: f32,
    pub speed: f32,
    pub steering: f32,
    pub body_roll: f32,
    pub body_pitch: f32,
    pub is_driving: bool,
    pub on_route: bool,
    pub is_modal_open: bool,
    pub passengers: u32,
    pub max_passengers: u32,
    pub destination: Option<String>,
    pub current_stop: Option<StopKind>,
    pub target_marker: Option<Marker>,
    pub traffic_light: SignalState,
    pub goal_reached: bool,
    pub accessories: Accessories,
    pub day: u32,
    /// Out of fuel with no cash to refuel; only a new day helps.
    pub stranded: bool,
    pub npcs: Vec<NpcView>,
}

impl Snapshot {
    pub fn capture(state: &GameState, npcs: Vec<NpcView>, refuel_cost: i64) -> Self {
        let v = &state.vehicle;
        Self {
            role: state.role,
            cash: state.cash,
            fuel: state.fuel,
            x: v.x,
            y: v.y,
            z: v.z,
            heading: v.heading,
            speed: v.speed,
            steering: v.steering,
            body_roll: v.body_roll,
            body_pitch: v.body_pitch,
            is_driving: state.is_driving,
            on_route: state.on_route,
            is_modal_open: state.is_modal_open,
            passengers: state.passengers,
            max_passengers: state.max_passengers,
            destination: state.current_destination.as_ref().map(|d| d.name.clone()),
            current_stop: state.current_stop,
            target_marker: state.target_marker,
            traffic_light: state.traffic_light,
            goal_reached: state.goal_reached,
            accessories: state.accessories,
            day: state.day,
            stranded: state.fuel <= 0.0 && state.cash < refuel_cost,
            npcs,
        }
    }
}

/// Failure reported by a presentation collaborator.
#[derive(Debug)]
pub enum PresentationError {
    Io(std::io::Error),
    Render(String),
}

impl From<std::io::Error> for PresentationError {
    fn from(e: std::io::Error) -> Self {
        PresentationError::Io(e)
    }
}

impl std::fmt::Display for PresentationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentationError::Io(e) => write!(f, "IO error: {}", e),
            PresentationError::Render(msg) => write!(f, "Render failed: {}", msg),
        }
    }
}

impl std::error::Error for PresentationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PresentationError::Io(e) => Some(e),
            PresentationError::Render(_) => None,
        }
    }
}

/// The UI/renderer collaborator.
///
/// `poll_violation_decision` is the synchronous resolver for the one
/// blocking interaction: it returns `None` until the player has chosen.
pub trait Presentation {
    fn show_message(&mut self, text: &str, duration_ms: u32);
    fn show_violation_prompt(&mut self, prompt: &ViolationPrompt);
    fn poll_violation_decision(&mut self) -> Option<Decision>;
    fn set_conductor_action_available(&mut self, kind: Option<StopKind>);
    fn render_signal(&mut self, state: SignalState);
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), PresentationError>;

    /// Route/goal/halt notifications. Ignored unless overridden.
    fn notify(&mut self, _event: &GameEvent) {}
}

/// Route one event to the matching presentation command.
pub fn dispatch<P: Presentation + ?Sized>(presentation: &mut P, event: &GameEvent) {
    match event {
        GameEvent::Message { text, duration_ms } => presentation.show_message(text, *duration_ms),
        GameEvent::ViolationPrompt(prompt) => presentation.show_violation_prompt(prompt),
        GameEvent::ConductorAction(kind) => presentation.set_conductor_action_available(*kind),
        GameEvent::SignalChanged(state) => presentation.render_signal(*state),
        other => presentation.notify(other),
    }
}

/// Headless presentation that records everything and answers prompts from
/// a script. Used by the harness and tests.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub messages: Vec<String>,
    pub prompts: Vec<ViolationPrompt>,
    pub conductor_action: Option<StopKind>,
    pub signal: SignalState,
    pub notifications: Vec<GameEvent>,
    pub frames_rendered: u64,
    pub last_snapshot: Option<Snapshot>,
    /// Answers handed out, in order, once a prompt has been shown.
    pub scripted_decisions: VecDeque<Decision>,
    /// Make the next `render` call fail.
    pub fail_next_render: bool,
    awaiting_decision: bool,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decisions(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            scripted_decisions: decisions.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Presentation for RecordingPresentation {
    fn show_message(&mut self, text: &str, _duration_ms: u32) {
        self.messages.push(text.to_string());
    }

    fn show_violation_prompt(&mut self, prompt: &ViolationPrompt) {
        self.prompts.push(prompt.clone());
        self.awaiting_decision = true;
    }

    fn poll_violation_decision(&mut self) -> Option<Decision> {
        if !self.awaiting_decision {
            return None;
        }
        let decision = self.scripted_decisions.pop_front();
        if decision.is_some() {
            self.awaiting_decision = false;
        }
        decision
    }

    fn set_conductor_action_available(&mut self, kind: Option<StopKind>) {
        self.conductor_action = kind;
    }

    fn render_signal(&mut self, state: SignalState) {
        self.signal = state;
    }

    fn render(&mut self, snapshot: &Snapshot) -> Result<(), PresentationError> {
        if self.fail_next_render {
            self.fail_next_render = false;
            return Err(PresentationError::Render("scene graph unavailable".to_string()));
        }
        self.frames_rendered += 1;
        self.last_snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn notify(&mut self, event: &GameEvent) {
        self.notifications.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo() {
        let mut q = EventQueue::new();
        q.message("first", 1000);
        q.push(GameEvent::RouteStarted);
        assert_eq!(q.len(), 2);
        let events = q.drain();
        assert!(matches!(&events[0], GameEvent::Message { text, .. } if text == "first"));
        assert_eq!(events[1], GameEvent::RouteStarted);
        assert!(q.is_empty());
    }

    #[test]
    fn test_dispatch_routes_commands() {
        let mut ui = RecordingPresentation::new();
        dispatch(&mut ui, &GameEvent::SignalChanged(SignalState::Red));
        dispatch(&mut ui, &GameEvent::ConductorAction(Some(StopKind::PickUp)));
        dispatch(&mut ui, &GameEvent::GoalReached { cash: 10_050 });
        assert_eq!(ui.signal, SignalState::Red);
        assert_eq!(ui.conductor_action, Some(StopKind::PickUp));
        assert_eq!(ui.notifications, vec![GameEvent::GoalReached { cash: 10_050 }]);
    }

    #[test]
    fn test_decision_only_after_prompt() {
        let mut ui = RecordingPresentation::with_decisions([Decision::Pay]);
        assert_eq!(ui.poll_violation_decision(), None);
        ui.show_violation_prompt(&ViolationPrompt {
            kind: ViolationKind::RedLight,
            fine: 250,
            reason: "red light".into(),
        });
        assert_eq!(ui.poll_violation_decision(), Some(Decision::Pay));
        assert_eq!(ui.poll_violation_decision(), None);
    }

    #[test]
    fn test_error_display() {
        let e = PresentationError::Render("gpu lost".into());
        assert_eq!(e.to_string(), "Render failed: gpu lost");
    }
}
