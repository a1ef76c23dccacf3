//! The shared game-state record.
//!
//! Exactly one [`GameState`] exists per engine. Systems receive it by
//! `&mut` from the engine for the duration of a call and never keep a copy;
//! the presentation layer only ever sees a [`crate::presentation::Snapshot`].

use matatu_logic::config::{BusStopSpec, GameConfig, RoadConfig};
use matatu_logic::dynamics::VehicleState;
use matatu_logic::fares::{self, StopKind};
use matatu_logic::road;
use matatu_logic::signal::SignalState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// Steers and works the pedals directly.
    #[default]
    Driver,
    /// Works the door; the autopilot drives.
    Conductor,
}

impl Role {
    pub fn toggled(self) -> Self {
        match self {
            Role::Driver => Role::Conductor,
            Role::Conductor => Role::Driver,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Driver => "Driver",
            Role::Conductor => "Conductor",
        }
    }
}

/// A fixed stop on the loop. Immutable during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub id: String,
    pub name: String,
    pub base_fare: i64,
    pub x: f32,
    pub z: f32,
}

impl BusStop {
    pub fn from_spec(spec: &BusStopSpec, road_cfg: &RoadConfig) -> Self {
        let (x, z) = road::stop_position(road_cfg, spec.z);
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            base_fare: spec.base_fare,
            x,
            z,
        }
    }

    pub fn marker(&self) -> Marker {
        Marker {
            x: self.x,
            z: self.z,
        }
    }
}

/// World point the autopilot steers toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub x: f32,
    pub z: f32,
}

/// Pure state toggles the presentation layer interprets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessories {
    pub handbrake: bool,
    pub indicator_left: bool,
    pub indicator_right: bool,
    pub headlights: bool,
    pub horn: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub role: Role,
    /// Shillings. Never below the configured floor.
    pub cash: i64,
    /// Percent, `[0, 100]`.
    pub fuel: f32,
    /// Player kinematics: position, heading, speed, steering, body motion.
    pub vehicle: VehicleState,
    /// Derived each frame: `|speed| > epsilon`.
    pub is_driving: bool,
    /// The route (and with it the economic tick) is running.
    pub on_route: bool,
    /// Global mutual exclusion over police encounters and role switching.
    pub is_modal_open: bool,
    pub passengers: u32,
    pub max_passengers: u32,
    pub current_destination: Option<BusStop>,
    pub current_stop: Option<StopKind>,
    pub target_marker: Option<Marker>,
    pub traffic_light: SignalState,
    /// Seconds continuously spent over the speed limit.
    pub speeding_secs: f32,
    /// Gameplay clock in seconds. Frozen while a modal is open.
    pub clock: f64,
    pub last_encounter_at: Option<f64>,
    pub last_traffic_bump_at: Option<f64>,
    /// Economic ticks since the route economy started; drives maintenance.
    pub economic_ticks: u32,
    pub goal_reached: bool,
    /// Index of the fuel station the bus is currently parked by.
    pub at_fuel_station: Option<usize>,
    pub accessories: Accessories,
    pub day: u32,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let vehicle = VehicleState {
            y: config.vehicle.ground_offset,
            ..Default::default()
        };
        Self {
            role: Role::Driver,
            cash: config.economy.starting_cash,
            fuel: 100.0,
            vehicle,
            is_driving: false,
            on_route: false,
            is_modal_open: false,
            passengers: 0,
            max_passengers: config.economy.max_passengers,
            current_destination: None,
            current_stop: None,
            target_marker: None,
            traffic_light: SignalState::Green,
            speeding_secs: 0.0,
            clock: 0.0,
            last_encounter_at: None,
            last_traffic_bump_at: None,
            economic_ticks: 0,
            goal_reached: false,
            at_fuel_station: None,
            accessories: Accessories::default(),
            day: 1,
        }
    }

    /// Fresh state for the next day. Only the day counter carries over.
    pub fn next_day(&self, config: &GameConfig) -> Self {
        Self {
            day: self.day + 1,
            ..Self::new(config)
        }
    }

    /// Add (or with a negative amount, remove) cash, clamped at `floor`.
    pub fn adjust_cash(&mut self, delta: i64, floor: i64) {
        self.cash = fares::apply_cash_delta(self.cash, delta, floor);
    }

    /// Board up to `count` passengers; returns how many actually got on.
    pub fn board(&mut self, count: u32) -> u32 {
        let boarded = count.min(fares::boarding_capacity(self.passengers, self.max_passengers));
        self.passengers += boarded;
        boarded
    }

    pub fn set_fuel(&mut self, fuel: f32) {
        self.fuel = fuel.clamp(0.0, 100.0);
    }

    pub fn speed(&self) -> f32 {
        self.vehicle.speed
    }

    /// Has the shared police cooldown run out?
    pub fn encounter_cooldown_elapsed(&self, cooldown_secs: f32) -> bool {
        match self.last_encounter_at {
            None => true,
            Some(t) => self.clock - t >= cooldown_secs as f64,
        }
    }

    /// Range invariants that must hold between any two operations.
    pub fn invariant_violations(&self, cash_floor: i64) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !(0.0..=100.0).contains(&self.fuel) {
            problems.push("fuel outside [0, 100]");
        }
        if self.passengers > self.max_passengers {
            problems.push("passengers above capacity");
        }
        if self.cash < cash_floor {
            problems.push("cash below floor");
        }
        if self.current_stop.is_some() && self.target_marker.is_some() {
            problems.push("stop pending while a marker is set");
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        assert_eq!(state.role, Role::Driver);
        assert_eq!(state.cash, 1000);
        assert_eq!(state.fuel, 100.0);
        assert_eq!(state.max_passengers, 14);
        assert_eq!(state.vehicle.y, config.vehicle.ground_offset);
        assert!(state.invariant_violations(config.economy.cash_floor).is_empty());
    }

    #[test]
    fn test_board_respects_capacity() {
        let mut state = GameState::new(&GameConfig::default());
        state.passengers = 12;
        assert_eq!(state.board(5), 2);
        assert_eq!(state.passengers, 14);
        assert_eq!(state.board(3), 0);
    }

    #[test]
    fn test_adjust_cash_floor() {
        let mut state = GameState::new(&GameConfig::default());
        state.adjust_cash(-10_000, -2000);
        assert_eq!(state.cash, -2000);
        state.adjust_cash(500, -2000);
        assert_eq!(state.cash, -1500);
    }

    #[test]
    fn test_next_day_resets_but_counts() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.cash = 42;
        state.passengers = 9;
        state.role = Role::Conductor;
        let next = state.next_day(&config);
        assert_eq!(next.day, 2);
        assert_eq!(next.cash, 1000);
        assert_eq!(next.passengers, 0);
        assert_eq!(next.role, Role::Driver);
    }

    #[test]
    fn test_cooldown() {
        let mut state = GameState::new(&GameConfig::default());
        assert!(state.encounter_cooldown_elapsed(50.0));
        state.last_encounter_at = Some(10.0);
        state.clock = 40.0;
        assert!(!state.encounter_cooldown_elapsed(50.0));
        state.clock = 60.0;
        assert!(state.encounter_cooldown_elapsed(50.0));
    }

    #[test]
    fn test_role_toggle() {
        assert_eq!(Role::Driver.toggled(), Role::Conductor);
        assert_eq!(Role::Conductor.toggled(), Role::Driver);
    }
}
