//! Enforcement system - traffic police, bribes and roadside obstacles.
//!
//! Encounter lifecycle:
//! `idle -> (violation seen, cooldown over, chance hits) -> Pending (modal
//! open) -> Resolved(outcome) -> idle`, with the shared cooldown restarting
//! on resolution. A matatu too broke to be worth shaking down is waved
//! through without a modal, and the cooldown still restarts.
//!
//! Obstacle hits are not encounters: they cost a fixed penalty every frame
//! the footprints overlap.

use hecs::World;
use matatu_logic::config::{EnforcementConfig, RoadConfig, VehicleConfig};
use matatu_logic::dynamics::speed_kmh;
use matatu_logic::road;
use matatu_logic::signal::SignalState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::presentation::{EventQueue, GameEvent, ViolationPrompt};
use crate::state::{GameState, Role};
use crate::systems::collision::{overlapping_obstacle, player_bounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    RedLight,
    Speeding,
}

impl ViolationKind {
    pub fn base_fine(self, cfg: &EnforcementConfig) -> i64 {
        match self {
            ViolationKind::RedLight => cfg.red_light_fine,
            ViolationKind::Speeding => cfg.speeding_fine,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            ViolationKind::RedLight => "Running a red light at the intersection.",
            ViolationKind::Speeding => "Overspeeding on a city road.",
        }
    }
}

/// The player's answer to a shakedown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Pay,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Paid { fine: i64 },
    Escaped,
    Detained { penalty: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterState {
    Pending,
    Resolved(Outcome),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub kind: ViolationKind,
    pub fine: i64,
    pub reason: String,
    pub state: EncounterState,
}

impl Encounter {
    pub fn new(kind: ViolationKind, fine: i64) -> Self {
        Self {
            kind,
            fine,
            reason: kind.reason().to_string(),
            state: EncounterState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == EncounterState::Pending
    }

    pub fn prompt(&self) -> ViolationPrompt {
        ViolationPrompt {
            kind: self.kind,
            fine: self.fine,
            reason: self.reason.clone(),
        }
    }
}

/// Update the speeding clock and report a violation that is eligible for an
/// encounter this frame. Driver role only; the conductor's autopilot is
/// never pulled over.
pub fn detect_violation(
    state: &mut GameState,
    road_cfg: &RoadConfig,
    cfg: &EnforcementConfig,
    dt: f32,
) -> Option<ViolationKind> {
    if state.role != Role::Driver || state.is_modal_open {
        state.speeding_secs = 0.0;
        return None;
    }

    let speed = state.vehicle.speed.abs();
    if speed_kmh(speed) > cfg.speed_limit_kmh {
        state.speeding_secs += dt.max(0.0);
    } else {
        state.speeding_secs = 0.0;
    }

    if !state.encounter_cooldown_elapsed(cfg.cooldown_secs) {
        return None;
    }

    let ran_red = state.traffic_light == SignalState::Red
        && road::is_in_intersection(road_cfg, state.vehicle.x, state.vehicle.z)
        && speed > cfg.red_light_min_speed;
    if ran_red {
        Some(ViolationKind::RedLight)
    } else if state.speeding_secs > cfg.speeding_grace_secs {
        Some(ViolationKind::Speeding)
    } else {
        None
    }
}

/// Detect, roll and open an encounter. Returns the new pending encounter.
pub fn violation_system<R: Rng>(
    state: &mut GameState,
    road_cfg: &RoadConfig,
    cfg: &EnforcementConfig,
    dt: f32,
    rng: &mut R,
    events: &mut EventQueue,
) -> Option<Encounter> {
    let kind = detect_violation(state, road_cfg, cfg, dt)?;
    if !rng.gen_bool(cfg.encounter_chance) {
        return None;
    }

    if state.cash < cfg.too_broke_cash {
        log::info!("{:?} waved through: cash KSh {}", kind, state.cash);
        state.last_encounter_at = Some(state.clock);
        state.speeding_secs = 0.0;
        events.message("Officer looks at your empty pockets and waves you through.", 2500);
        return None;
    }

    Some(open_encounter(state, kind, cfg, rng, events))
}

/// Open the modal for `kind` with a randomized fine.
pub fn open_encounter<R: Rng>(
    state: &mut GameState,
    kind: ViolationKind,
    cfg: &EnforcementConfig,
    rng: &mut R,
    events: &mut EventQueue,
) -> Encounter {
    let surcharge = if cfg.fine_band > 0 {
        rng.gen_range(0..cfg.fine_band)
    } else {
        0
    };
    let encounter = Encounter::new(kind, kind.base_fine(cfg) + surcharge);
    state.is_modal_open = true;
    state.last_encounter_at = Some(state.clock);
    state.speeding_secs = 0.0;
    // Pulled over: the bus stands still until the encounter is resolved.
    state.vehicle.speed = 0.0;
    state.vehicle.steering = 0.0;
    state.is_driving = false;
    log::info!(
        "Police encounter ({:?}) at z={:.1}: fine KSh {}",
        kind,
        state.vehicle.z,
        encounter.fine
    );
    events.push(GameEvent::ViolationPrompt(encounter.prompt()));
    encounter
}

/// Apply the player's decision and close the modal.
pub fn resolve_encounter<R: Rng>(
    state: &mut GameState,
    encounter: &mut Encounter,
    decision: Decision,
    cfg: &EnforcementConfig,
    cash_floor: i64,
    rng: &mut R,
    events: &mut EventQueue,
) -> Result<Outcome, ActionError> {
    if !encounter.is_pending() {
        return Err(ActionError::NoEncounter);
    }
    let fine = encounter.fine;

    let outcome = match decision {
        Decision::Pay if state.cash >= fine => {
            state.adjust_cash(-fine, cash_floor);
            events.message(
                format!("Bribe paid (KSh {}). Matatu is back on the road.", fine),
                3000,
            );
            Outcome::Paid { fine }
        }
        Decision::Pay => {
            events.message("Not enough cash! Detention risk increases...", 3000);
            deny(state, fine, cfg, cash_floor, rng, events)
        }
        Decision::Deny => deny(state, fine, cfg, cash_floor, rng, events),
    };

    state.is_modal_open = false;
    state.last_encounter_at = Some(state.clock);
    state.speeding_secs = 0.0;
    encounter.state = EncounterState::Resolved(outcome);
    log::info!("Encounter resolved: {:?} -> {:?}", decision, outcome);
    Ok(outcome)
}

fn deny<R: Rng>(
    state: &mut GameState,
    fine: i64,
    cfg: &EnforcementConfig,
    cash_floor: i64,
    rng: &mut R,
    events: &mut EventQueue,
) -> Outcome {
    if rng.gen_bool(cfg.escape_chance) {
        events.message("You talked your way out! Drive safe.", 3000);
        Outcome::Escaped
    } else {
        let penalty = fine.saturating_mul(cfg.detention_multiplier);
        state.adjust_cash(-penalty, cash_floor);
        events.message(
            format!("Detained! Paid KSh {} official fine. Lose time & money.", penalty),
            5000,
        );
        Outcome::Detained { penalty }
    }
}

/// Penalize overlap with a static obstacle. Fires every frame while
/// overlapping. Returns true on a hit.
pub fn obstacle_system(
    world: &World,
    state: &mut GameState,
    vehicle_cfg: &VehicleConfig,
    cfg: &EnforcementConfig,
    cash_floor: i64,
    events: &mut EventQueue,
) -> bool {
    if state.is_modal_open {
        return false;
    }
    let bounds = player_bounds(vehicle_cfg, &state.vehicle);
    if overlapping_obstacle(world, &bounds).is_none() {
        return false;
    }
    state.adjust_cash(-cfg.obstacle_penalty, cash_floor);
    state.vehicle.speed *= cfg.obstacle_speed_factor;
    events.message(
        format!("Hit an obstacle! KSh {} penalty.", cfg.obstacle_penalty),
        2000,
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use matatu_logic::config::GameConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn red_light_state(config: &GameConfig) -> GameState {
        let mut state = GameState::new(config);
        state.traffic_light = SignalState::Red;
        state.vehicle.speed = 5.0;
        state.clock = 100.0;
        state
    }

    #[test]
    fn test_red_light_detected_in_zone() {
        let config = GameConfig::default();
        let mut state = red_light_state(&config);
        assert_eq!(
            detect_violation(&mut state, &config.road, &config.enforcement, 0.016),
            Some(ViolationKind::RedLight)
        );
        state.vehicle.z = 20.0;
        assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016), None);
    }

    #[test]
    fn test_red_light_needs_motion_and_red() {
        let config = GameConfig::default();
        let mut state = red_light_state(&config);
        state.vehicle.speed = 0.3;
        assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016), None);
        state.vehicle.speed = 5.0;
        state.traffic_light = SignalState::Yellow;
        assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016), None);
    }

    #[test]
    fn test_conductor_never_cited() {
        let config = GameConfig::default();
        let mut state = red_light_state(&config);
        state.role = Role::Conductor;
        assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016), None);
    }

    #[test]
    fn test_cooldown_blocks_detection() {
        let config = GameConfig::default();
        let mut state = red_light_state(&config);
        state.last_encounter_at = Some(80.0);
        assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016), None);
        state.clock = 130.0;
        assert!(detect_violation(&mut state, &config.road, &config.enforcement, 0.016).is_some());
    }

    #[test]
    fn test_speeding_accumulates_and_resets() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.vehicle.z = 200.0;
        state.vehicle.speed = 14.5; // 52.2 km/h
        for _ in 0..15 {
            assert_eq!(detect_violation(&mut state, &config.road, &config.enforcement, 0.1), None);
        }
        assert!((state.speeding_secs - 1.5).abs() < 1e-4);
        state.vehicle.speed = 13.0;
        detect_violation(&mut state, &config.road, &config.enforcement, 0.1);
        assert_eq!(state.speeding_secs, 0.0);

        state.vehicle.speed = 14.5;
        let mut seen = None;
        for _ in 0..25 {
            seen = detect_violation(&mut state, &config.road, &config.enforcement, 0.1);
        }
        assert_eq!(seen, Some(ViolationKind::Speeding));
    }

    #[test]
    fn test_certain_encounter_opens_modal() {
        let mut config = GameConfig::default();
        config.enforcement.encounter_chance = 1.0;
        let mut state = red_light_state(&config);
        let mut rng = StdRng::seed_from_u64(4);
        let mut events = EventQueue::new();
        let encounter =
            violation_system(&mut state, &config.road, &config.enforcement, 0.016, &mut rng, &mut events)
                .unwrap();
        assert!(state.is_modal_open);
        assert!(encounter.is_pending());
        assert!((200..400).contains(&encounter.fine));
        assert_eq!(state.last_encounter_at, Some(100.0));
        assert!(matches!(events.iter().next(), Some(GameEvent::ViolationPrompt(_))));

        // Modal open: nothing further fires.
        assert!(
            violation_system(&mut state, &config.road, &config.enforcement, 0.016, &mut rng, &mut events)
                .is_none()
        );
    }

    #[test]
    fn test_zero_chance_never_fires() {
        let mut config = GameConfig::default();
        config.enforcement.encounter_chance = 0.0;
        let mut state = red_light_state(&config);
        let mut rng = StdRng::seed_from_u64(4);
        let mut events = EventQueue::new();
        for _ in 0..100 {
            assert!(violation_system(
                &mut state,
                &config.road,
                &config.enforcement,
                0.016,
                &mut rng,
                &mut events
            )
            .is_none());
        }
        assert!(!state.is_modal_open);
    }

    #[test]
    fn test_broke_driver_waved_through() {
        let mut config = GameConfig::default();
        config.enforcement.encounter_chance = 1.0;
        let mut state = red_light_state(&config);
        state.cash = 100;
        let mut rng = StdRng::seed_from_u64(4);
        let mut events = EventQueue::new();
        let result =
            violation_system(&mut state, &config.road, &config.enforcement, 0.016, &mut rng, &mut events);
        assert!(result.is_none());
        assert!(!state.is_modal_open);
        assert_eq!(state.last_encounter_at, Some(100.0));
        assert_eq!(state.cash, 100);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_pay_deducts_fine() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.is_modal_open = true;
        let mut encounter = Encounter::new(ViolationKind::RedLight, 250);
        let mut rng = StdRng::seed_from_u64(4);
        let mut events = EventQueue::new();
        let outcome = resolve_encounter(
            &mut state,
            &mut encounter,
            Decision::Pay,
            &config.enforcement,
            config.economy.cash_floor,
            &mut rng,
            &mut events,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Paid { fine: 250 });
        assert_eq!(state.cash, 750);
        assert!(!state.is_modal_open);
        assert_eq!(encounter.state, EncounterState::Resolved(outcome));
    }

    #[test]
    fn test_deny_outcomes() {
        let config = GameConfig::default();
        let mut escaped = 0;
        let mut detained = 0;
        for seed in 0..40 {
            let mut state = GameState::new(&config);
            state.is_modal_open = true;
            let mut encounter = Encounter::new(ViolationKind::Speeding, 300);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut events = EventQueue::new();
            match resolve_encounter(
                &mut state,
                &mut encounter,
                Decision::Deny,
                &config.enforcement,
                config.economy.cash_floor,
                &mut rng,
                &mut events,
            )
            .unwrap()
            {
                Outcome::Escaped => {
                    escaped += 1;
                    assert_eq!(state.cash, 1000);
                }
                Outcome::Detained { penalty } => {
                    detained += 1;
                    assert_eq!(penalty, 600);
                    assert_eq!(state.cash, 400);
                }
                Outcome::Paid { .. } => panic!("deny never pays"),
            }
        }
        assert!(escaped > 0 && detained > 0);
    }

    #[test]
    fn test_resolving_twice_rejected() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut encounter = Encounter::new(ViolationKind::RedLight, 200);
        let mut rng = StdRng::seed_from_u64(4);
        let mut events = EventQueue::new();
        let cfg = &config.enforcement;
        resolve_encounter(&mut state, &mut encounter, Decision::Pay, cfg, -2000, &mut rng, &mut events)
            .unwrap();
        assert_eq!(
            resolve_encounter(&mut state, &mut encounter, Decision::Pay, cfg, -2000, &mut rng, &mut events),
            Err(ActionError::NoEncounter)
        );
        assert_eq!(state.cash, 800);
    }

    #[test]
    fn test_obstacle_hit_penalty() {
        let config = GameConfig::default();
        let mut world = World::new();
        crate::systems::collision::spawn_obstacle(&mut world, &config.obstacles[0]);
        let mut state = GameState::new(&config);
        state.vehicle.x = -3.0;
        state.vehicle.z = 200.0;
        state.vehicle.speed = 10.0;
        let mut events = EventQueue::new();
        assert!(obstacle_system(
            &world,
            &mut state,
            &config.vehicle,
            &config.enforcement,
            config.economy.cash_floor,
            &mut events
        ));
        assert_eq!(state.cash, 950);
        assert!((state.vehicle.speed - 3.0).abs() < 1e-5);
    }
}
