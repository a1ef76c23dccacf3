//! Economy system - destinations, stops, fares, fuel and the periodic
//! bookkeeping tick.
//!
//! The per-frame half (arrival detection, fuel-station notice, goal check)
//! runs from the engine's update; [`economic_tick`] runs on the fixed 500 ms
//! schedule. Door actions ([`pick_up`], [`drop_off`]) and [`refuel`] are
//! invoked by the engine on player request after it has checked role and
//! route preconditions.

use matatu_logic::config::{EconomyConfig, FuelStationSpec, GameConfig, RoadConfig};
use matatu_logic::fares::{self, StopKind};
use matatu_logic::road;
use rand::Rng;

use crate::error::ActionError;
use crate::presentation::{EventQueue, GameEvent};
use crate::state::{BusStop, GameState, Role};

/// What one economic tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub passive_income: i64,
    pub maintenance_charged: bool,
    /// The tank ran dry this tick; the route must stop.
    pub fuel_exhausted: bool,
}

/// Pick the next destination uniformly among the stops not named like the
/// current one, and point the marker at it.
pub fn select_destination<R: Rng>(state: &mut GameState, stops: &[BusStop], rng: &mut R) -> bool {
    let current = state.current_destination.as_ref().map(|d| d.name.as_str());
    let choices: Vec<&BusStop> = stops.iter().filter(|s| Some(s.name.as_str()) != current).collect();
    if choices.is_empty() {
        return false;
    }
    let next = choices[rng.gen_range(0..choices.len())].clone();
    log::debug!("Next destination: {} (KSh {}/head)", next.name, next.base_fare);
    state.target_marker = Some(next.marker());
    state.current_destination = Some(next);
    true
}

/// Route start: only picks a destination if none is set yet.
pub fn init_route<R: Rng>(state: &mut GameState, stops: &[BusStop], rng: &mut R) {
    if state.current_destination.is_none() {
        select_destination(state, stops, rng);
    }
}

/// Arrival detection against the target marker.
///
/// Reaching the marker classifies the stop and clears the marker. Leaving
/// the radius again with the stop still unhandled restores the marker for
/// the same destination. Returns the stop kind on arrival.
pub fn arrival_system(
    state: &mut GameState,
    road_cfg: &RoadConfig,
    arrival_radius: f32,
    events: &mut EventQueue,
) -> Option<StopKind> {
    let r_sq = arrival_radius * arrival_radius;
    let (x, z) = (state.vehicle.x, state.vehicle.z);

    if let Some(marker) = state.target_marker {
        if road::shortest_dist_sq(road_cfg, x, z, marker.x, marker.z) >= r_sq {
            return None;
        }
        let base_fare = state.current_destination.as_ref().map_or(0, |d| d.base_fare);
        let kind = fares::classify_arrival(state.passengers, base_fare);
        match kind {
            StopKind::DropOff => {
                let name = state
                    .current_destination
                    .as_ref()
                    .map_or("the stop", |d| d.name.as_str());
                events.message(format!("Arrived at {}. Drop off passengers!", name), 3000);
            }
            StopKind::PickUp => events.message("Bus stop! Pick up passengers.", 3000),
        }
        log::debug!("Arrived at marker ({:.1}, {:.1}): {}", marker.x, marker.z, kind.label());
        state.target_marker = None;
        state.current_stop = Some(kind);
        events.push(GameEvent::ConductorAction(Some(kind)));
        return Some(kind);
    }

    if state.current_stop.is_some() {
        if let Some(dest) = &state.current_destination {
            if road::shortest_dist_sq(road_cfg, x, z, dest.x, dest.z) >= r_sq {
                log::debug!("Left {} without serving it", dest.name);
                events.message(format!("Missed the stop at {}. Turn back!", dest.name), 2500);
                state.target_marker = Some(dest.marker());
                state.current_stop = None;
                events.push(GameEvent::ConductorAction(None));
            }
        }
    }
    None
}

/// How many passengers are waiting at a pick-up stop.
pub fn roll_boarding<R: Rng>(cfg: &EconomyConfig, rng: &mut R) -> u32 {
    rng.gen_range(cfg.boarding_min..=cfg.boarding_max)
}

/// Board passengers at a pick-up stop. Returns how many got on.
///
/// A full bus boards nobody; the stop is still cleared and the route moves
/// on to the next destination.
pub fn pick_up<R: Rng>(
    state: &mut GameState,
    stops: &[BusStop],
    cfg: &EconomyConfig,
    rng: &mut R,
    events: &mut EventQueue,
) -> Result<u32, ActionError> {
    if state.current_stop != Some(StopKind::PickUp) {
        return Err(ActionError::NotAtStop(StopKind::PickUp));
    }
    let waiting = roll_boarding(cfg, rng);
    let boarded = state.board(waiting);
    if boarded > 0 {
        let fare = fares::pick_up_fare(boarded, cfg.pick_up_fare);
        state.adjust_cash(fare, cfg.cash_floor);
        events.message(
            format!("Wacha tupande! Picked up {} passengers. KSh {}.", boarded, fare),
            2000,
        );
        log::info!("Picked up {} passengers (+KSh {})", boarded, fare);
    } else {
        events.message("Matatu is full! Get going!", 2000);
    }
    finish_stop(state, stops, rng, events);
    Ok(boarded)
}

/// Everyone aboard alights and pays the destination fare. Returns the fare.
pub fn drop_off<R: Rng>(
    state: &mut GameState,
    stops: &[BusStop],
    cfg: &EconomyConfig,
    rng: &mut R,
    events: &mut EventQueue,
) -> Result<i64, ActionError> {
    if state.current_stop != Some(StopKind::DropOff) {
        return Err(ActionError::NotAtStop(StopKind::DropOff));
    }
    let base_fare = state.current_destination.as_ref().map_or(0, |d| d.base_fare);
    let total = fares::drop_off_fare(state.passengers, base_fare);
    state.adjust_cash(total, cfg.cash_floor);
    log::info!("Dropped off {} passengers (+KSh {})", state.passengers, total);
    state.passengers = 0;
    events.message(
        format!("Tushukishe! Dropped off all passengers. KSh {} total profit!", total),
        3000,
    );
    finish_stop(state, stops, rng, events);
    Ok(total)
}

fn finish_stop<R: Rng>(state: &mut GameState, stops: &[BusStop], rng: &mut R, events: &mut EventQueue) {
    state.current_stop = None;
    if !select_destination(state, stops, rng) {
        // Single-stop route: keep serving the same stop.
        state.target_marker = state.current_destination.as_ref().map(BusStop::marker);
    }
    events.push(GameEvent::ConductorAction(None));
}

/// The 500 ms bookkeeping tick: fuel burn, conductor trickle, maintenance.
///
/// No-op (returns `None`) unless the route is running, the bus is moving
/// and no modal is open.
pub fn economic_tick<R: Rng>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
    events: &mut EventQueue,
) -> Option<TickReport> {
    if !state.on_route || !state.is_driving || state.is_modal_open {
        return None;
    }
    let eco = &config.economy;
    let mut report = TickReport::default();

    let burn = fares::fuel_burn(state.speed(), config.vehicle.max_speed, eco.fuel_burn_rate);
    state.fuel = fares::burn_fuel(state.fuel, burn);
    if state.fuel <= 0.0 {
        report.fuel_exhausted = true;
        return Some(report);
    }

    if state.role == Role::Conductor {
        let spread = if eco.passive_fare_spread > 0 {
            rng.gen_range(0..eco.passive_fare_spread)
        } else {
            0
        };
        report.passive_income = eco.passive_fare_base + spread;
        state.adjust_cash(report.passive_income, eco.cash_floor);
    }

    state.economic_ticks += 1;
    if eco.maintenance_interval > 0 && state.economic_ticks % eco.maintenance_interval == 0 {
        state.adjust_cash(-eco.maintenance_cost, eco.cash_floor);
        report.maintenance_charged = true;
        events.message(
            format!("Maintenance due: KSh {} for the mechanic.", eco.maintenance_cost),
            2500,
        );
        log::info!("Maintenance charged (KSh {})", eco.maintenance_cost);
    }

    Some(report)
}

/// One-shot goal detection. Returns true on the frame the goal is first met.
pub fn goal_system(state: &mut GameState, goal_cash: i64, events: &mut EventQueue) -> bool {
    if state.goal_reached || state.cash < goal_cash {
        return false;
    }
    state.goal_reached = true;
    events.message(
        format!("Goal reached! KSh {}. You own the route now!", state.cash),
        5000,
    );
    events.push(GameEvent::GoalReached { cash: state.cash });
    log::info!("Goal reached with KSh {}", state.cash);
    true
}

/// Index of a fuel station within `radius` of `(x, z)`.
pub fn nearby_fuel_station(
    stations: &[FuelStationSpec],
    road_cfg: &RoadConfig,
    x: f32,
    z: f32,
    radius: f32,
) -> Option<usize> {
    let r_sq = radius * radius;
    stations
        .iter()
        .position(|s| road::shortest_dist_sq(road_cfg, x, z, s.x, s.z) < r_sq)
}

/// Track which station the bus is parked by; announce each new visit once.
pub fn fuel_station_system(
    state: &mut GameState,
    stations: &[FuelStationSpec],
    road_cfg: &RoadConfig,
    eco: &EconomyConfig,
    events: &mut EventQueue,
) {
    let here = nearby_fuel_station(
        stations,
        road_cfg,
        state.vehicle.x,
        state.vehicle.z,
        eco.arrival_radius,
    );
    if here == state.at_fuel_station {
        return;
    }
    state.at_fuel_station = here;
    if let Some(station) = here.and_then(|i| stations.get(i)) {
        events.message(
            format!("{}: refuel here for KSh {}.", station.name, eco.refuel_cost),
            2500,
        );
    }
}

/// Fill the tank. With stations configured the bus must be at one, unless
/// it is stranded with an empty tank.
pub fn refuel(
    state: &mut GameState,
    eco: &EconomyConfig,
    stations: &[FuelStationSpec],
    road_cfg: &RoadConfig,
) -> Result<(), ActionError> {
    if state.fuel >= 100.0 {
        return Err(ActionError::TankFull);
    }
    if !stations.is_empty() && state.fuel > 0.0 {
        let near = nearby_fuel_station(
            stations,
            road_cfg,
            state.vehicle.x,
            state.vehicle.z,
            eco.arrival_radius,
        );
        if near.is_none() {
            return Err(ActionError::NoFuelStation);
        }
    }
    if state.cash < eco.refuel_cost {
        return Err(ActionError::InsufficientFunds {
            needed: eco.refuel_cost,
            available: state.cash,
        });
    }
    state.adjust_cash(-eco.refuel_cost, eco.cash_floor);
    state.set_fuel(100.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (GameConfig, GameState, Vec<BusStop>) {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        let stops = config
            .bus_stops
            .iter()
            .map(|s| BusStop::from_spec(s, &config.road))
            .collect();
        (config, state, stops)
    }

    fn park_at(state: &mut GameState, stop: &BusStop) {
        state.vehicle.x = stop.x;
        state.vehicle.z = stop.z;
    }

    #[test]
    fn test_select_destination_never_repeats() {
        let (_, mut state, stops) = setup();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let before = state.current_destination.as_ref().map(|d| d.name.clone());
            assert!(select_destination(&mut state, &stops, &mut rng));
            let after = state.current_destination.as_ref().map(|d| d.name.clone());
            assert_ne!(before, after);
            let dest = state.current_destination.as_ref().unwrap();
            assert_eq!(state.target_marker, Some(dest.marker()));
        }
    }

    #[test]
    fn test_single_stop_route() {
        let (_, mut state, stops) = setup();
        let only = vec![stops[0].clone()];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_destination(&mut state, &only, &mut rng));
        assert!(!select_destination(&mut state, &only, &mut rng));
        assert_eq!(state.current_destination.as_ref().unwrap().name, "CBD");
    }

    #[test]
    fn test_arrival_classifies_stop() {
        let (config, mut state, stops) = setup();
        let mut events = EventQueue::new();
        state.current_destination = Some(stops[0].clone());
        state.target_marker = Some(stops[0].marker());
        state.vehicle.z = stops[0].z - 20.0;
        assert_eq!(arrival_system(&mut state, &config.road, 10.0, &mut events), None);

        park_at(&mut state, &stops[0]);
        state.vehicle.z -= 5.0;
        assert_eq!(
            arrival_system(&mut state, &config.road, 10.0, &mut events),
            Some(StopKind::PickUp)
        );
        assert_eq!(state.current_stop, Some(StopKind::PickUp));
        assert!(state.target_marker.is_none());
        assert!(events
            .iter()
            .any(|e| *e == GameEvent::ConductorAction(Some(StopKind::PickUp))));
    }

    #[test]
    fn test_arrival_with_passengers_is_drop_off() {
        let (config, mut state, stops) = setup();
        let mut events = EventQueue::new();
        state.passengers = 4;
        state.current_destination = Some(stops[2].clone());
        state.target_marker = Some(stops[2].marker());
        park_at(&mut state, &stops[2]);
        assert_eq!(
            arrival_system(&mut state, &config.road, 10.0, &mut events),
            Some(StopKind::DropOff)
        );
    }

    #[test]
    fn test_leaving_stop_restores_marker() {
        let (config, mut state, stops) = setup();
        let mut events = EventQueue::new();
        state.current_destination = Some(stops[1].clone());
        state.target_marker = Some(stops[1].marker());
        park_at(&mut state, &stops[1]);
        arrival_system(&mut state, &config.road, 10.0, &mut events);
        assert!(state.current_stop.is_some());

        state.vehicle.z += 30.0;
        arrival_system(&mut state, &config.road, 10.0, &mut events);
        assert!(state.current_stop.is_none());
        assert_eq!(state.target_marker, Some(stops[1].marker()));
    }

    #[test]
    fn test_pick_up_requires_pick_up_stop() {
        let (config, mut state, stops) = setup();
        let mut rng = StdRng::seed_from_u64(2);
        let mut events = EventQueue::new();
        let err = pick_up(&mut state, &stops, &config.economy, &mut rng, &mut events).unwrap_err();
        assert_eq!(err, ActionError::NotAtStop(StopKind::PickUp));
        assert_eq!(state.passengers, 0);
    }

    #[test]
    fn test_pick_up_boards_within_range() {
        let (config, mut state, stops) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.current_destination = Some(stops[0].clone());
        state.current_stop = Some(StopKind::PickUp);
        let boarded = pick_up(&mut state, &stops, &config.economy, &mut rng, &mut events).unwrap();
        assert!((3..=7).contains(&boarded));
        assert_eq!(state.passengers, boarded);
        assert_eq!(state.cash, 1000 + boarded as i64 * 50);
        assert!(state.current_stop.is_none());
        assert!(state.target_marker.is_some());
        assert_ne!(state.current_destination.as_ref().unwrap().name, "CBD");
    }

    #[test]
    fn test_full_bus_boards_nobody() {
        let (config, mut state, stops) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.passengers = 14;
        state.current_destination = Some(stops[0].clone());
        state.current_stop = Some(StopKind::PickUp);
        assert_eq!(pick_up(&mut state, &stops, &config.economy, &mut rng, &mut events), Ok(0));
        assert_eq!(state.cash, 1000);
        assert!(state.current_stop.is_none());
        assert!(events.iter().any(|e| matches!(e, GameEvent::Message { text, .. } if text.contains("full"))));
    }

    #[test]
    fn test_drop_off_pays_lump_sum() {
        let (config, mut state, stops) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.passengers = 6;
        state.current_destination = Some(stops[0].clone());
        state.current_stop = Some(StopKind::DropOff);
        assert_eq!(drop_off(&mut state, &stops, &config.economy, &mut rng, &mut events), Ok(900));
        assert_eq!(state.cash, 1900);
        assert_eq!(state.passengers, 0);
    }

    #[test]
    fn test_economic_tick_gated() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        assert_eq!(economic_tick(&mut state, &config, &mut rng, &mut events), None);
        state.on_route = true;
        state.is_driving = true;
        state.is_modal_open = true;
        assert_eq!(economic_tick(&mut state, &config, &mut rng, &mut events), None);
        assert_eq!(state.fuel, 100.0);
    }

    #[test]
    fn test_economic_tick_burns_and_pays_conductor() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.on_route = true;
        state.is_driving = true;
        state.role = Role::Conductor;
        state.vehicle.speed = 15.0;
        let report = economic_tick(&mut state, &config, &mut rng, &mut events).unwrap();
        assert!((state.fuel - (100.0 - 0.06)).abs() < 1e-4);
        assert!((5..10).contains(&report.passive_income));
        assert_eq!(state.cash, 1000 + report.passive_income);
    }

    #[test]
    fn test_driver_earns_nothing_passively() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.on_route = true;
        state.is_driving = true;
        let report = economic_tick(&mut state, &config, &mut rng, &mut events).unwrap();
        assert_eq!(report.passive_income, 0);
        assert_eq!(state.cash, 1000);
    }

    #[test]
    fn test_maintenance_every_interval() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.on_route = true;
        state.is_driving = true;
        let mut charged = 0;
        for _ in 0..240 {
            if economic_tick(&mut state, &config, &mut rng, &mut events)
                .unwrap()
                .maintenance_charged
            {
                charged += 1;
            }
        }
        assert_eq!(charged, 2);
        assert_eq!(state.cash, 800);
    }

    #[test]
    fn test_maintenance_respects_floor() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.on_route = true;
        state.is_driving = true;
        state.cash = -1950;
        state.economic_ticks = 119;
        economic_tick(&mut state, &config, &mut rng, &mut events);
        assert_eq!(state.cash, -2000);
    }

    #[test]
    fn test_last_drop_of_fuel() {
        let (config, mut state, _) = setup();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventQueue::new();
        state.on_route = true;
        state.is_driving = true;
        state.fuel = 0.01;
        let report = economic_tick(&mut state, &config, &mut rng, &mut events).unwrap();
        assert!(report.fuel_exhausted);
        assert_eq!(state.fuel, 0.0);
    }

    #[test]
    fn test_goal_fires_once() {
        let (_, mut state, _) = setup();
        let mut events = EventQueue::new();
        state.cash = 9_999;
        assert!(!goal_system(&mut state, 10_000, &mut events));
        state.cash = 10_020;
        assert!(goal_system(&mut state, 10_000, &mut events));
        state.adjust_cash(-7_000, -2000);
        state.adjust_cash(9_000, -2000);
        assert!(!goal_system(&mut state, 10_000, &mut events));
        let goals = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GoalReached { .. }))
            .count();
        assert_eq!(goals, 1);
    }

    #[test]
    fn test_refuel_rules() {
        let (config, mut state, _) = setup();
        let eco = &config.economy;
        let stations = &config.fuel_stations;
        assert_eq!(refuel(&mut state, eco, stations, &config.road), Err(ActionError::TankFull));

        state.fuel = 40.0;
        assert_eq!(
            refuel(&mut state, eco, stations, &config.road),
            Err(ActionError::NoFuelStation)
        );

        state.vehicle.x = stations[0].x;
        state.vehicle.z = stations[0].z + 4.0;
        assert_eq!(refuel(&mut state, eco, stations, &config.road), Ok(()));
        assert_eq!(state.fuel, 100.0);
        assert_eq!(state.cash, 500);
    }

    #[test]
    fn test_refuel_when_stranded_anywhere() {
        let (config, mut state, _) = setup();
        state.fuel = 0.0;
        state.cash = 499;
        assert_eq!(
            refuel(&mut state, &config.economy, &config.fuel_stations, &config.road),
            Err(ActionError::InsufficientFunds {
                needed: 500,
                available: 499
            })
        );
        state.cash = 600;
        assert_eq!(
            refuel(&mut state, &config.economy, &config.fuel_stations, &config.road),
            Ok(())
        );
        assert_eq!(state.cash, 100);
    }

    #[test]
    fn test_fuel_station_notice_once_per_visit() {
        let (config, mut state, _) = setup();
        let mut events = EventQueue::new();
        let station = &config.fuel_stations[1];
        state.vehicle.x = station.x;
        state.vehicle.z = station.z;
        for _ in 0..10 {
            fuel_station_system(&mut state, &config.fuel_stations, &config.road, &config.economy, &mut events);
        }
        assert_eq!(events.len(), 1);
        assert_eq!(state.at_fuel_station, Some(1));

        state.vehicle.z += 50.0;
        fuel_station_system(&mut state, &config.fuel_stations, &config.road, &config.economy, &mut events);
        assert_eq!(state.at_fuel_station, None);
        state.vehicle.z -= 50.0;
        fuel_station_system(&mut state, &config.fuel_stations, &config.road, &config.economy, &mut events);
        assert_eq!(events.len(), 2);
    }
}
