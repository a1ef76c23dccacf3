//! Simulation engine - main entry point for running the game

use hecs::{Entity, World};
use matatu_logic::config::{GameConfig, ObstacleSpec};
use matatu_logic::dynamics::{self, ControlInput, ControlMode};
use matatu_logic::fares::StopKind;
use matatu_logic::road;
use matatu_logic::signal::{SignalCycle, SignalState};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ActionError;
use crate::presentation::{dispatch, EventQueue, GameEvent, Presentation, PresentationError, Snapshot};
use crate::state::{BusStop, GameState, Role};
use crate::systems::*;

/// Frames longer than this are treated as a hitch and truncated.
const MAX_FRAME_SECS: f32 = 1.0;

/// Owns the game state, the ECS world and every scheduler.
///
/// Exactly one engine drives one `GameState`; all mutation happens inside
/// its methods, one call at a time.
pub struct SimulationEngine {
    /// ECS world holding NPC cars and static obstacles
    pub world: World,
    config: GameConfig,
    state: GameState,
    stops: Vec<BusStop>,
    rng: StdRng,
    signal: SignalCycle,
    traffic: TrafficController,
    /// Seconds accumulated toward the next economic tick
    economic_elapsed: f32,
    events: EventQueue,
    encounter: Option<Encounter>,
    halted: bool,
    accelerate_held: bool,
}

impl SimulationEngine {
    /// Build an engine, seeding the RNG from `config.seed` or from entropy.
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(config, rng)
    }

    /// Build an engine with a fixed seed, overriding `config.seed`.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: GameConfig, rng: StdRng) -> Self {
        let stops: Vec<BusStop> = config
            .bus_stops
            .iter()
            .map(|s| BusStop::from_spec(s, &config.road))
            .collect();
        let mut world = World::new();
        for spec in &config.obstacles {
            spawn_obstacle(&mut world, spec);
        }
        log::info!(
            "Simulation ready: {} stops, {} obstacles, {} fuel stations",
            stops.len(),
            config.obstacles.len(),
            config.fuel_stations.len()
        );
        Self {
            world,
            state: GameState::new(&config),
            stops,
            rng,
            signal: SignalCycle::new(config.signal.period_ms),
            traffic: TrafficController::new(&config.traffic),
            economic_elapsed: 0.0,
            events: EventQueue::new(),
            encounter: None,
            halted: false,
            accelerate_held: false,
            config,
        }
    }

    /// Advance the simulation by one frame of `dt` seconds.
    pub fn update(&mut self, input: &ControlInput, dt: f32) {
        if self.halted {
            return;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_SECS)
        } else {
            0.0
        };
        let pressed = input.accelerate && !self.accelerate_held;
        self.accelerate_held = input.accelerate;

        // Gameplay time stands still while the police are at the window.
        if self.state.is_modal_open {
            let v = &mut self.state.vehicle;
            v.speed = 0.0;
            v.steering = 0.0;
            self.state.is_driving = false;
            dynamics::settle(&self.config.vehicle, &mut self.state.vehicle, dt);
            return;
        }

        self.state.clock += dt as f64;
        if let Some(light) = self.signal.advance(dt) {
            log::debug!("Signal -> {}", light.label());
            self.state.traffic_light = light;
            self.events.push(GameEvent::SignalChanged(light));
        }

        if pressed && self.state.role == Role::Driver && !self.state.on_route {
            let _ = self.start_route();
        }

        self.drive(input, dt);

        if let Some(encounter) = violation_system(
            &mut self.state,
            &self.config.road,
            &self.config.enforcement,
            dt,
            &mut self.rng,
            &mut self.events,
        ) {
            self.encounter = Some(encounter);
            return;
        }

        if self.state.role == Role::Conductor && self.state.on_route {
            autopilot_system(
                &mut self.state,
                &self.config.vehicle,
                &self.config.economy,
                &self.config.road,
                dt,
                &mut self.rng,
            );
        }

        if let Some(entity) = self.traffic.update(
            &mut self.world,
            &self.config.traffic,
            &self.config.road,
            self.state.traffic_light,
            dt,
            &mut self.rng,
        ) {
            log::debug!("Traffic pool grew: {:?}", entity);
        }

        obstacle_system(
            &self.world,
            &mut self.state,
            &self.config.vehicle,
            &self.config.enforcement,
            self.config.economy.cash_floor,
            &mut self.events,
        );
        traffic_bump_system(
            &self.world,
            &mut self.state,
            &self.config.vehicle,
            &self.config.enforcement,
            &mut self.events,
        );
        arrival_system(
            &mut self.state,
            &self.config.road,
            self.config.economy.arrival_radius,
            &mut self.events,
        );
        fuel_station_system(
            &mut self.state,
            &self.config.fuel_stations,
            &self.config.road,
            &self.config.economy,
            &mut self.events,
        );

        if self.state.on_route {
            let interval = self.config.economy.economic_tick_ms as f32 / 1000.0;
            self.economic_elapsed += dt;
            while interval > 0.0 && self.economic_elapsed >= interval && self.state.on_route {
                self.economic_elapsed -= interval;
                self.economic_tick();
            }
        }

        self.check_goal();
    }

    /// Dynamics, loop wrap and curb clamp for the player's matatu.
    fn drive(&mut self, input: &ControlInput, dt: f32) {
        let mode = match self.state.role {
            Role::Driver => ControlMode::Manual,
            Role::Conductor => ControlMode::External,
        };
        let controls = ControlInput {
            handbrake: input.handbrake || self.state.accessories.handbrake,
            ..*input
        };
        let outcome = dynamics::step(
            &self.config.vehicle,
            &mut self.state.vehicle,
            &controls,
            mode,
            self.state.fuel,
            dt,
        );
        self.state.is_driving = outcome.is_driving;
        if outcome.fuel_exhausted && self.stop_route() {
            self.out_of_fuel_message();
        }

        let road_cfg = &self.config.road;
        let v = &mut self.state.vehicle;
        v.z = road::wrap_player_z(road_cfg, v.z);
        let curb = road::clamp_to_road(road_cfg, v.x, v.speed);
        v.x = curb.x;
        v.speed = curb.speed;
    }

    /// One run of the fixed-period bookkeeping tick.
    pub fn economic_tick(&mut self) -> Option<TickReport> {
        if self.halted {
            return None;
        }
        let report = economic_tick(&mut self.state, &self.config, &mut self.rng, &mut self.events)?;
        if report.fuel_exhausted && self.stop_route() {
            self.out_of_fuel_message();
        }
        self.check_goal();
        Some(report)
    }

    fn out_of_fuel_message(&mut self) {
        let text = if self.state.cash >= self.config.economy.refuel_cost {
            format!("Out of fuel! Refuel for KSh {}.", self.config.economy.refuel_cost)
        } else {
            "Out of fuel and out of cash. Start a new day to try again.".to_string()
        };
        self.events.message(text, 4000);
    }

    fn check_goal(&mut self) {
        goal_system(&mut self.state, self.config.economy.goal_cash, &mut self.events);
    }

    fn check_action(&mut self) -> Result<(), ActionError> {
        if self.halted {
            return Err(ActionError::Halted);
        }
        if self.state.is_modal_open {
            log::warn!("Action rejected: police encounter pending");
            self.events.message("Deal with the officer first!", 2000);
            return Err(ActionError::ModalOpen);
        }
        Ok(())
    }

    /// Start the route: pick a destination and start the economic clock.
    pub fn start_route(&mut self) -> Result<(), ActionError> {
        self.check_action()?;
        if self.state.on_route {
            return Err(ActionError::RouteAlreadyRunning);
        }
        if self.state.fuel <= 0.0 {
            log::warn!("Route start rejected: tank empty");
            self.events.message("Cannot start route. Fuel is empty!", 3000);
            return Err(ActionError::TankEmpty);
        }
        init_route(&mut self.state, &self.stops, &mut self.rng);
        self.state.on_route = true;
        self.economic_elapsed = 0.0;
        self.events.push(GameEvent::RouteStarted);
        self.events.message("Route started!", 2000);
        log::info!(
            "Route started, heading for {}",
            self.state
                .current_destination
                .as_ref()
                .map_or("nowhere", |d| d.name.as_str())
        );
        Ok(())
    }

    /// Stop the route and bring the matatu to rest. Returns false if the
    /// route was not running.
    pub fn stop_route(&mut self) -> bool {
        if !self.state.on_route {
            return false;
        }
        self.state.on_route = false;
        self.state.vehicle.speed = 0.0;
        self.state.is_driving = false;
        self.economic_elapsed = 0.0;
        self.events.push(GameEvent::RouteStopped);
        self.events.message("Route STOPPED.", 2000);
        log::info!("Route stopped at z={:.1}", self.state.vehicle.z);
        true
    }

    /// Swap between driver and conductor. Switching to conductor with the
    /// route stopped starts it.
    pub fn switch_role(&mut self) -> Result<Role, ActionError> {
        if self.halted {
            return Err(ActionError::Halted);
        }
        if self.state.is_modal_open {
            log::warn!("Role switch rejected: police encounter pending");
            return Err(ActionError::ModalOpen);
        }
        let role = self.state.role.toggled();
        self.state.role = role;
        log::info!("Role switched to {}", role.name());
        if role == Role::Conductor {
            if !self.state.on_route {
                let _ = self.start_route();
            }
            self.events.message("Driver taking the wheel (Autopilot Active)!", 2000);
        }
        self.events.message(format!("Role switched to {}!", role.name()), 2000);
        Ok(role)
    }

    /// Buy a full tank. Stops the route.
    pub fn refuel(&mut self) -> Result<(), ActionError> {
        self.check_action()?;
        let eco = &self.config.economy;
        match refuel(&mut self.state, eco, &self.config.fuel_stations, &self.config.road) {
            Ok(()) => {
                log::info!("Refuelled for KSh {}", eco.refuel_cost);
                self.events
                    .message("Refueled! Back to 100%. Keep the money flowing!", 2000);
                self.stop_route();
                Ok(())
            }
            Err(e) => {
                log::warn!("Refuel rejected: {}", e);
                let text = match &e {
                    ActionError::TankFull => "Fuel is already full!".to_string(),
                    ActionError::NoFuelStation => "Pull into a fuel station to refuel.".to_string(),
                    _ => format!("Insufficient funds! KSh {} needed to refuel.", eco.refuel_cost),
                };
                self.events.message(text, 3000);
                Err(e)
            }
        }
    }

    /// Work the door at the current stop. Returns the cash earned.
    pub fn conductor_action(&mut self, kind: StopKind) -> Result<i64, ActionError> {
        self.check_action()?;
        if !self.state.on_route {
            self.events
                .message("The matatu must be on the road for business!", 3000);
            return Err(ActionError::NotOnRoute);
        }
        if self.state.role != Role::Conductor {
            return Err(ActionError::WrongRole);
        }
        let cash_before = self.state.cash;
        let result = match kind {
            StopKind::PickUp => pick_up(
                &mut self.state,
                &self.stops,
                &self.config.economy,
                &mut self.rng,
                &mut self.events,
            )
            .map(|_| ()),
            StopKind::DropOff => drop_off(
                &mut self.state,
                &self.stops,
                &self.config.economy,
                &mut self.rng,
                &mut self.events,
            )
            .map(|_| ()),
        };
        if let Err(e) = result {
            log::warn!("Conductor action rejected: {}", e);
            self.events.message("Wait for the right stop/destination.", 2000);
            return Err(e);
        }
        self.check_goal();
        Ok(self.state.cash - cash_before)
    }

    /// Answer the pending police encounter.
    pub fn resolve_encounter(&mut self, decision: Decision) -> Result<Outcome, ActionError> {
        if self.halted {
            return Err(ActionError::Halted);
        }
        let encounter = self
            .encounter
            .as_mut()
            .filter(|e| e.is_pending())
            .ok_or(ActionError::NoEncounter)?;
        let outcome = resolve_encounter(
            &mut self.state,
            encounter,
            decision,
            &self.config.enforcement,
            self.config.economy.cash_floor,
            &mut self.rng,
            &mut self.events,
        )?;
        self.check_goal();
        Ok(outcome)
    }

    /// Start over with fresh state; only the day counter carries over.
    pub fn new_day(&mut self) {
        self.state = self.state.next_day(&self.config);
        clear_traffic(&mut self.world);
        self.signal.reset();
        self.traffic.reset();
        self.economic_elapsed = 0.0;
        self.encounter = None;
        self.accelerate_held = false;
        log::info!("Day {} begins", self.state.day);
        self.events
            .message(format!("Day {}. Fresh tank, fresh start!", self.state.day), 3000);
        self.events.push(GameEvent::ConductorAction(None));
        self.events.push(GameEvent::SignalChanged(SignalState::Green));
    }

    pub fn toggle_indicator_left(&mut self) -> bool {
        let acc = &mut self.state.accessories;
        acc.indicator_left = !acc.indicator_left;
        if acc.indicator_left {
            acc.indicator_right = false;
        }
        acc.indicator_left
    }

    pub fn toggle_indicator_right(&mut self) -> bool {
        let acc = &mut self.state.accessories;
        acc.indicator_right = !acc.indicator_right;
        if acc.indicator_right {
            acc.indicator_left = false;
        }
        acc.indicator_right
    }

    pub fn toggle_headlights(&mut self) -> bool {
        let acc = &mut self.state.accessories;
        acc.headlights = !acc.headlights;
        acc.headlights
    }

    pub fn set_horn(&mut self, on: bool) {
        self.state.accessories.horn = on;
    }

    pub fn set_handbrake(&mut self, on: bool) {
        self.state.accessories.handbrake = on;
    }

    /// Drop a static obstacle on the road.
    pub fn add_obstacle(&mut self, spec: ObstacleSpec) -> Entity {
        spawn_obstacle(&mut self.world, &spec)
    }

    /// Live NPC cars.
    pub fn vehicles(&self) -> Vec<NpcView> {
        npc_vehicles(&self.world)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.state,
            self.vehicles(),
            self.config.economy.refuel_cost,
        )
    }

    /// Take every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Tick, hand events to the presentation layer, poll a pending police
    /// decision and render.
    ///
    /// A render failure halts the engine for good: the route stops, no
    /// further frames run, and the error is returned.
    pub fn run_frame<P: Presentation + ?Sized>(
        &mut self,
        input: &ControlInput,
        dt: f32,
        presentation: &mut P,
    ) -> Result<(), PresentationError> {
        if self.halted {
            return Ok(());
        }
        self.update(input, dt);
        self.flush(presentation);

        if self.pending_encounter().is_some() {
            if let Some(decision) = presentation.poll_violation_decision() {
                let _ = self.resolve_encounter(decision);
                self.flush(presentation);
            }
        }

        let snapshot = self.snapshot();
        if let Err(e) = presentation.render(&snapshot) {
            log::error!("Frame failed, halting simulation: {}", e);
            self.halt(e.to_string());
            self.flush(presentation);
            return Err(e);
        }
        Ok(())
    }

    fn flush<P: Presentation + ?Sized>(&mut self, presentation: &mut P) {
        for event in self.events.drain() {
            dispatch(presentation, &event);
        }
    }

    /// Stop all future ticks. Game state is left as it was, except that the
    /// economic clock no longer runs.
    pub fn halt(&mut self, reason: impl Into<String>) {
        if self.halted {
            return;
        }
        self.halted = true;
        if self.state.on_route {
            self.state.on_route = false;
            self.events.push(GameEvent::RouteStopped);
        }
        self.events.push(GameEvent::Halted {
            reason: reason.into(),
        });
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for hosts that script a situation (tests, harness).
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn stops(&self) -> &[BusStop] {
        &self.stops
    }

    pub fn pending_encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref().filter(|e| e.is_pending())
    }

    /// The most recent encounter, pending or resolved.
    pub fn last_encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn signal_state(&self) -> SignalState {
        self.signal.state()
    }

    /// Gameplay seconds elapsed today.
    pub fn clock(&self) -> f64 {
        self.state.clock
    }
}
