//! Matatu Headless Simulation Harness
//!
//! Plays scripted sessions against the engine and checks the game rules.
//! Runs entirely in-process: no window, no input devices, no audio.
//!
//! Usage:
//!   cargo run -p matatu-simtest
//!   cargo run -p matatu-simtest -- --verbose
//!   cargo run -p matatu-simtest -- --config my_route.json --seed 7
//!
//! Set `RUST_LOG=matatu_core=debug` to see the engine's own log lines.

use std::path::PathBuf;

use clap::Parser;
use matatu_core::config::{load_config, parse_bus_stops, validate_config, LoadError};
use matatu_core::prelude::*;
use matatu_core::presentation::RecordingPresentation;
use matatu_logic::road;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ── Stop table (same JSON a host ships with) ───────────────────────────
const BUS_STOPS_JSON: &str = include_str!("../../../data/bus_stops.json");

const DT: f32 = 1.0 / 60.0;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "matatu-simtest", about = "Headless matatu simulation harness")]
struct Args {
    /// Print passing checks, session summaries and engine log lines
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration override file
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for every session
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// `RUST_LOG` wins; otherwise `--verbose` shows the engine's info lines.
fn log_filter(verbose: bool) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("matatu_core=info")
    } else {
        EnvFilter::new("warn")
    }
}

/// End-of-session numbers, printed as JSON in verbose mode.
#[derive(Debug, Default, Serialize)]
struct SessionSummary {
    role: String,
    seconds: f64,
    cash: i64,
    fuel: f32,
    passengers: u32,
    encounters: usize,
    stops_served: u32,
    messages: usize,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose))
        .init();

    println!("=== Matatu Simulation Harness (seed {}) ===\n", args.seed);

    let mut results = Vec::new();

    // 1. Configuration and stop table
    let config = match resolve_config(&args, &mut results) {
        Some(c) => c,
        None => {
            report(&results, args.verbose);
            std::process::exit(1);
        }
    };

    // 2. Driver session with random inputs
    results.extend(validate_driver_session(&config, args.seed, args.verbose));

    // 3. Conductor autopilot session
    results.extend(validate_conductor_session(&config, args.seed, args.verbose));

    // 4. Fuel exhaustion and the new-day reset
    results.extend(validate_fuel_cycle(&config, args.seed));

    // 5. Police encounters
    results.extend(validate_police(&config, args.seed));

    // 6. Replay determinism
    results.extend(validate_determinism(&config, args.seed));

    if !report(&results, args.verbose) {
        std::process::exit(1);
    }
}

/// Print every failure (and every pass with `--verbose`). Returns true if
/// all checks passed.
fn report(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    failed == 0
}

fn print_summary(summary: &SessionSummary, verbose: bool) {
    if !verbose {
        return;
    }
    match serde_json::to_string(summary) {
        Ok(json) => println!("    {}", json),
        Err(e) => println!("    (summary unavailable: {})", e),
    }
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn resolve_config(args: &Args, results: &mut Vec<TestResult>) -> Option<GameConfig> {
    println!("--- Configuration ---");

    let stops = match parse_bus_stops(BUS_STOPS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult::new("stops_parse", false, format!("{}", e)));
            return None;
        }
    };
    results.push(TestResult::new(
        "stops_parse",
        stops.len() == 6,
        format!("{} stops loaded", stops.len()),
    ));

    let defaults = GameConfig::default();
    results.push(TestResult::new(
        "stops_match_defaults",
        stops == defaults.bus_stops,
        "shipped stop table equals the built-in one",
    ));

    let half = defaults.road.half_length();
    let off_road: Vec<_> = stops.iter().filter(|s| s.z.abs() > half).collect();
    results.push(TestResult::new(
        "stops_on_road",
        off_road.is_empty(),
        format!("{} stops beyond ±{} m", off_road.len(), half),
    ));

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(LoadError::Invalid(errors)) => {
                for e in &errors {
                    results.push(TestResult::new("config_valid", false, format!("{}", e)));
                }
                return None;
            }
            Err(e) => {
                results.push(TestResult::new(
                    "config_load",
                    false,
                    format!("{}: {}", path.display(), e),
                ));
                return None;
            }
        },
        None => GameConfig {
            bus_stops: stops,
            ..defaults
        },
    };

    let errors = validate_config(&config);
    results.push(TestResult::new(
        "config_valid",
        errors.is_empty(),
        format!("{} validation errors", errors.len()),
    ));
    Some(config)
}

// ── 2. Driver session ───────────────────────────────────────────────────

fn validate_driver_session(config: &GameConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Driver Session ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::with_seed(config.clone(), seed);
    let decisions = (0..512).map(|i| if i % 2 == 0 { Decision::Pay } else { Decision::Deny });
    let mut presentation = RecordingPresentation::with_decisions(decisions);
    let mut player = StdRng::seed_from_u64(seed ^ 0x5eed);

    let floor = config.economy.cash_floor;
    let mut first_violation: Option<String> = None;
    let mut max_speed = 0.0f32;
    let mut render_error = None;

    // Five simulated minutes at 60 Hz.
    for frame in 0..(60 * 300) {
        let input = ControlInput {
            accelerate: player.gen_bool(0.7),
            brake: player.gen_bool(0.1),
            steer_left: player.gen_bool(0.15),
            steer_right: player.gen_bool(0.15),
            handbrake: false,
        };
        if let Err(e) = engine.run_frame(&input, DT, &mut presentation) {
            render_error = Some(e.to_string());
            break;
        }
        max_speed = max_speed.max(engine.state().vehicle.speed);
        if first_violation.is_none() {
            let problems = engine.state().invariant_violations(floor);
            if !problems.is_empty() {
                first_violation = Some(format!("frame {}: {:?}", frame, problems));
            }
        }
    }

    results.push(TestResult::new(
        "driver_renders",
        render_error.is_none(),
        render_error.unwrap_or_else(|| format!("{} frames", presentation.frames_rendered)),
    ));
    results.push(TestResult::new(
        "driver_invariants",
        first_violation.is_none(),
        first_violation.unwrap_or_else(|| "state stayed in range".into()),
    ));
    results.push(TestResult::new(
        "driver_speed_cap",
        max_speed <= config.vehicle.max_speed,
        format!("top speed {:.2} m/s", max_speed),
    ));

    let state = engine.state();
    let half = config.road.half_length();
    results.push(TestResult::new(
        "driver_on_loop",
        state.vehicle.z.abs() <= half && state.vehicle.x.abs() <= road::pull_over_x(&config.road),
        format!("at ({:.1}, {:.1})", state.vehicle.x, state.vehicle.z),
    ));
    results.push(TestResult::new(
        "driver_prompts_answered",
        engine.pending_encounter().is_none() && !state.is_modal_open,
        format!("{} police prompts", presentation.prompts.len()),
    ));

    print_summary(
        &SessionSummary {
            role: state.role.name().into(),
            seconds: state.clock,
            cash: state.cash,
            fuel: state.fuel,
            passengers: state.passengers,
            encounters: presentation.prompts.len(),
            stops_served: 0,
            messages: presentation.messages.len(),
        },
        verbose,
    );
    results
}

// ── 3. Conductor session ────────────────────────────────────────────────

fn validate_conductor_session(config: &GameConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Conductor Session ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::with_seed(config.clone(), seed);
    let switched = engine.switch_role();
    results.push(TestResult::new(
        "conductor_switch",
        switched == Ok(Role::Conductor) && engine.state().on_route,
        format!("{:?}", switched),
    ));

    let start_cash = engine.state().cash;
    let mut served = 0u32;
    let mut rejected = 0u32;
    let idle = ControlInput::default();

    // Ten simulated minutes, working every stop as soon as the bus halts.
    for _ in 0..(60 * 600) {
        engine.update(&idle, DT);
        if let Some(kind) = engine.state().current_stop {
            match engine.conductor_action(kind) {
                Ok(_) => served += 1,
                Err(_) => rejected += 1,
            }
        }
        if engine.state().fuel < 10.0 && engine.refuel().is_ok() {
            let _ = engine.start_route();
        }
    }
    let events = engine.drain_events();

    let state = engine.state();
    results.push(TestResult::new(
        "conductor_serves_stops",
        served >= 4 && rejected == 0,
        format!("{} stops served, {} rejected", served, rejected),
    ));
    results.push(TestResult::new(
        "conductor_earns",
        state.cash > start_cash,
        format!("KSh {} -> KSh {}", start_cash, state.cash),
    ));
    results.push(TestResult::new(
        "conductor_no_police",
        !events.iter().any(|e| matches!(e, GameEvent::ViolationPrompt(_))),
        "autopilot is never pulled over",
    ));
    results.push(TestResult::new(
        "conductor_capacity",
        state.passengers <= state.max_passengers,
        format!("{}/{} aboard", state.passengers, state.max_passengers),
    ));

    print_summary(
        &SessionSummary {
            role: state.role.name().into(),
            seconds: state.clock,
            cash: state.cash,
            fuel: state.fuel,
            passengers: state.passengers,
            encounters: 0,
            stops_served: served,
            messages: events.len(),
        },
        verbose,
    );
    results
}

// ── 4. Fuel cycle ───────────────────────────────────────────────────────

fn validate_fuel_cycle(config: &GameConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Fuel Cycle ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::with_seed(config.clone(), seed);
    engine.switch_role().ok();
    engine.state_mut().fuel = 0.5;

    let idle = ControlInput::default();
    let mut seconds = 0.0f32;
    while engine.state().on_route && seconds < 120.0 {
        engine.update(&idle, DT);
        if let Some(kind) = engine.state().current_stop {
            let _ = engine.conductor_action(kind);
        }
        seconds += DT;
    }
    let state = engine.state();
    results.push(TestResult::new(
        "fuel_exhaustion_stops_route",
        !state.on_route && state.fuel == 0.0 && state.vehicle.speed == 0.0,
        format!("stopped after {:.1} s", seconds),
    ));

    let restart = engine.start_route();
    results.push(TestResult::new(
        "empty_tank_blocks_start",
        restart == Err(ActionError::TankEmpty),
        format!("{:?}", restart),
    ));

    engine.state_mut().cash = config.economy.refuel_cost - 1;
    let broke = engine.refuel();
    results.push(TestResult::new(
        "refuel_needs_cash",
        matches!(broke, Err(ActionError::InsufficientFunds { .. })) && engine.snapshot().stranded,
        format!("{:?}", broke),
    ));

    engine.new_day();
    let snap = engine.snapshot();
    results.push(TestResult::new(
        "new_day_resets",
        snap.day == 2 && snap.fuel == 100.0 && snap.cash == config.economy.starting_cash,
        format!("day {}, fuel {:.0}, KSh {}", snap.day, snap.fuel, snap.cash),
    ));
    results
}

// ── 5. Police ───────────────────────────────────────────────────────────

fn validate_police(config: &GameConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Police ---");
    let mut results = Vec::new();

    let mut forced = config.clone();
    forced.enforcement.encounter_chance = 1.0;
    forced.obstacles.clear();
    forced.traffic.max_vehicles = 0;

    let mut engine = SimulationEngine::with_seed(forced, seed);
    {
        let state = engine.state_mut();
        state.traffic_light = SignalState::Red;
        state.vehicle.z = config.road.intersection_z - 2.0;
        state.vehicle.speed = 5.0;
    }
    engine.update(&ControlInput::default(), DT);
    let fine = engine.pending_encounter().map(|e| e.fine);
    results.push(TestResult::new(
        "red_light_encounter",
        fine.is_some() && engine.state().is_modal_open,
        format!("fine {:?}", fine),
    ));

    let clock = engine.clock();
    let throttle = ControlInput {
        accelerate: true,
        ..Default::default()
    };
    for _ in 0..120 {
        engine.update(&throttle, DT);
    }
    results.push(TestResult::new(
        "modal_pauses_world",
        engine.clock() == clock && engine.state().is_modal_open,
        format!("clock {:.3} s", engine.clock()),
    ));

    let cash = engine.state().cash;
    let outcome = engine.resolve_encounter(Decision::Pay);
    let paid = fine.map_or(false, |f| {
        outcome == Ok(Outcome::Paid { fine: f }) && engine.state().cash == cash - f
    });
    results.push(TestResult::new(
        "bribe_paid",
        paid && !engine.state().is_modal_open,
        format!("{:?}", outcome),
    ));

    let again = engine.resolve_encounter(Decision::Deny);
    results.push(TestResult::new(
        "single_resolution",
        again == Err(ActionError::NoEncounter),
        format!("{:?}", again),
    ));
    results
}

// ── 6. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(config: &GameConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Determinism ---");

    let run = || {
        let mut engine = SimulationEngine::with_seed(config.clone(), seed);
        let mut player = StdRng::seed_from_u64(seed);
        for _ in 0..(60 * 60) {
            let input = ControlInput {
                accelerate: player.gen_bool(0.6),
                steer_left: player.gen_bool(0.1),
                steer_right: player.gen_bool(0.1),
                ..Default::default()
            };
            engine.update(&input, DT);
            if engine.pending_encounter().is_some() {
                let _ = engine.resolve_encounter(Decision::Deny);
            }
        }
        engine.snapshot()
    };

    let (a, b) = (run(), run());
    vec![TestResult::new(
        "seeded_replay",
        a == b,
        format!("z {:.3} / {:.3}, KSh {} / {}", a.z, b.z, a.cash, b.cash),
    )]
}
