//! Game configuration - every tunable constant in one serializable tree.
//!
//! Defaults reproduce the shipped game: a 1.2 km looped Nairobi road with a
//! single signalised crossing, six bus stops and a 14-seat matatu.
//! All structs are `#[serde(default)]`, so a JSON override file only needs
//! to name the values it changes.
//!
//! ```
//! use matatu_logic::config::{validate_config, GameConfig};
//!
//! let config = GameConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert_eq!(config.bus_stops.len(), 6);
//! ```

use serde::{Deserialize, Serialize};

/// Top-level configuration for one simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub vehicle: VehicleConfig,
    pub road: RoadConfig,
    pub traffic: TrafficConfig,
    pub economy: EconomyConfig,
    pub enforcement: EnforcementConfig,
    pub signal: SignalConfig,
    pub bus_stops: Vec<BusStopSpec>,
    pub fuel_stations: Vec<FuelStationSpec>,
    pub obstacles: Vec<ObstacleSpec>,
    /// RNG seed (None = seeded from entropy).
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleConfig::default(),
            road: RoadConfig::default(),
            traffic: TrafficConfig::default(),
            economy: EconomyConfig::default(),
            enforcement: EnforcementConfig::default(),
            signal: SignalConfig::default(),
            bus_stops: default_bus_stops(),
            fuel_stations: vec![
                FuelStationSpec {
                    name: "Total Ngong Road".to_string(),
                    x: -5.0,
                    z: 240.0,
                },
                FuelStationSpec {
                    name: "Rubis Mombasa Road".to_string(),
                    x: -5.0,
                    z: -300.0,
                },
            ],
            obstacles: vec![
                ObstacleSpec {
                    x: -4.5,
                    z: 200.0,
                    width: 1.5,
                    length: 1.5,
                },
                ObstacleSpec {
                    x: -4.0,
                    z: -220.0,
                    width: 2.0,
                    length: 1.0,
                },
            ],
            seed: None,
        }
    }
}

/// Minibus dynamics (bicycle model). Units: meters, seconds, radians.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Distance between axles.
    pub wheelbase: f32,
    pub max_steer_angle: f32,
    /// How fast the wheel turns while a steer key is held (rad/s).
    pub steer_rate: f32,
    /// Per-tick multiplier pulling the wheel back to center.
    pub steer_return: f32,
    pub acceleration: f32,
    pub brake_decel: f32,
    pub handbrake_decel: f32,
    pub max_speed: f32,
    pub reverse_max: f32,
    /// Quadratic aero drag coefficient (decel = drag * v²).
    pub drag_coeff: f32,
    /// Constant rolling resistance decel while coasting.
    pub rolling_resistance: f32,
    /// Below this |speed| the vehicle snaps to rest.
    pub min_speed: f32,
    /// Upper bound on the integration step.
    pub max_dt: f32,
    pub length: f32,
    pub width: f32,
    /// Fixed ride height of the body center above the ground.
    pub ground_offset: f32,
    pub roll_gain: f32,
    pub pitch_accel: f32,
    pub pitch_brake: f32,
    /// First-order smoothing rate for roll/pitch (1/s).
    pub body_smoothing: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            wheelbase: 5.0,
            max_steer_angle: 0.55,
            steer_rate: 2.2,
            steer_return: 0.92,
            acceleration: 2.8,
            brake_decel: 7.0,
            handbrake_decel: 11.0,
            max_speed: 15.0,
            reverse_max: 3.0,
            drag_coeff: 0.0035,
            rolling_resistance: 0.3,
            min_speed: 0.01,
            max_dt: 0.1,
            length: 10.0,
            width: 2.5,
            ground_offset: 1.5,
            roll_gain: 0.12,
            pitch_accel: -0.03,
            pitch_brake: 0.05,
            body_smoothing: 6.0,
        }
    }
}

/// Looped road and crossing geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    pub width: f32,
    pub length: f32,
    pub intersection_z: f32,
    pub intersection_width: f32,
    /// The player teleports to the far end this far before the road end.
    pub wrap_margin: f32,
    /// Distance from the curb the pull-over lane sits at.
    pub pull_over_inset: f32,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            width: 14.0,
            length: 1200.0,
            intersection_z: 0.0,
            intersection_width: 12.0,
            wrap_margin: 30.0,
            pull_over_inset: 2.0,
        }
    }
}

impl RoadConfig {
    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }
}

/// NPC traffic behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub nominal_speed: f32,
    /// Per-vehicle target speed is nominal ± this fraction.
    pub speed_jitter: f32,
    pub brake_distance: f32,
    /// Extra look-ahead beyond the brake distance where red is noticed.
    pub brake_lookahead: f32,
    /// Minimum fraction of target speed kept while braking for red.
    pub brake_floor: f32,
    pub spawn_interval_ms: u32,
    pub lane_offset: f32,
    /// Spawn this far beyond the road end.
    pub spawn_margin: f32,
    /// Vehicles this far past an end are recycled to the other end.
    pub wrap_margin: f32,
    pub max_vehicles: usize,
    pub car_length: f32,
    pub car_width: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            nominal_speed: 8.0,
            speed_jitter: 0.15,
            brake_distance: 15.0,
            brake_lookahead: 5.0,
            brake_floor: 0.3,
            spawn_interval_ms: 4000,
            lane_offset: 2.5,
            spawn_margin: 10.0,
            wrap_margin: 25.0,
            max_vehicles: 24,
            car_length: 4.0,
            car_width: 1.8,
        }
    }
}

/// Cash, fuel and passenger economy. Currency is Kenyan shillings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub starting_cash: i64,
    pub cash_floor: i64,
    pub goal_cash: i64,
    pub max_passengers: u32,
    pub pick_up_fare: i64,
    /// Inclusive range of passengers boarding at a stop.
    pub boarding_min: u32,
    pub boarding_max: u32,
    /// Conductor trickle per economic tick: base + [0, spread).
    pub passive_fare_base: i64,
    pub passive_fare_spread: i64,
    pub economic_tick_ms: u32,
    pub fuel_burn_rate: f32,
    pub refuel_cost: i64,
    pub maintenance_cost: i64,
    /// Economic ticks between maintenance deductions.
    pub maintenance_interval: u32,
    pub arrival_radius: f32,
    /// Fraction of max speed the autopilot cruises at without a target.
    pub autopilot_cruise: f32,
    pub autopilot_accel: f32,
    pub autopilot_max_turn: f32,
    pub autopilot_max_dt: f32,
    /// Chance per frame of a small heading wobble while cruising.
    pub autopilot_jitter_chance: f64,
    pub autopilot_jitter: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_cash: 1000,
            cash_floor: -2000,
            goal_cash: 10_000,
            max_passengers: 14,
            pick_up_fare: 50,
            boarding_min: 3,
            boarding_max: 7,
            passive_fare_base: 5,
            passive_fare_spread: 5,
            economic_tick_ms: 500,
            fuel_burn_rate: 0.03,
            refuel_cost: 500,
            maintenance_cost: 100,
            maintenance_interval: 120,
            arrival_radius: 10.0,
            autopilot_cruise: 0.6,
            autopilot_accel: 1.8,
            autopilot_max_turn: 0.6,
            autopilot_max_dt: 0.05,
            autopilot_jitter_chance: 0.008,
            autopilot_jitter: 0.02,
        }
    }
}

/// Police encounters and collision penalties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub red_light_fine: i64,
    pub speeding_fine: i64,
    /// Random surcharge in [0, band) added to the base fine.
    pub fine_band: i64,
    pub encounter_chance: f64,
    /// Chance a denied bribe ends in escape rather than detention.
    pub escape_chance: f64,
    pub detention_multiplier: i64,
    pub cooldown_secs: f32,
    pub red_light_min_speed: f32,
    pub speed_limit_kmh: f32,
    pub speeding_grace_secs: f32,
    /// Below this cash the officer waves the matatu through.
    pub too_broke_cash: i64,
    pub obstacle_penalty: i64,
    pub obstacle_speed_factor: f32,
    pub traffic_speed_factor: f32,
    /// Below this speed an NPC bump brings the bus to rest.
    pub traffic_stop_speed: f32,
    pub traffic_cooldown_secs: f32,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            red_light_fine: 200,
            speeding_fine: 300,
            fine_band: 200,
            encounter_chance: 0.45,
            escape_chance: 0.5,
            detention_multiplier: 2,
            cooldown_secs: 50.0,
            red_light_min_speed: 0.5,
            speed_limit_kmh: 50.0,
            speeding_grace_secs: 2.0,
            too_broke_cash: 150,
            obstacle_penalty: 50,
            obstacle_speed_factor: 0.3,
            traffic_speed_factor: 0.5,
            traffic_stop_speed: 0.5,
            traffic_cooldown_secs: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub period_ms: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { period_ms: 12_000 }
    }
}

/// A bus stop along the loop. The pull-over `x` is derived from the road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStopSpec {
    pub id: String,
    pub name: String,
    pub base_fare: i64,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelStationSpec {
    pub name: String,
    pub x: f32,
    pub z: f32,
}

/// A static roadside obstacle (axis-aligned footprint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub x: f32,
    pub z: f32,
    pub width: f32,
    pub length: f32,
}

/// The six stops of the shipped route.
pub fn default_bus_stops() -> Vec<BusStopSpec> {
    [
        ("cbd", "CBD", 150, 80.0),
        ("kibera", "Kibera", 100, -60.0),
        ("thika", "Thika Road", 200, 150.0),
        ("embakasi", "Embakasi", 120, -120.0),
        ("westlands", "Westlands", 80, 30.0),
        ("industrial", "Industrial", 90, -30.0),
    ]
    .into_iter()
    .map(|(id, name, base_fare, z)| BusStopSpec {
        id: id.to_string(),
        name: name.to_string(),
        base_fare,
        z,
    })
    .collect()
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A length, width, rate or period that must be positive is not.
    NonPositive(&'static str),
    /// A probability outside [0, 1].
    InvalidProbability(&'static str, f64),
    /// No bus stops; the conductor loop has nowhere to go.
    NoBusStops,
    DuplicateStopName(String),
    /// A stop lies outside the looped road.
    StopOffRoad(String),
    /// Cash floor above the starting cash.
    FloorAboveStart { floor: i64, start: i64 },
    /// Goal not above the starting cash.
    GoalNotAboveStart { goal: i64, start: i64 },
    /// Boarding range is empty.
    InvalidBoardingRange { min: u32, max: u32 },
    /// The pull-over lane would sit outside the road edge.
    PullOverOffRoad { inset: f32, half_width: f32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositive(field) => write!(f, "{} must be positive", field),
            ConfigError::InvalidProbability(field, p) => {
                write!(f, "{} must be within [0, 1], got {}", field, p)
            }
            ConfigError::NoBusStops => write!(f, "at least one bus stop is required"),
            ConfigError::DuplicateStopName(name) => write!(f, "duplicate bus stop name '{}'", name),
            ConfigError::StopOffRoad(name) => write!(f, "bus stop '{}' lies off the road", name),
            ConfigError::FloorAboveStart { floor, start } => {
                write!(f, "cash floor {} is above starting cash {}", floor, start)
            }
            ConfigError::GoalNotAboveStart { goal, start } => {
                write!(f, "goal {} must exceed starting cash {}", goal, start)
            }
            ConfigError::InvalidBoardingRange { min, max } => {
                write!(f, "boarding range {}..={} is empty", min, max)
            }
            ConfigError::PullOverOffRoad { inset, half_width } => write!(
                f,
                "pull-over inset {} must be below half the road width {}",
                inset, half_width
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &GameConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let positives = [
        ("vehicle.wheelbase", config.vehicle.wheelbase),
        ("vehicle.max_speed", config.vehicle.max_speed),
        ("vehicle.reverse_max", config.vehicle.reverse_max),
        ("vehicle.max_dt", config.vehicle.max_dt),
        ("vehicle.min_speed", config.vehicle.min_speed),
        ("road.width", config.road.width),
        ("road.length", config.road.length),
        ("traffic.nominal_speed", config.traffic.nominal_speed),
        ("traffic.brake_distance", config.traffic.brake_distance),
        ("economy.arrival_radius", config.economy.arrival_radius),
        ("economy.autopilot_max_dt", config.economy.autopilot_max_dt),
    ];
    for (field, value) in positives {
        if value <= 0.0 {
            errors.push(ConfigError::NonPositive(field));
        }
    }
    if config.signal.period_ms == 0 {
        errors.push(ConfigError::NonPositive("signal.period_ms"));
    }
    if config.economy.economic_tick_ms == 0 {
        errors.push(ConfigError::NonPositive("economy.economic_tick_ms"));
    }
    if config.traffic.spawn_interval_ms == 0 {
        errors.push(ConfigError::NonPositive("traffic.spawn_interval_ms"));
    }
    if config.economy.maintenance_interval == 0 {
        errors.push(ConfigError::NonPositive("economy.maintenance_interval"));
    }
    if config.economy.max_passengers == 0 {
        errors.push(ConfigError::NonPositive("economy.max_passengers"));
    }

    let probabilities = [
        ("enforcement.encounter_chance", config.enforcement.encounter_chance),
        ("enforcement.escape_chance", config.enforcement.escape_chance),
        ("economy.autopilot_jitter_chance", config.economy.autopilot_jitter_chance),
    ];
    for (field, p) in probabilities {
        if !(0.0..=1.0).contains(&p) {
            errors.push(ConfigError::InvalidProbability(field, p));
        }
    }

    let half_width = config.road.width / 2.0;
    if config.road.width > 0.0 && config.road.pull_over_inset >= half_width {
        errors.push(ConfigError::PullOverOffRoad {
            inset: config.road.pull_over_inset,
            half_width,
        });
    }

    if config.bus_stops.is_empty() {
        errors.push(ConfigError::NoBusStops);
    }
    let half = config.road.half_length();
    for (i, stop) in config.bus_stops.iter().enumerate() {
        if config.bus_stops[..i].iter().any(|s| s.name == stop.name) {
            errors.push(ConfigError::DuplicateStopName(stop.name.clone()));
        }
        if stop.z.abs() > half {
            errors.push(ConfigError::StopOffRoad(stop.name.clone()));
        }
    }

    let eco = &config.economy;
    if eco.cash_floor > eco.starting_cash {
        errors.push(ConfigError::FloorAboveStart {
            floor: eco.cash_floor,
            start: eco.starting_cash,
        });
    }
    if eco.goal_cash <= eco.starting_cash {
        errors.push(ConfigError::GoalNotAboveStart {
            goal: eco.goal_cash,
            start: eco.starting_cash,
        });
    }
    if eco.boarding_min > eco.boarding_max {
        errors.push(ConfigError::InvalidBoardingRange {
            min: eco.boarding_min,
            max: eco.boarding_max,
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&GameConfig::default()).is_empty());
    }

    #[test]
    fn test_default_stop_table() {
        let stops = default_bus_stops();
        let cbd = stops.iter().find(|s| s.name == "CBD").unwrap();
        assert_eq!(cbd.base_fare, 150);
        assert_eq!(cbd.z, 80.0);
    }

    #[test]
    fn test_duplicate_stop_rejected() {
        let mut config = GameConfig::default();
        let dup = config.bus_stops[0].clone();
        config.bus_stops.push(dup);
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::DuplicateStopName("CBD".into())));
    }

    #[test]
    fn test_empty_stops_rejected() {
        let mut config = GameConfig::default();
        config.bus_stops.clear();
        assert_eq!(validate_config(&config), vec![ConfigError::NoBusStops]);
    }

    #[test]
    fn test_bad_probability_rejected() {
        let mut config = GameConfig::default();
        config.enforcement.encounter_chance = 1.5;
        let errors = validate_config(&config);
        assert!(matches!(
            errors[0],
            ConfigError::InvalidProbability("enforcement.encounter_chance", _)
        ));
    }

    #[test]
    fn test_floor_above_start_rejected() {
        let mut config = GameConfig::default();
        config.economy.cash_floor = 5000;
        assert!(validate_config(&config)
            .iter()
            .any(|e| matches!(e, ConfigError::FloorAboveStart { .. })));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = GameConfig::default();
        config.road.length = 0.0;
        config.signal.period_ms = 0;
        config.economy.boarding_min = 9;
        // road.length = 0 also puts every stop off-road.
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::NonPositive("road.length")));
        assert!(errors.contains(&ConfigError::NonPositive("signal.period_ms")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidBoardingRange { .. })));
    }

    #[test]
    fn test_narrow_road_rejected() {
        let mut config = GameConfig::default();
        config.road.width = 3.0;
        assert_eq!(
            validate_config(&config),
            vec![ConfigError::PullOverOffRoad {
                inset: 2.0,
                half_width: 1.5
            }]
        );
    }

    #[test]
    fn test_negative_autopilot_step_rejected() {
        let mut config = GameConfig::default();
        config.economy.autopilot_max_dt = -0.05;
        assert_eq!(
            validate_config(&config),
            vec![ConfigError::NonPositive("economy.autopilot_max_dt")]
        );
    }

    #[test]
    fn test_partial_json_override() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "economy": { "starting_cash": 50 }, "seed": 7 }"#).unwrap();
        assert_eq!(config.economy.starting_cash, 50);
        assert_eq!(config.economy.max_passengers, 14);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.bus_stops.len(), 6);
    }

    #[test]
    fn test_error_display() {
        let e = ConfigError::NonPositive("road.width");
        assert_eq!(e.to_string(), "road.width must be positive");
    }
}
