//! Loading a [`GameConfig`] override file.
//!
//! The file is JSON; any field it leaves out keeps its default. The result
//! is validated before it is handed back.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub use matatu_logic::config::*;

/// Error loading a configuration file.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(Vec<ConfigError>),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e)
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO error: {}", e),
            LoadError::Json(e) => write!(f, "JSON error: {}", e),
            LoadError::Invalid(errors) => {
                write!(f, "invalid configuration: ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Json(e) => Some(e),
            LoadError::Invalid(_) => None,
        }
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<GameConfig, LoadError> {
    let file = File::open(path.as_ref())?;
    let config = read_config(BufReader::new(file))?;
    log::info!("Loaded configuration from {}", path.as_ref().display());
    Ok(config)
}

/// Parse and validate a configuration from any reader.
pub fn read_config<R: Read>(reader: R) -> Result<GameConfig, LoadError> {
    let config: GameConfig = serde_json::from_reader(reader)?;
    check(config)
}

/// Parse and validate a configuration held in memory.
pub fn parse_config(json: &str) -> Result<GameConfig, LoadError> {
    let config: GameConfig = serde_json::from_str(json)?;
    check(config)
}

/// Parse a bare stop table (a JSON array of stops).
pub fn parse_bus_stops(json: &str) -> Result<Vec<BusStopSpec>, LoadError> {
    let stops: Vec<BusStopSpec> = serde_json::from_str(json)?;
    let config = GameConfig {
        bus_stops: stops,
        ..GameConfig::default()
    };
    Ok(check(config)?.bus_stops)
}

fn check(config: GameConfig) -> Result<GameConfig, LoadError> {
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(LoadError::Invalid(errors))
    }
}
