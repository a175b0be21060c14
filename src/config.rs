use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const APP_NAME: &str = "satnow";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_DB_PATH: &str = "./.satnow.sql3";

/// Command line surface.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about = "Rank orbital objects by range from a ground observer")]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Observer latitude in degrees
    #[arg(long, default_value_t = 0.0)]
    pub lat: f64,

    /// Observer longitude in degrees
    #[arg(long, default_value_t = 0.0)]
    pub lon: f64,

    /// Observer altitude in meters
    #[arg(long, default_value_t = 0.0)]
    pub alt: f64,

    /// Text file listing TLE sources (paths or URLs), one per line
    #[arg(short, long, value_name = "FILE")]
    pub update: Option<PathBuf>,

    /// Path to the TLE database
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    pub db: String,

    /// Output additional data (for debugging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable the interactive terminal view
    #[arg(short, long)]
    pub gui: bool,

    /// Milliseconds between refreshes of the interactive view (negative: never)
    #[arg(short, long, value_name = "MSEC", default_value_t = -1)]
    pub refresh: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid coordinates (latitude: {lat}, longitude: {lon})")]
    Coordinates { lat: f64, lon: f64 },
    #[error("invalid altitude: {0}")]
    Altitude(f64),
    #[error("the database path must not be empty (see --help)")]
    EmptyDbPath,
}

/// Fixed ground position of the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverPosition {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl ObserverPosition {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, ConfigError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::Coordinates {
                lat: latitude,
                lon: longitude,
            });
        }
        if !altitude.is_finite() {
            return Err(ConfigError::Altitude(altitude));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }

    /// Degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Meters.
    pub fn altitude(&self) -> f64 {
        self.altitude
    }
}

/// How long the interactive view waits for a key before recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshInterval {
    Every(Duration),
    Never,
}

impl RefreshInterval {
    pub fn from_millis(ms: i64) -> Self {
        match u64::try_from(ms) {
            Ok(ms) => RefreshInterval::Every(Duration::from_millis(ms)),
            Err(_) => RefreshInterval::Never,
        }
    }
}

/// Validated runtime configuration.
#[derive(Debug)]
pub struct Config {
    pub observer: ObserverPosition,
    pub db_path: PathBuf,
    pub sources: Option<PathBuf>,
    pub verbose: bool,
    pub interactive: bool,
    pub refresh: RefreshInterval,
}

impl Config {
    /// Checks run before any I/O takes place.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let observer = ObserverPosition::new(cli.lat, cli.lon, cli.alt)?;
        if cli.db.trim().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        Ok(Self {
            observer,
            db_path: PathBuf::from(cli.db),
            sources: cli.update,
            verbose: cli.verbose,
            interactive: cli.gui,
            refresh: RefreshInterval::from_millis(cli.refresh),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec![APP_NAME];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_cli(cli(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.refresh, RefreshInterval::Never);
        assert!(!config.interactive);
        assert!(config.sources.is_none());
    }

    #[test]
    fn test_negative_coordinates_parse() {
        let config =
            Config::from_cli(cli(&["--lat", "-33.9", "--lon=-118.4", "--alt", "30"])).unwrap();
        assert_eq!(config.observer.latitude(), -33.9);
        assert_eq!(config.observer.longitude(), -118.4);
        assert_eq!(config.observer.altitude(), 30.0);
    }

    #[test]
    fn test_latitude_out_of_range() {
        let err = Config::from_cli(cli(&["--lat", "999"])).unwrap_err();
        assert_eq!(err, ConfigError::Coordinates { lat: 999.0, lon: 0.0 });
    }

    #[test]
    fn test_longitude_out_of_range() {
        assert!(Config::from_cli(cli(&["--lon", "-180.5"])).is_err());
        assert!(Config::from_cli(cli(&["--lon", "180"])).is_ok());
    }

    #[test]
    fn test_empty_db_path() {
        let err = Config::from_cli(cli(&["--db", ""])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyDbPath);
    }

    #[test]
    fn test_refresh_interval() {
        let config = Config::from_cli(cli(&["-g", "-r", "500"])).unwrap();
        assert!(config.interactive);
        assert_eq!(
            config.refresh,
            RefreshInterval::Every(Duration::from_millis(500))
        );
        assert_eq!(RefreshInterval::from_millis(-5), RefreshInterval::Never);
    }
}
