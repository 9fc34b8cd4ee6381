use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::module::locast::Geo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunerConfig {
    pub username: String,

    pub password: String,

    /// "LAT,LON" override for a single market binding
    #[serde(default)]
    pub override_location: Option<String>,

    /// Zip codes, one market binding each
    #[serde(default)]
    pub override_zipcodes: Vec<String>,

    #[serde(default = "default_cache_stations")]
    pub cache_stations: bool,

    /// Station cache refresh interval in seconds
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: u64,

    /// Days of guide data requested per station fetch
    #[serde(default = "default_days")]
    pub days: u32,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_stations() -> bool {
    true
}

fn default_cache_timeout() -> u64 {
    3600
}

fn default_days() -> u32 {
    8
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TunerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file '{}'", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: TunerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_timeout == 0 {
            bail!("cache_timeout must be at least 1 second");
        }
        if self.days == 0 {
            bail!("days must be at least 1");
        }
        Ok(())
    }

    pub fn cache_interval(&self) -> Duration {
        Duration::from_secs(self.cache_timeout)
    }

    /// Locations to bind, in priority order: explicit coordinates, then zip
    /// codes, then the caller's IP address.
    pub fn geos(&self) -> Result<Vec<Geo>> {
        if let Some(location) = &self.override_location {
            let (lat, lon) = location
                .split_once(',')
                .with_context(|| format!("override_location '{}' is not LAT,LON", location))?;
            let latitude: f64 = lat
                .trim()
                .parse()
                .with_context(|| format!("Invalid latitude '{}'", lat))?;
            let longitude: f64 = lon
                .trim()
                .parse()
                .with_context(|| format!("Invalid longitude '{}'", lon))?;
            return Ok(vec![Geo::Coordinates { latitude, longitude }]);
        }

        if !self.override_zipcodes.is_empty() {
            return Ok(self
                .override_zipcodes
                .iter()
                .map(|z| Geo::Zipcode(z.trim().to_string()))
                .collect());
        }

        Ok(vec![Geo::Ip])
    }
}
