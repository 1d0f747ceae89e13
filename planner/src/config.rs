use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_PROFILE: &str = "cycling-regular";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SPEED_KMH: f64 = 15.0;
const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub ors_api_key: String,
    pub ors_base_url: String,
    pub profile: String,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    /// Average riding speed used for the duration estimate.
    pub cycling_speed_kmh: f64,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ors_api_key = lookup("ORS_API_KEY").unwrap_or_default();
        if ors_api_key.is_empty() {
            tracing::warn!("ORS_API_KEY is not set, routing requests will be rejected");
        }

        let ors_base_url = lookup("ORS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_ORS_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let profile = lookup("ORS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let timeout_secs: u64 = parse_or(&lookup, "ORS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let data_dir = lookup("PLANNER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let cycling_speed_kmh: f64 = parse_or(&lookup, "CYCLING_SPEED_KMH", DEFAULT_SPEED_KMH)?;
        if !(cycling_speed_kmh.is_finite() && cycling_speed_kmh > 0.0) {
            return Err(ConfigError::Invalid {
                key: "CYCLING_SPEED_KMH",
                value: cycling_speed_kmh.to_string(),
                reason: "speed must be a positive number".into(),
            });
        }

        let bind_addr: SocketAddr = match lookup("PLANNER_ADDR") {
            Some(raw) => parse_value("PLANNER_ADDR", &raw)?,
            None => parse_value("PLANNER_ADDR", DEFAULT_ADDR)?,
        };

        Ok(Self {
            ors_api_key,
            ors_base_url,
            profile,
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir,
            cycling_speed_kmh,
            bind_addr,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}
