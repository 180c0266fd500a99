use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub backend_url: String,
    pub geocode_url: String,
    pub directions_url: String,
    pub maps_api_key: String,
    pub request_timeout_secs: u64,
    pub store_path: String,
    pub event_buffer_size: usize,
    pub device_fix: Option<GeoPoint>,
    pub session: SessionSettings,
}

/// Timings and pricing used by the session controller.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub presence_interval: Duration,
    pub offer_poll_interval: Duration,
    pub offer_min_spacing: Duration,
    pub reject_cooldown: Duration,
    pub rate_per_km: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            presence_interval: Duration::from_secs(90),
            offer_poll_interval: Duration::from_secs(12),
            offer_min_spacing: Duration::from_secs(5),
            reject_cooldown: Duration::from_millis(2_000),
            rate_per_km: 100.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let presence_secs: u64 = parse_or_default("PRESENCE_INTERVAL_SECS", 90)?;
        if !(60..=120).contains(&presence_secs) {
            return Err(AppError::Internal(format!(
                "PRESENCE_INTERVAL_SECS must be within 60..=120, got {presence_secs}"
            )));
        }

        let rate_per_km: f64 = parse_or_default("RATE_PER_KM", 100.0)?;
        if !rate_per_km.is_finite() || rate_per_km < 0.0 {
            return Err(AppError::Internal(format!(
                "RATE_PER_KM must be a non-negative number, got {rate_per_km}"
            )));
        }

        let device_fix = match (env::var("DEVICE_LAT"), env::var("DEVICE_LNG")) {
            (Ok(_), Ok(_)) => {
                let lat = parse_or_default("DEVICE_LAT", 0.0)?;
                let lng = parse_or_default("DEVICE_LNG", 0.0)?;
                Some(GeoPoint::new(lat, lng).ok_or_else(|| {
                    AppError::Internal(format!("invalid DEVICE_LAT/DEVICE_LNG: {lat},{lng}"))
                })?)
            }
            _ => None,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            backend_url: required("BACKEND_URL")?,
            geocode_url: env::var("GEOCODE_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/geocode/json".to_string()
            }),
            directions_url: env::var("DIRECTIONS_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/directions/json".to_string()
            }),
            maps_api_key: env::var("MAPS_API_KEY").unwrap_or_default(),
            request_timeout_secs: parse_or_default("REQUEST_TIMEOUT_SECS", 15)?,
            store_path: env::var("STORE_PATH")
                .unwrap_or_else(|_| "driver-session.json".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 256)?,
            device_fix,
            session: SessionSettings {
                presence_interval: Duration::from_secs(presence_secs),
                offer_poll_interval: Duration::from_secs(parse_or_default(
                    "OFFER_POLL_INTERVAL_SECS",
                    12,
                )?),
                offer_min_spacing: Duration::from_secs(parse_or_default(
                    "OFFER_MIN_SPACING_SECS",
                    5,
                )?),
                reject_cooldown: Duration::from_millis(parse_or_default(
                    "REJECT_COOLDOWN_MS",
                    2_000,
                )?),
                rate_per_km,
            },
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Internal(format!("{key} must be set")))
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
