use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub optimizer_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub store_url: String,
    pub optimizer_url: String,
    pub router_url: String,
    pub geocoder_url: String,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub geocode_limit: usize,
    pub default_shipment_weight_kg: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 5000)?,
            optimizer_port: parse_or_default("OPTIMIZER_PORT", 5001)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            store_url: string_or_default("STORE_URL", "http://127.0.0.1:5000"),
            optimizer_url: string_or_default("OPTIMIZER_URL", "http://127.0.0.1:5001"),
            router_url: string_or_default("ROUTER_URL", "https://router.project-osrm.org"),
            geocoder_url: string_or_default(
                "GEOCODER_URL",
                "https://nominatim.openstreetmap.org",
            ),
            http_timeout: Duration::from_millis(parse_or_default("HTTP_TIMEOUT_MS", 5_000)?),
            poll_interval: Duration::from_millis(parse_or_default("POLL_INTERVAL_MS", 3_000)?),
            debounce: Duration::from_millis(parse_or_default("DEBOUNCE_MS", 500)?),
            geocode_limit: parse_or_default("GEOCODE_LIMIT", 5)?,
            default_shipment_weight_kg: parse_or_default("DEFAULT_SHIPMENT_WEIGHT_KG", 1_000.0)?,
        })
    }
}

fn string_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
