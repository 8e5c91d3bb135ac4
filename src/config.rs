use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub search_radius_km: f64,
    pub geocoder_base_url: String,
    pub geocode_timeout_ms: u64,
    pub movement_queue_size: usize,
    pub event_buffer_size: usize,
    pub movement_steps: u32,
    pub movement_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            search_radius_km: parse_or_default("SEARCH_RADIUS_KM", 5.0)?,
            geocoder_base_url: env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocode_timeout_ms: parse_or_default("GEOCODE_TIMEOUT_MS", 3000)?,
            movement_queue_size: parse_or_default("MOVEMENT_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            movement_steps: parse_or_default("MOVEMENT_STEPS", 5)?,
            movement_interval_ms: parse_or_default("MOVEMENT_INTERVAL_MS", 5000)?,
        })
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    pub fn movement_interval(&self) -> Duration {
        Duration::from_millis(self.movement_interval_ms)
    }
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
