use std::collections::HashMap;
use thiserror::Error;

use crate::domain::DEFAULT_ROUND_DURATION_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Fallback round length for fights registered without one.
    pub default_round_duration_secs: u32,
    /// Actor name recorded on audit entries written by internal jobs.
    pub system_actor: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_round_duration_secs = env_map
            .get("ROUND_DURATION_SECS")
            .map(|s| s.as_str())
            .unwrap_or("")
            .parse::<u32>()
            .unwrap_or(DEFAULT_ROUND_DURATION_SECS);
        if default_round_duration_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ROUND_DURATION_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let system_actor = env_map
            .get("SYSTEM_ACTOR")
            .cloned()
            .unwrap_or_else(|| "system".to_string());

        Ok(Config {
            port,
            database_path,
            default_round_duration_secs,
            system_actor,
        })
    }
}
