//! Application configuration loaded from environment variables.

use fair_draw::{LotteryConfig, PrizeColor};

use crate::errors::{Result, ServerError};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How many times each color is drawn per cycle
    pub draws_per_color: u32,
    /// Whether clients should play the reveal animation
    pub enable_animations: bool,
    /// Nominal spin length of the reveal, in milliseconds
    pub animation_duration_ms: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./fair_draw.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid API_PORT".to_string()))?,
            draws_per_color: env_var("DRAWS_PER_COLOR")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid DRAWS_PER_COLOR".to_string()))?,
            enable_animations: env_var("ENABLE_ANIMATIONS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid ENABLE_ANIMATIONS".to_string()))?,
            animation_duration_ms: env_var("ANIMATION_DURATION_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid ANIMATION_DURATION_MS".to_string()))?,
        })
    }

    /// Draw settings for a state created on first run.
    pub fn lottery_config(&self) -> Result<LotteryConfig> {
        let config = LotteryConfig {
            draws_per_cycle: self.draws_per_color.checked_mul(PrizeColor::COUNT).ok_or_else(|| {
                ServerError::Config(format!(
                    "DRAWS_PER_COLOR {} is too large for {} colors",
                    self.draws_per_color,
                    PrizeColor::COUNT
                ))
            })?,
            draws_per_color: self.draws_per_color,
            enable_animations: self.enable_animations,
            animation_duration: self.animation_duration_ms,
        };
        config.validate()?;
        Ok(config)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ServerError::Config(format!("Missing env var: {key}")))
}
