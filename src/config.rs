//! Environment configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use crate::error::AppError;
use crate::Result;
use std::env;
use tracing::warn;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
pub const DEFAULT_LAST_MESSAGES: usize = 20;
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub max_tool_rounds: usize,
    pub memory_last_messages: usize,
    pub api_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            memory_last_messages: DEFAULT_LAST_MESSAGES,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match read("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("PORT '{}' is not a valid port: {}", raw, e)))?,
            None => defaults.port,
        };

        let gemini_api_key = read("GEMINI_API_KEY");
        if gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY not set; chat requests will fail until it is configured");
        }

        Ok(Self {
            host: read("HOST").unwrap_or(defaults.host),
            port,
            database_url: read("DATABASE_URL"),
            gemini_api_key,
            gemini_model: read("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            max_tool_rounds: parse_count(read("ASSISTANT_MAX_TOOL_ROUNDS"), "ASSISTANT_MAX_TOOL_ROUNDS")?
                .unwrap_or(defaults.max_tool_rounds),
            memory_last_messages: parse_count(read("ASSISTANT_LAST_MESSAGES"), "ASSISTANT_LAST_MESSAGES")?
                .unwrap_or(defaults.memory_last_messages),
            api_base_url: read("API_BASE_URL").unwrap_or(defaults.api_base_url),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_count(value: Option<String>, key: &str) -> Result<Option<usize>> {
    value
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|e| AppError::Config(format!("{} '{}' is not a valid count: {}", key, raw, e)))
        })
        .transpose()
}
