//! Command-line and environment configuration for the market feed server.
//!
//! Every flag can also be set through the environment variable named next to it; a
//! `.env` file in the working directory is loaded before parsing.
use crate::broadcast::PushMode;
use crate::model::generator::GeneratorConfig;
use crate::ws::SessionSettings;
use clap::{Parser, ValueEnum};
use market_common::MarketError;
use market_common::net::{DEFAULT_PORT, addr};
use std::time::Duration;

/// Largest candle window the server accepts.
pub const MAX_CANDLE_WINDOW: usize = 10_000;

/// Deployment environment; selects the default log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Verbose logging.
    Development,
    /// Info-level logging.
    Production,
}

/// Parsed server configuration.
#[derive(Debug, Parser)]
#[command(version, about = "Synthetic market data feed over WebSocket", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Origin browsers must present during the WebSocket handshake.
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// Deployment environment.
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// Milliseconds between two ticks.
    #[arg(long, env = "TICK_INTERVAL_MS", default_value_t = 5000)]
    pub tick_interval_ms: u64,

    /// Number of candles kept in the window.
    #[arg(long, env = "CANDLE_WINDOW", default_value_t = 100)]
    pub candle_window: usize,

    /// Delivery mode for each tick.
    #[arg(long, env = "PUSH_MODE", value_enum, default_value_t = PushMode::Topics)]
    pub push_mode: PushMode,

    /// Seconds between server pings.
    #[arg(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = 25)]
    pub heartbeat_interval_secs: u64,

    /// Seconds of silence after which a client is dropped.
    #[arg(long, env = "HEARTBEAT_TIMEOUT_SECS", default_value_t = 60)]
    pub heartbeat_timeout_secs: u64,
}

impl ServerConfig {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.tick_interval_ms == 0 {
            return Err(MarketError::Format("tick interval must be positive".into()));
        }
        if self.candle_window == 0 || self.candle_window > MAX_CANDLE_WINDOW {
            return Err(MarketError::Format(format!(
                "candle window must be between 1 and {}, got {}",
                MAX_CANDLE_WINDOW, self.candle_window
            )));
        }
        if self.heartbeat_interval_secs == 0
            || self.heartbeat_timeout_secs <= self.heartbeat_interval_secs
        {
            return Err(MarketError::Format(format!(
                "heartbeat timeout ({}s) must exceed a positive interval ({}s)",
                self.heartbeat_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        addr(&self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            candle_window: self.candle_window,
            ..GeneratorConfig::default()
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            allowed_origin: Some(self.frontend_url.trim_end_matches('/').to_string()),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(self.heartbeat_timeout_secs),
            ..SessionSettings::default()
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.environment {
            Environment::Development => log::LevelFilter::Debug,
            Environment::Production => log::LevelFilter::Info,
        }
    }
}
