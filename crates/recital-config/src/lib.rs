#![allow(clippy::must_use_candidate)]

pub mod cache;
mod env;
pub mod health;
mod loader;
pub mod server;
pub mod telemetry;
pub mod tts;

use serde::Deserialize;

pub use cache::*;
pub use health::*;
pub use server::*;
pub use telemetry::TelemetryConfig;
pub use tts::*;

/// Top-level Recital configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Speech synthesis and audio cache configuration
    #[serde(default)]
    pub tts: TtsConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
