//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path};

use recital_config::{Config, HealthConfig, ServerConfig, TtsConfig, TtsProviderConfig, TtsProviderType};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder caching audio under `cache_dir`
    pub fn new(cache_dir: &Path) -> Self {
        let mut tts = TtsConfig::default();
        tts.cache.directory = cache_dir.join("audio_cache");

        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                },
                tts,
                telemetry: None,
            },
        }
    }

    /// Add an Azure provider pointed at a mock backend
    pub fn with_azure_provider(mut self, base_url: &str) -> Self {
        self.config.tts.provider = Some(TtsProviderConfig {
            provider_type: TtsProviderType::Azure,
            api_key: Some(SecretString::from("test-key")),
            base_url: Some(base_url.to_owned()),
            region: None,
            model: None,
        });
        self
    }

    /// Disable the audio cache
    pub fn without_cache(mut self) -> Self {
        self.config.tts.cache.enabled = false;
        self
    }

    /// Give up on synthesis after `seconds`
    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.config.tts.request_timeout_seconds = Some(seconds);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
