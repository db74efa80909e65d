use std::path::Path;

use crate::{Config, TtsProviderType};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured or the provider,
    /// voice, or cache settings are unusable
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_provider()?;
        self.validate_voice_defaults()?;
        self.validate_cache()?;
        Ok(())
    }

    fn validate_provider(&self) -> anyhow::Result<()> {
        let Some(ref provider) = self.tts.provider else {
            anyhow::bail!("a TTS provider must be configured under [tts.provider]");
        };

        match provider.provider_type {
            TtsProviderType::Azure => {
                if provider.region.is_none() && provider.base_url.is_none() {
                    anyhow::bail!("the azure provider requires either `region` or `base_url`");
                }
            }
            TtsProviderType::Openai => {
                if self.tts.use_markup {
                    anyhow::bail!("the openai provider does not accept SSML; set `tts.use_markup = false`");
                }
            }
        }

        Ok(())
    }

    fn validate_voice_defaults(&self) -> anyhow::Result<()> {
        if self.tts.voice.trim().is_empty() {
            anyhow::bail!("tts.voice must not be empty");
        }

        Ok(())
    }

    fn validate_cache(&self) -> anyhow::Result<()> {
        let cache = &self.tts.cache;

        if cache.enabled && cache.ttl_seconds == 0 {
            anyhow::bail!("tts.cache.ttl_seconds must be greater than 0 when the cache is enabled");
        }

        if cache.enabled && cache.directory.as_os_str().is_empty() {
            anyhow::bail!("tts.cache.directory must not be empty when the cache is enabled");
        }

        Ok(())
    }
}
