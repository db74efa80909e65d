use secrecy::SecretString;
use serde::Deserialize;

use crate::cache::AudioCacheConfig;

/// Speech synthesis configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Upstream synthesis provider
    #[serde(default)]
    pub provider: Option<TtsProviderConfig>,
    /// Voice used when a request does not name one
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Default speaking rate (e.g. "+5%")
    #[serde(default = "default_rate")]
    pub rate: String,
    /// Default volume (e.g. "+0%")
    #[serde(default = "default_volume")]
    pub volume: String,
    /// Default pitch (e.g. "+2Hz")
    #[serde(default = "default_pitch")]
    pub pitch: String,
    /// Wrap text in an SSML document unless the request says otherwise
    #[serde(default = "default_use_markup")]
    pub use_markup: bool,
    /// `mstts:express-as` style applied to SSML documents, empty to omit
    #[serde(default = "default_markup_style")]
    pub markup_style: String,
    /// Stop waiting for synthesis after this many seconds
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    /// Audio cache settings
    #[serde(default)]
    pub cache: AudioCacheConfig,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: None,
            voice: default_voice(),
            rate: default_rate(),
            volume: default_volume(),
            pitch: default_pitch(),
            use_markup: default_use_markup(),
            markup_style: default_markup_style(),
            request_timeout_seconds: None,
            cache: AudioCacheConfig::default(),
        }
    }
}

/// Configuration for the synthesis provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsProviderConfig {
    /// Provider type
    #[serde(rename = "type")]
    pub provider_type: TtsProviderType,
    /// API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Azure region, used to derive the endpoint when no base URL is set
    #[serde(default)]
    pub region: Option<String>,
    /// Model identifier (`OpenAI` only)
    #[serde(default)]
    pub model: Option<String>,
}

/// Supported synthesis providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProviderType {
    /// Azure Speech neural voices (SSML capable)
    Azure,
    /// `OpenAI` TTS
    Openai,
}

fn default_voice() -> String {
    "pt-BR-FranciscaNeural".to_string()
}

fn default_rate() -> String {
    "+5%".to_string()
}

fn default_volume() -> String {
    "+0%".to_string()
}

fn default_pitch() -> String {
    "+2Hz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_use_markup() -> bool {
    true
}

fn default_markup_style() -> String {
    "narration-professional".to_string()
}
