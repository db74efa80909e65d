use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use recital_cache::KeyParams;
use serde::{Deserialize, Serialize};

/// Speech synthesis request body
///
/// Only `input` is required; every other field falls back to the
/// configured default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechRequest {
    /// Text to synthesize into speech
    pub input: String,
    /// Voice identifier (e.g. "pt-BR-FranciscaNeural")
    #[serde(default)]
    pub voice: Option<String>,
    /// Speaking rate (e.g. "+5%")
    #[serde(default)]
    pub rate: Option<String>,
    /// Volume (e.g. "+0%")
    #[serde(default)]
    pub volume: Option<String>,
    /// Pitch (e.g. "+2Hz")
    #[serde(default)]
    pub pitch: Option<String>,
    /// Wrap the text in an SSML document before synthesis
    #[serde(default)]
    pub use_markup: Option<bool>,
}

/// Prosody controls passed through to the provider verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prosody {
    pub rate: String,
    pub volume: String,
    pub pitch: String,
}

/// Fully resolved synthesis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub prosody: Prosody,
    pub use_markup: bool,
}

impl SynthesisRequest {
    /// Parameters that identify the produced audio in the cache
    ///
    /// `markup_style` is the speaking style applied when the request is sent
    /// as SSML; plain text requests ignore it.
    pub fn key_params<'a>(&'a self, markup_style: Option<&'a str>) -> KeyParams<'a> {
        KeyParams {
            text: &self.text,
            voice: &self.voice,
            rate: &self.prosody.rate,
            volume: &self.prosody.volume,
            pitch: &self.prosody.pitch,
            markup: self.use_markup.then(|| markup_style.unwrap_or_default()),
        }
    }
}

/// Where the returned audio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the audio cache
    Hit,
    /// Synthesized for this request (or a coalesced identical one)
    Miss,
    /// Caching is disabled
    Bypass,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// Audio produced for a request
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub audio: Bytes,
    pub cache: CacheStatus,
}

/// An `audio/mpeg` response carrying an `X-Cache` header
impl IntoResponse for Synthesized {
    fn into_response(self) -> Response {
        (
            [
                (http::header::CONTENT_TYPE, "audio/mpeg"),
                (http::HeaderName::from_static("x-cache"), self.cache.as_str()),
            ],
            self.audio,
        )
            .into_response()
    }
}

/// Running cache performance counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_generation_time_seconds: f64,
    pub total_cache_size_bytes: u64,
}

/// Summary of the audio cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    pub hit_rate_percent: f64,
}

/// Result of clearing the audio cache
#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

/// A voice offered by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Identifier to pass as `voice`
    pub name: String,
    /// Locale such as "pt-BR"; `None` for multilingual voices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Query string of the voice listing
#[derive(Debug, Deserialize)]
pub struct VoicesQuery {
    /// Locale prefix filter (e.g. "pt-BR" or "pt")
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<Voice>,
}

/// Result of the synthesis health probe
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub provider: String,
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: CacheMetrics,
    pub cache: CacheInfo,
}
