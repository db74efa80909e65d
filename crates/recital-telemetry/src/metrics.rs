//! Metric names and instrument helpers

use opentelemetry::metrics::Meter;

/// Instrumentation scope for every Recital instrument
pub const METER_NAME: &str = "recital";

// Speech synthesis metric names
pub const TTS_CACHE_REQUESTS: &str = "tts.cache.requests";
pub const TTS_SYNTHESIS_DURATION: &str = "tts.synthesis.duration";
pub const TTS_CACHE_RECLAIMED: &str = "tts.cache.reclaimed";

// Attribute keys
pub const CACHE_OUTCOME: &str = "cache.outcome";

/// Meter from the global provider
///
/// Instruments created before [`crate::init`] installs an exporter, or when
/// none is configured, are no-ops.
pub fn meter() -> Meter {
    opentelemetry::global::meter(METER_NAME)
}
