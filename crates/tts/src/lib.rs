#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod http_client;
mod markup;
mod metrics;
mod provider;
mod request;
mod server;
mod synthesizer;
mod types;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};

pub use error::{ProviderError, Result, TtsError};
pub use markup::build_markup;
pub use provider::SpeechProvider;
pub use server::{Server, TtsServerBuilder};
pub use synthesizer::CachedSynthesizer;
pub use types::{
    CacheInfo, CacheMetrics, CacheStatus, ClearCacheResponse, HealthReport, Prosody, SpeechRequest, SynthesisRequest,
    Synthesized, Voice, VoicesResponse,
};
use request::ExtractPayload;
use types::VoicesQuery;

/// Build the speech server from configuration
pub async fn build_server(config: &recital_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = TtsServerBuilder::new(&config.tts)
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize speech server: {e}"))?;

    Ok(Arc::new(server))
}

/// Create the endpoint router for speech synthesis and cache management
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/v1/audio/speech", post(synthesize))
        .route("/v1/audio/voices", get(voices))
        .route("/v1/tts/metrics", get(metrics))
        .route("/v1/tts/cache", get(cache_info).delete(clear_cache))
        .route("/v1/tts/health", get(health))
}

/// Handle speech synthesis requests
async fn synthesize(
    State(server): State<Arc<Server>>,
    ExtractPayload(request): ExtractPayload<SpeechRequest>,
) -> Result<axum::response::Response> {
    tracing::debug!("speech handler called, input_len={}", request.input.len());

    let synthesized = server.synthesize(request).await?;

    tracing::debug!(
        cache = synthesized.cache.as_str(),
        size_bytes = synthesized.audio.len(),
        "speech synthesis complete"
    );

    Ok(synthesized.into_response())
}

async fn voices(State(server): State<Arc<Server>>, Query(query): Query<VoicesQuery>) -> Result<Json<VoicesResponse>> {
    let voices = server.synthesizer().voices(query.locale.as_deref()).await?;
    Ok(Json(VoicesResponse { voices }))
}

async fn metrics(State(server): State<Arc<Server>>) -> Json<CacheMetrics> {
    Json(server.synthesizer().metrics_snapshot().await)
}

async fn cache_info(State(server): State<Arc<Server>>) -> Json<CacheInfo> {
    Json(server.synthesizer().cache_info().await)
}

async fn clear_cache(State(server): State<Arc<Server>>) -> Json<ClearCacheResponse> {
    let removed = server.synthesizer().clear_cache().await;
    Json(ClearCacheResponse { removed })
}

async fn health(State(server): State<Arc<Server>>) -> impl IntoResponse {
    let (status, report) = server.health().await;
    (status, Json(report))
}
