//! Mock Azure speech backend for integration tests
//!
//! Answers SSML synthesis requests with fake MP3 bytes derived from the
//! document, so different requests get different audio.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing,
};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// Mock speech backend that returns predictable audio
pub struct MockTts {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockTtsState>,
}

struct MockTtsState {
    synthesis_count: AtomicU32,
    fail: bool,
    delay: Duration,
}

impl MockTts {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(false, Duration::ZERO).await
    }

    /// Start a mock server that fails every synthesis with 500
    pub async fn start_failing() -> anyhow::Result<Self> {
        Self::start_inner(true, Duration::ZERO).await
    }

    /// Start a mock server that waits before answering synthesis requests
    pub async fn start_with_delay(delay: Duration) -> anyhow::Result<Self> {
        Self::start_inner(false, delay).await
    }

    async fn start_inner(fail: bool, delay: Duration) -> anyhow::Result<Self> {
        let state = Arc::new(MockTtsState {
            synthesis_count: AtomicU32::new(0),
            fail,
            delay,
        });

        let app = Router::new()
            .route("/cognitiveservices/v1", routing::post(handle_synthesis))
            .route("/cognitiveservices/voices/list", routing::get(handle_voices))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the Azure endpoint
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of synthesis requests received
    pub fn synthesis_count(&self) -> u32 {
        self.state.synthesis_count.load(Ordering::SeqCst)
    }
}

impl Drop for MockTts {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_synthesis(State(state): State<Arc<MockTtsState>>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    state.synthesis_count.fetch_add(1, Ordering::SeqCst);

    if headers.get("ocp-apim-subscription-key").is_none_or(|key| key != "test-key") {
        return (StatusCode::UNAUTHORIZED, "missing subscription key").into_response();
    }

    if headers
        .get(axum::http::header::CONTENT_TYPE)
        .is_none_or(|value| value != "application/ssml+xml")
    {
        return (StatusCode::BAD_REQUEST, "expected SSML").into_response();
    }

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mock server intentional failure").into_response();
    }

    let mut audio = b"ID3".to_vec();
    audio.extend_from_slice(&body);

    ([(axum::http::header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()
}

async fn handle_voices() -> impl IntoResponse {
    Json(serde_json::json!([
        {"ShortName": "pt-BR-FranciscaNeural", "Locale": "pt-BR", "Gender": "Female", "LocalName": "Francisca"},
        {"ShortName": "pt-BR-AntonioNeural", "Locale": "pt-BR", "Gender": "Male", "LocalName": "Antônio"},
        {"ShortName": "pt-PT-RaquelNeural", "Locale": "pt-PT", "Gender": "Female", "LocalName": "Raquel"},
        {"ShortName": "en-US-JennyNeural", "Locale": "en-US", "Gender": "Female", "LocalName": "Jenny"}
    ]))
}
