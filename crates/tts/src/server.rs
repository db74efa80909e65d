use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;
use recital_cache::BlobStore;
use recital_config::{TtsConfig, TtsProviderConfig, TtsProviderType};
use secrecy::SecretString;

use crate::{
    error::TtsError,
    provider::{SpeechProvider, azure::AzureSpeechProvider, openai_tts::OpenAiTtsProvider},
    synthesizer::CachedSynthesizer,
    types::{HealthReport, Prosody, SpeechRequest, SynthesisRequest, Synthesized},
};

/// Text synthesized by the health probe
const PROBE_TEXT: &str = "Teste de saúde do TTS";

/// Values used for request fields the caller leaves out
#[derive(Debug, Clone)]
struct Defaults {
    voice: String,
    prosody: Prosody,
    use_markup: bool,
}

/// Speech server owning the cached synthesizer
pub struct Server {
    synthesizer: CachedSynthesizer,
    defaults: Defaults,
    request_timeout: Option<Duration>,
}

impl Server {
    pub const fn synthesizer(&self) -> &CachedSynthesizer {
        &self.synthesizer
    }

    /// Fill in configured defaults and check the request
    pub fn resolve(&self, request: SpeechRequest) -> crate::Result<SynthesisRequest> {
        if request.input.trim().is_empty() {
            return Err(TtsError::InvalidRequest("input must not be empty".to_string()));
        }

        let defaults = &self.defaults;

        Ok(SynthesisRequest {
            text: request.input,
            voice: request.voice.unwrap_or_else(|| defaults.voice.clone()),
            prosody: Prosody {
                rate: request.rate.unwrap_or_else(|| defaults.prosody.rate.clone()),
                volume: request.volume.unwrap_or_else(|| defaults.prosody.volume.clone()),
                pitch: request.pitch.unwrap_or_else(|| defaults.prosody.pitch.clone()),
            },
            use_markup: request.use_markup.unwrap_or(defaults.use_markup),
        })
    }

    /// Synthesize a request, giving up after the configured request timeout
    pub async fn synthesize(&self, request: SpeechRequest) -> crate::Result<Synthesized> {
        let request = self.resolve(request)?;

        let Some(timeout) = self.request_timeout else {
            return self.synthesizer.synthesize_with_status(&request).await;
        };

        tokio::time::timeout(timeout, self.synthesizer.synthesize_with_status(&request))
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(timeout_secs = timeout.as_secs(), "speech request timed out");
                Err(TtsError::Cancelled)
            })
    }

    /// Synthesize a short probe with the defaults and report service state
    pub async fn health(&self) -> (StatusCode, HealthReport) {
        let probe = SpeechRequest {
            input: PROBE_TEXT.to_string(),
            voice: None,
            rate: None,
            volume: None,
            pitch: None,
            use_markup: None,
        };

        let result = self.synthesize(probe).await;

        let (status, audio_size, error) = match result {
            Ok(synthesized) => (StatusCode::OK, Some(synthesized.audio.len()), None),
            Err(e) => {
                tracing::warn!("speech health probe failed: {e}");
                (StatusCode::SERVICE_UNAVAILABLE, None, Some(e.client_message()))
            }
        };

        let report = HealthReport {
            status: if error.is_none() { "ok" } else { "error" },
            provider: self.synthesizer.provider_name().to_string(),
            voice: self.defaults.voice.clone(),
            audio_size,
            error,
            metrics: self.synthesizer.metrics_snapshot().await,
            cache: self.synthesizer.cache_info().await,
        };

        (status, report)
    }
}

/// Builder for constructing the speech server from configuration
pub struct TtsServerBuilder<'a> {
    config: &'a TtsConfig,
    provider: Option<Arc<dyn SpeechProvider>>,
}

impl<'a> TtsServerBuilder<'a> {
    pub const fn new(config: &'a TtsConfig) -> Self {
        Self { config, provider: None }
    }

    /// Use this provider instead of the configured one
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub async fn build(self) -> crate::Result<Server> {
        let config = self.config;

        let provider = match self.provider {
            Some(provider) => provider,
            None => build_provider(config)?,
        };

        let store = if config.cache.enabled {
            let ttl = Duration::from_secs(config.cache.ttl_seconds);
            let store = BlobStore::open(config.cache.directory.clone(), ttl)
                .await
                .map_err(|e| TtsError::ConfigError(format!("Failed to open audio cache: {e}")))?;
            Some(store)
        } else {
            tracing::info!("audio cache disabled");
            None
        };

        let markup_style = Some(config.markup_style.clone()).filter(|style| !style.is_empty());

        tracing::debug!(
            provider = provider.name(),
            voice = %config.voice,
            use_markup = config.use_markup,
            "speech server initialized"
        );

        Ok(Server {
            synthesizer: CachedSynthesizer::new(provider, store, config.cache.maintenance_interval, markup_style),
            defaults: Defaults {
                voice: config.voice.clone(),
                prosody: Prosody {
                    rate: config.rate.clone(),
                    volume: config.volume.clone(),
                    pitch: config.pitch.clone(),
                },
                use_markup: config.use_markup,
            },
            request_timeout: config.request_timeout_seconds.map(Duration::from_secs),
        })
    }
}

fn build_provider(config: &TtsConfig) -> crate::Result<Arc<dyn SpeechProvider>> {
    let provider_config = config
        .provider
        .as_ref()
        .ok_or_else(|| TtsError::ConfigError("No speech provider configured".to_string()))?;

    let api_key = resolve_api_key(provider_config)?;
    let base_url = provider_config.base_url.as_deref();

    let provider: Arc<dyn SpeechProvider> = match provider_config.provider_type {
        TtsProviderType::Azure => Arc::new(AzureSpeechProvider::new(
            api_key,
            provider_config.region.as_deref(),
            base_url,
        )),
        TtsProviderType::Openai => Arc::new(OpenAiTtsProvider::new(
            api_key,
            base_url,
            provider_config.model.as_deref(),
        )),
    };

    Ok(provider)
}

fn resolve_api_key(config: &TtsProviderConfig) -> crate::Result<SecretString> {
    config.api_key.clone().ok_or_else(|| {
        TtsError::ConfigError(format!(
            "API key required for speech provider '{:?}'",
            config.provider_type
        ))
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::{
        error::ProviderError,
        types::{CacheStatus, Voice},
    };

    struct SlowProvider(Duration);

    #[async_trait]
    impl SpeechProvider for SlowProvider {
        async fn synthesize_text(&self, _: &str, _: &str, _: &Prosody) -> Result<Bytes, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok(Bytes::from_static(b"audio"))
        }

        async fn synthesize_markup(&self, _: &str, _: &str) -> Result<Bytes, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok(Bytes::from_static(b"audio"))
        }

        async fn voices(&self) -> Result<Vec<Voice>, ProviderError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn config() -> TtsConfig {
        let mut config = TtsConfig::default();
        config.cache.enabled = false;
        config
    }

    fn speech(input: &str) -> SpeechRequest {
        serde_json::from_value(serde_json::json!({ "input": input })).unwrap()
    }

    async fn server(config: &TtsConfig, delay: Duration) -> Server {
        TtsServerBuilder::new(config)
            .with_provider(Arc::new(SlowProvider(delay)))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn missing_fields_take_defaults() {
        let config = config();
        let server = server(&config, Duration::ZERO).await;

        let resolved = server.resolve(speech("Olá")).unwrap();
        assert_eq!(resolved.voice, "pt-BR-FranciscaNeural");
        assert_eq!(resolved.prosody.rate, "+5%");
        assert_eq!(resolved.prosody.volume, "+0%");
        assert_eq!(resolved.prosody.pitch, "+2Hz");
        assert!(resolved.use_markup);

        let request: SpeechRequest = serde_json::from_value(serde_json::json!({
            "input": "Olá",
            "voice": "pt-BR-AntonioNeural",
            "rate": "-10%",
            "use_markup": false,
        }))
        .unwrap();
        let resolved = server.resolve(request).unwrap();
        assert_eq!(resolved.voice, "pt-BR-AntonioNeural");
        assert_eq!(resolved.prosody.rate, "-10%");
        assert_eq!(resolved.prosody.pitch, "+2Hz");
        assert!(!resolved.use_markup);
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let config = config();
        let server = server(&config, Duration::ZERO).await;

        let err = server.synthesize(speech("  \n\t ")).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_synthesis_times_out() {
        let mut config = config();
        config.request_timeout_seconds = Some(1);
        let server = server(&config, Duration::from_secs(5)).await;

        let err = server.synthesize(speech("demorado")).await.unwrap_err();
        assert!(matches!(err, TtsError::Cancelled));
    }

    #[tokio::test]
    async fn health_probe_reports_audio_size() {
        let config = config();
        let server = server(&config, Duration::ZERO).await;

        let (status, report) = server.health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, "ok");
        assert_eq!(report.provider, "slow");
        assert_eq!(report.audio_size, Some(5));
        assert_eq!(report.metrics.total_requests, 1);
        assert!(!report.cache.enabled);
    }

    #[tokio::test]
    async fn cache_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TtsConfig::default();
        config.cache.directory = dir.path().join("nested").join("audio");
        let server = server(&config, Duration::ZERO).await;

        assert!(config.cache.directory.is_dir());
        let first = server.synthesize(speech("Olá")).await.unwrap();
        let second = server.synthesize(speech("Olá")).await.unwrap();
        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(second.cache, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn provider_requires_api_key() {
        let mut config = config();
        config.provider = Some(TtsProviderConfig {
            provider_type: TtsProviderType::Azure,
            api_key: None,
            base_url: None,
            region: Some("brazilsouth".into()),
            model: None,
        });

        let Err(err) = TtsServerBuilder::new(&config).build().await else {
            panic!("built without an API key");
        };
        assert!(matches!(err, TtsError::ConfigError(_)));
    }
}
