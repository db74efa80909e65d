//! Cache-aware synthesis orchestration

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use recital_cache::{BlobStore, CacheKey, CacheMaintainer};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ProviderError, TtsError},
    markup::build_markup,
    metrics::{MetricsAggregator, Outcome},
    provider::SpeechProvider,
    types::{CacheInfo, CacheMetrics, CacheStatus, SynthesisRequest, Synthesized, Voice},
};

/// One provider call, awaited by every request for the same key
type Flight = Shared<BoxFuture<'static, Result<Bytes, ProviderError>>>;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Clone)]
struct CacheHandle {
    store: BlobStore,
    maintainer: CacheMaintainer,
}

struct Inner {
    provider: Arc<dyn SpeechProvider>,
    cache: Option<CacheHandle>,
    markup_style: Option<String>,
    metrics: MetricsAggregator,
    in_flight: DashMap<CacheKey, Flight>,
    sequence: AtomicU64,
}

/// Synthesizes speech through a provider, memoizing audio in a [`BlobStore`]
///
/// Concurrent misses for the same parameters share a single provider call.
/// That call runs in its own task, so a caller that stops waiting does not
/// stop the cache from being populated.
#[derive(Clone)]
pub struct CachedSynthesizer {
    inner: Arc<Inner>,
}

impl CachedSynthesizer {
    /// Create a synthesizer; `store` is `None` when caching is disabled
    ///
    /// Expired entries are swept every `maintenance_interval` requests (0
    /// never sweeps). `markup_style` is the `mstts:express-as` style used
    /// for SSML requests.
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        store: Option<BlobStore>,
        maintenance_interval: u64,
        markup_style: Option<String>,
    ) -> Self {
        let cache = store.map(|store| CacheHandle {
            maintainer: CacheMaintainer::new(store.clone(), maintenance_interval),
            store,
        });

        Self {
            inner: Arc::new(Inner {
                provider,
                cache,
                markup_style,
                metrics: MetricsAggregator::new(),
                in_flight: DashMap::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }

    /// Synthesize a request, returning only the audio
    pub async fn synthesize(&self, request: &SynthesisRequest) -> crate::Result<Bytes> {
        Ok(self.synthesize_with_status(request).await?.audio)
    }

    /// Synthesize a request, reporting whether the audio came from the cache
    ///
    /// Every completed request is recorded in the metrics, failed ones as
    /// misses.
    pub async fn synthesize_with_status(&self, request: &SynthesisRequest) -> crate::Result<Synthesized> {
        let started = Instant::now();
        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        let Some(cache) = &self.inner.cache else {
            let result = self.inner.generate(request).await;
            self.inner.record(&result, started);

            return Ok(Synthesized {
                audio: result?,
                cache: CacheStatus::Bypass,
            });
        };

        let key = self.inner.key_for(request);

        if let Some(audio) = cache.store.get(&key).await {
            tracing::debug!(cache_key = %key, size_bytes = audio.len(), "cache hit");
            self.inner
                .metrics
                .record_outcome(Outcome::Hit, started.elapsed().as_secs_f64());

            return Ok(Synthesized {
                audio,
                cache: CacheStatus::Hit,
            });
        }

        tracing::debug!(cache_key = %key, "cache miss");

        let result = self.join_flight(cache, key, request, sequence).await;
        self.inner.record(&result, started);

        Ok(Synthesized {
            audio: result?,
            cache: CacheStatus::Miss,
        })
    }

    /// Like [`Self::synthesize_with_status`], but gives up when `token` is
    /// cancelled
    ///
    /// A cancelled request returns [`TtsError::Cancelled`] and is not
    /// recorded; a synthesis it started still completes and is cached.
    pub async fn synthesize_with_cancellation(
        &self,
        request: &SynthesisRequest,
        token: &CancellationToken,
    ) -> crate::Result<Synthesized> {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!("speech request cancelled by caller");
                Err(TtsError::Cancelled)
            }
            result = self.synthesize_with_status(request) => result,
        }
    }

    fn join_flight(&self, cache: &CacheHandle, key: CacheKey, request: &SynthesisRequest, sequence: u64) -> Flight {
        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(cache_key = %key, "joining in-flight synthesis");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let task = tokio::spawn(fly(
                    Arc::clone(&self.inner),
                    cache.clone(),
                    key,
                    request.clone(),
                    sequence,
                ));

                let flight = task
                    .map(|joined| {
                        joined.unwrap_or_else(|e| {
                            tracing::error!("synthesis task failed: {e}");
                            Err(ProviderError::InternalError(None))
                        })
                    })
                    .boxed()
                    .shared();

                entry.insert(flight.clone());
                flight
            }
        }
    }

    /// Current counters with the cache size recomputed from disk
    pub async fn metrics_snapshot(&self) -> CacheMetrics {
        let total_size = match &self.inner.cache {
            Some(cache) => cache.store.total_size_bytes().await.unwrap_or_else(|e| {
                tracing::warn!("failed to measure audio cache: {e}");
                0
            }),
            None => 0,
        };

        self.inner.metrics.snapshot(total_size)
    }

    /// Summary of the cache directory and hit rate
    #[allow(clippy::cast_precision_loss)]
    pub async fn cache_info(&self) -> CacheInfo {
        let hit_rate_percent = round2(self.inner.metrics.hit_rate());

        let Some(cache) = &self.inner.cache else {
            return CacheInfo {
                enabled: false,
                directory: None,
                entry_count: 0,
                total_size_bytes: 0,
                total_size_mb: 0.0,
                ttl_seconds: None,
                hit_rate_percent,
            };
        };

        let entries = cache.store.list_entries().await.unwrap_or_else(|e| {
            tracing::warn!("failed to list audio cache: {e}");
            Vec::new()
        });
        let total_size_bytes: u64 = entries.iter().map(|entry| entry.size_bytes).sum();

        CacheInfo {
            enabled: true,
            directory: Some(cache.store.root().display().to_string()),
            entry_count: entries.len(),
            total_size_bytes,
            total_size_mb: round2(total_size_bytes as f64 / BYTES_PER_MB),
            ttl_seconds: Some(cache.store.ttl().as_secs()),
            hit_rate_percent,
        }
    }

    /// Remove every cached entry, returning how many were removed
    pub async fn clear_cache(&self) -> usize {
        let Some(cache) = &self.inner.cache else {
            return 0;
        };

        cache.store.clear().await.unwrap_or_else(|e| {
            tracing::warn!("failed to clear audio cache: {e}");
            0
        })
    }

    /// Sweep expired entries now, regardless of the request count
    pub async fn reclaim_expired(&self) -> usize {
        let Some(cache) = &self.inner.cache else {
            return 0;
        };

        let removed = cache.maintainer.reclaim_expired().await;
        self.inner.metrics.record_reclaimed(removed);
        removed
    }

    /// Provider voices, optionally narrowed to a locale prefix
    ///
    /// The prefix is matched case-insensitively ("pt" matches "pt-BR").
    /// Voices without a locale are multilingual and always included.
    pub async fn voices(&self, locale: Option<&str>) -> crate::Result<Vec<Voice>> {
        let voices = self.inner.provider.voices().await?;

        let Some(prefix) = locale.map(str::trim).filter(|prefix| !prefix.is_empty()) else {
            return Ok(voices);
        };

        Ok(voices
            .into_iter()
            .filter(|voice| {
                voice.locale.as_deref().is_none_or(|locale| {
                    locale
                        .get(..prefix.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
                })
            })
            .collect())
    }
}

impl Inner {
    /// Key of the audio this request produces, markup style included
    fn key_for(&self, request: &SynthesisRequest) -> CacheKey {
        CacheKey::derive(&request.key_params(self.markup_style.as_deref()))
    }

    async fn generate(&self, request: &SynthesisRequest) -> Result<Bytes, ProviderError> {
        let audio = if request.use_markup {
            let document = build_markup(
                &request.text,
                &request.voice,
                &request.prosody,
                self.markup_style.as_deref(),
            );
            self.provider.synthesize_markup(&document, &request.voice).await?
        } else {
            self.provider
                .synthesize_text(&request.text, &request.voice, &request.prosody)
                .await?
        };

        if audio.is_empty() {
            tracing::error!(provider = self.provider.name(), "provider returned empty audio");
            return Err(ProviderError::EmptyAudio);
        }

        Ok(audio)
    }

    fn record(&self, result: &Result<Bytes, ProviderError>, started: Instant) {
        let outcome = if result.is_ok() { Outcome::Miss } else { Outcome::Failed };
        self.metrics.record_outcome(outcome, started.elapsed().as_secs_f64());
    }
}

/// Removes a flight from the in-flight table when dropped, including on panic
struct FlightGuard<'a> {
    in_flight: &'a DashMap<CacheKey, Flight>,
    key: &'a CacheKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.key);
    }
}

/// Produce and cache the audio for one key
///
/// The blob is written before the flight leaves the table, and the store is
/// checked again first, so a request that finds no flight finds the blob.
async fn fly(
    inner: Arc<Inner>,
    cache: CacheHandle,
    key: CacheKey,
    request: SynthesisRequest,
    sequence: u64,
) -> Result<Bytes, ProviderError> {
    let guard = FlightGuard {
        in_flight: &inner.in_flight,
        key: &key,
    };

    if let Some(audio) = cache.store.get(&key).await {
        return Ok(audio);
    }

    let audio = inner.generate(&request).await?;

    if let Err(e) = cache.store.put(&key, &audio).await {
        tracing::warn!(cache_key = %key, "failed to cache synthesized audio: {e}");
    }

    drop(guard);

    if cache.maintainer.is_due(sequence) {
        let removed = cache.maintainer.reclaim_expired().await;
        inner.metrics.record_reclaimed(removed);
    }

    Ok(audio)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
