use crate::BlobStore;

/// Sweeps expired entries out of a [`BlobStore`]
///
/// Sweeping scans the whole directory, so it runs every `interval` requests
/// instead of on each one.
#[derive(Debug, Clone)]
pub struct CacheMaintainer {
    store: BlobStore,
    interval: u64,
}

impl CacheMaintainer {
    /// Create a maintainer that sweeps every `interval` requests (0 never sweeps)
    pub const fn new(store: BlobStore, interval: u64) -> Self {
        Self { store, interval }
    }

    /// Whether the request with this sequence number should trigger a sweep
    pub const fn is_due(&self, sequence: u64) -> bool {
        self.interval != 0 && sequence % self.interval == 0
    }

    /// Remove every entry whose age has reached the TTL
    ///
    /// Best effort: a failure to list the directory ends the sweep, a failure
    /// to remove one entry is logged and the sweep moves on. Entries are
    /// checked again before removal, so one rewritten during the sweep is
    /// kept. Staging files abandoned by failed writes are removed too. Returns
    /// the number of entries removed.
    pub async fn reclaim_expired(&self) -> usize {
        let entries = match self.store.list_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("skipping cache sweep: {e}");
                return 0;
            }
        };

        let mut removed = 0;

        for entry in entries.iter().filter(|entry| self.store.is_expired(entry.last_write)) {
            match self.store.remove_if_expired(&entry.key).await {
                Ok(true) => {
                    removed += 1;
                    tracing::debug!(cache_key = %entry.key, "removed expired cache entry");
                }
                Ok(false) => tracing::debug!(cache_key = %entry.key, "cache entry refreshed during sweep"),
                Err(e) => tracing::warn!(cache_key = %entry.key, "{e}"),
            }
        }

        match self.store.remove_abandoned_staging().await {
            Ok(0) => {}
            Ok(staging) => tracing::info!(staging, "removed abandoned staging files"),
            Err(e) => tracing::warn!("{e}"),
        }

        if removed > 0 {
            tracing::info!(removed, scanned = entries.len(), "reclaimed expired audio");
        }

        removed
    }
}
