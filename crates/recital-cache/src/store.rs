use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use tokio::fs;

use crate::{CacheError, CacheKey};

/// Extension of every cached audio file
const BLOB_EXTENSION: &str = "mp3";

/// A persisted cache entry as seen on disk
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub path: PathBuf,
    /// Modification time of the file, i.e. when the payload was last written
    pub last_write: SystemTime,
    pub size_bytes: u64,
}

/// Directory of audio payloads keyed by [`CacheKey`]
///
/// The only component that touches the cache directory. Cloning is cheap and
/// clones share the same directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: Arc<Path>,
    ttl: Duration,
}

impl BlobStore {
    /// Open the store, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub async fn open(root: impl Into<PathBuf>, ttl: Duration) -> Result<Self, CacheError> {
        let root = root.into();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheError::Directory(format!("failed to create {}: {e}", root.display())))?;

        tracing::info!(directory = %root.display(), ttl_secs = ttl.as_secs(), "audio cache ready");

        Ok(Self {
            root: Arc::from(root),
            ttl,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether an entry written at `last_write` is too old to serve
    ///
    /// Stale once its age reaches the TTL. A modification time in the future
    /// counts as age zero.
    pub fn is_expired(&self, last_write: SystemTime) -> bool {
        let age = SystemTime::now().duration_since(last_write).unwrap_or(Duration::ZERO);
        age >= self.ttl
    }

    /// Fetch fresh audio for a key
    ///
    /// Missing and expired entries return `None`; expired files are left in
    /// place for the maintainer. Read errors also return `None`.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        match self.read_fresh(key).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(cache_key = %key, "{e}; treating as a cache miss");
                None
            }
        }
    }

    async fn read_fresh(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let path = self.path_for(key);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Read(format!("{}: {e}", path.display()))),
        };

        let last_write = metadata
            .modified()
            .map_err(|e| CacheError::Read(format!("modification time of {}: {e}", path.display())))?;

        if self.is_expired(last_write) {
            tracing::debug!(cache_key = %key, "cache entry expired");
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(audio) => Ok(Some(Bytes::from(audio))),
            // Removed between the stat and the read
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Read(format!("{}: {e}", path.display()))),
        }
    }

    /// Write audio for a key, replacing any previous payload
    ///
    /// The payload is staged in a temporary file and renamed into place, so
    /// readers see either the old or the new audio, never a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if staging, renaming, or reading back metadata fails
    pub async fn put(&self, key: &CacheKey, audio: &[u8]) -> Result<CacheEntry, CacheError> {
        let path = self.path_for(key);
        let staging = self
            .root
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&staging, audio).await {
            fs::remove_file(&staging).await.ok();
            return Err(CacheError::Write(format!("{}: {e}", staging.display())));
        }

        if let Err(e) = fs::rename(&staging, &path).await {
            fs::remove_file(&staging).await.ok();
            return Err(CacheError::Write(format!("{}: {e}", path.display())));
        }

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| CacheError::Write(format!("{}: {e}", path.display())))?;

        tracing::debug!(cache_key = %key, size_bytes = metadata.len(), "cached audio");

        Ok(CacheEntry {
            key: key.clone(),
            last_write: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
            size_bytes: metadata.len(),
            path,
        })
    }

    /// Enumerate every persisted entry, fresh or not
    ///
    /// Files that are not cache entries are skipped. An entry whose
    /// modification time cannot be read is reported as written at the epoch,
    /// so it counts as expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed
    pub async fn list_entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut dir = match fs::read_dir(&*self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::Directory(format!("{}: {e}", self.root.display()))),
        };

        let mut entries = Vec::new();

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::Directory(format!("{}: {e}", self.root.display())))?
        {
            let path = item.path();
            let Some(key) = key_from_path(&path) else {
                continue;
            };

            match item.metadata().await {
                Ok(metadata) if metadata.is_file() => entries.push(CacheEntry {
                    key,
                    last_write: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    size_bytes: metadata.len(),
                    path,
                }),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable cache entry: {e}"),
            }
        }

        Ok(entries)
    }

    /// Delete the entry for a key; absent keys are not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed
    pub async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let path = self.path_for(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Remove(format!("{}: {e}", path.display()))),
        }
    }

    /// Delete the entry for a key only if it is still expired
    ///
    /// The age is read again right before removal, so an entry rewritten
    /// since it was listed survives. Returns whether the entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be inspected or removed
    pub async fn remove_if_expired(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.path_for(key);

        let last_write = match fs::metadata(&path).await {
            Ok(metadata) => metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(CacheError::Remove(format!("{}: {e}", path.display()))),
        };

        if !self.is_expired(last_write) {
            return Ok(false);
        }

        // A write landing between the stat and the unlink is still lost; it
        // costs one extra synthesis.
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Remove(format!("{}: {e}", path.display()))),
        }
    }

    /// Delete staging files left behind by writes that never completed
    ///
    /// Only staging files older than the TTL are removed, so writes still in
    /// progress keep theirs. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed
    pub async fn remove_abandoned_staging(&self) -> Result<usize, CacheError> {
        let mut dir = match fs::read_dir(&*self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::Directory(format!("{}: {e}", self.root.display()))),
        };

        let mut removed = 0;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::Directory(format!("{}: {e}", self.root.display())))?
        {
            let path = item.path();
            if !is_staging(&path) {
                continue;
            }

            let abandoned = match item.metadata().await {
                Ok(metadata) => {
                    metadata.is_file() && self.is_expired(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
                }
                Err(_) => false,
            };

            if abandoned {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(path = %path.display(), "failed to remove staging file: {e}"),
                }
            }
        }

        Ok(removed)
    }

    /// Sum of all persisted payload sizes, recomputed from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed
    pub async fn total_size_bytes(&self) -> Result<u64, CacheError> {
        let entries = self.list_entries().await?;
        Ok(entries.iter().map(|entry| entry.size_bytes).sum())
    }

    /// Remove every entry, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;

        for entry in self.list_entries().await? {
            match self.remove(&entry.key).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(cache_key = %entry.key, "{e}"),
            }
        }

        tracing::info!(removed, "audio cache cleared");
        Ok(removed)
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.{BLOB_EXTENSION}"))
    }
}

fn key_from_path(path: &Path) -> Option<CacheKey> {
    if path.extension()? != BLOB_EXTENSION {
        return None;
    }

    CacheKey::from_hex(path.file_stem()?.to_str()?)
}

/// Staging files are named `.{key}.{uuid}.tmp`
fn is_staging(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(key, _)| CacheKey::from_hex(key).is_some())
}
