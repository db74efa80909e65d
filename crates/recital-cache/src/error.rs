use thiserror::Error;

/// Audio cache errors
///
/// None of these reach API consumers: reads fail open, writes and removals
/// are logged by the caller and the request carries on.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading an entry or its metadata failed
    #[error("cache read failed: {0}")]
    Read(String),
    /// Writing an entry failed
    #[error("cache write failed: {0}")]
    Write(String),
    /// Removing an entry failed
    #[error("cache entry removal failed: {0}")]
    Remove(String),
    /// The cache directory could not be created or listed
    #[error("cache directory: {0}")]
    Directory(String),
}
