//! Filesystem-backed audio cache for synthesized speech
//!
//! Audio is stored one file per entry, named by a SHA-256 digest of the
//! synthesis parameters. There is no index: presence and freshness come from
//! the filesystem itself (file exists, modification time within the TTL).

mod error;
mod key;
mod maintainer;
mod store;

pub use error::CacheError;
pub use key::{CacheKey, KeyParams};
pub use maintainer::CacheMaintainer;
pub use store::{BlobStore, CacheEntry};
