use std::path::PathBuf;

use serde::Deserialize;

/// On-disk audio cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioCacheConfig {
    /// Whether synthesized audio is cached
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Directory holding one file per cached entry
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Entries older than this are never served
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Sweep expired entries every N requests (0 disables the sweep)
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval: u64,
}

impl Default for AudioCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: default_directory(),
            ttl_seconds: default_ttl_seconds(),
            maintenance_interval: default_maintenance_interval(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("audio_cache")
}

#[allow(clippy::missing_const_for_fn)]
fn default_ttl_seconds() -> u64 {
    3600
}

#[allow(clippy::missing_const_for_fn)]
fn default_maintenance_interval() -> u64 {
    10
}
