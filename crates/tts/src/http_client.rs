use std::{sync::OnceLock, time::Duration};

use reqwest::Client;

/// User agent sent to synthesis providers
const USER_AGENT: &str = concat!("recital/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by all synthesis providers so connections are reused
pub fn http_client() -> Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(120))
                .pool_idle_timeout(Some(Duration::from_secs(30)))
                .tcp_nodelay(true)
                .tcp_keepalive(Some(Duration::from_secs(60)))
                .build()
                .unwrap_or_else(|e| {
                    tracing::error!("failed to build tuned HTTP client, using defaults: {e}");
                    Client::new()
                })
        })
        .clone()
}
