//! HTTP server configuration

use serde::Deserialize;

/// Configuration for the HTTP endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the server to
    ///
    /// Common values:
    /// - `127.0.0.1:8080` (localhost only, the default)
    /// - `0.0.0.0:8080` (IPv4 any address)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Upper bound on a single request, covering the whole SMTP exchange.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "127.0.0.1:8080".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
