//! HTTP endpoints for relaycheck
//!
//! # Endpoints
//!
//! - **`POST /test-connection`** - Probe the configured relay and return the
//!   diagnostic report
//! - **`POST /send-test-email`** - Send a test message; body
//!   `{"to": "...", "subject": "...", "message": "..."}`
//! - **`GET /config`** - The current configuration with the password redacted
//! - **`PUT /config`** - Store an edit of the host, port, security,
//!   credentials and sender; the password is kept when omitted
//!
//! Each request takes a fresh configuration snapshot from the provider.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use relaycheck_common::config::StaticConfigProvider;
//! use relaycheck_http::{HttpConfig, HttpServer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(StaticConfigProvider::default());
//! let server = HttpServer::new(HttpConfig::default(), provider).await?;
//!
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod server;

pub use config::HttpConfig;
pub use error::HttpError;
pub use server::{HttpServer, SendRequest, router};
