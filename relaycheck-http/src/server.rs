//! Diagnostics HTTP server

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use relaycheck_common::{ConfigError, ConfigProvider, ConfigUpdate, Configuration, Mailbox, Signal};
use relaycheck_diagnostics::{
    ConnectionDiagnostics, DEFAULT_BODY, DEFAULT_SUBJECT, DispatchResult, MessageDispatcher,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{HttpConfig, HttpError};

type SharedProvider = Arc<dyn ConfigProvider>;

/// Body of `POST /send-test-email`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
    pub to: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// HTML body of the message.
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_message() -> String {
    DEFAULT_BODY.to_string()
}

#[derive(Debug, Serialize)]
struct ConfigView {
    #[serde(flatten)]
    config: Configuration,
    auth: bool,
}

/// Outcome of `PUT /config`.
#[derive(Debug, Serialize)]
struct SaveResult {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl SaveResult {
    fn failed(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
        }
    }
}

/// Builds the endpoint router without binding a listener.
pub fn router(provider: SharedProvider, request_timeout: Duration) -> Router {
    Router::new()
        .route("/test-connection", post(test_connection_handler))
        .route("/send-test-email", post(send_test_email_handler))
        .route("/config", get(config_handler).put(update_config_handler))
        .with_state(provider)
        .layer(TimeoutLayer::new(request_timeout))
}

/// HTTP front end for probes and test dispatch
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    /// Binds the listener and builds the router.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn new(config: HttpConfig, provider: SharedProvider) -> Result<Self, HttpError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| HttpError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(address = %config.listen_address, "HTTP server bound successfully");

        let router = router(provider, Duration::from_secs(config.request_timeout_secs));

        Ok(Self { listener, router })
    }

    /// Address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, HttpError> {
        self.listener
            .local_addr()
            .map_err(|e| HttpError::ServerError(e.to_string()))
    }

    /// Runs the server until a shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HttpError> {
        tracing::info!("HTTP server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .map_err(|e| HttpError::ServerError(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Probes the relay. The outcome is carried in the body, so the status is
/// always 200.
async fn test_connection_handler(State(provider): State<SharedProvider>) -> Response {
    let config = provider.current();
    let report = ConnectionDiagnostics::new(&config).probe().await;
    Json(report).into_response()
}

async fn send_test_email_handler(
    State(provider): State<SharedProvider>,
    Json(request): Json<SendRequest>,
) -> Response {
    let to = match Mailbox::parse(&request.to) {
        Ok(mailbox) => mailbox.to_string(),
        Err(e) => {
            tracing::debug!(to = %request.to, "Rejected test message recipient: {e}");
            let result = DispatchResult {
                success: false,
                message: format!("Invalid recipient address: {e}"),
            };
            return (StatusCode::BAD_REQUEST, Json(result)).into_response();
        }
    };

    let config = provider.current();
    let result = MessageDispatcher::new(&config)
        .send(&to, &request.subject, &request.message)
        .await;
    Json(result).into_response()
}

/// Applies an edit of the operator-facing settings and stores it.
async fn update_config_handler(
    State(provider): State<SharedProvider>,
    Json(update): Json<ConfigUpdate>,
) -> Response {
    let config = update.apply(&provider.current());

    match provider.store(config) {
        Ok(()) => {
            let result = SaveResult {
                success: true,
                message: "Configuration updated successfully!".to_string(),
                errors: Vec::new(),
            };
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(ConfigError::Invalid(errors)) => {
            let result = SaveResult::failed("Configuration was not saved", errors);
            (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response()
        }
        Err(ConfigError::ReadOnly) => {
            let result = SaveResult::failed("Configuration is read-only", Vec::new());
            (StatusCode::CONFLICT, Json(result)).into_response()
        }
        Err(e) => {
            tracing::error!("Unable to store configuration: {e}");
            let result = SaveResult::failed(
                "Failed to write configuration file. Check permissions.",
                Vec::new(),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response()
        }
    }
}

async fn config_handler(State(provider): State<SharedProvider>) -> Response {
    let config = provider.current();
    let view = ConfigView {
        auth: config.requires_auth(),
        config: config.redacted(),
    };
    Json(view).into_response()
}
