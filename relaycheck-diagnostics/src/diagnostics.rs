//! Connection probes.

use std::time::Instant;

use relaycheck_common::{Configuration, tracing};
use relaycheck_smtp::{HandshakeError, MailSession, SessionOptions, SmtpSession};

use crate::{
    handshake::{self, Transcripts, client_identity},
    report::DiagnosticReport,
};

const SUCCESS_MESSAGE: &str = "SMTP connection test successful!";

/// Exercises a relay's handshake without sending mail.
pub struct ConnectionDiagnostics<'a> {
    config: &'a Configuration,
    identity: String,
}

impl<'a> ConnectionDiagnostics<'a> {
    #[must_use]
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            identity: client_identity(),
        }
    }

    /// Overrides the name announced in `EHLO`.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Probes the configured relay over a fresh network session.
    #[tracing::instrument(level = "info", skip(self), fields(host = %self.config.host, port = self.config.port))]
    pub async fn probe(&self) -> DiagnosticReport {
        let mut session = SmtpSession::new(SessionOptions::from(self.config));
        self.probe_with(&mut session).await
    }

    /// Probes the relay through `session`, which is closed before returning.
    pub async fn probe_with<S: MailSession>(&self, session: &mut S) -> DiagnosticReport {
        let started = Instant::now();
        let mut transcripts = Transcripts::default();
        let outcome = handshake::run(session, self.config, &self.identity, &mut transcripts).await;

        session.close().await;

        let report = match outcome {
            Ok(()) => DiagnosticReport::new(true, SUCCESS_MESSAGE, transcripts.into_inner()),
            Err(error) => {
                tracing::warn!(stage = error.stage(), host = %self.config.host, "Probe failed: {error}");
                DiagnosticReport::new(false, failure_message(&error), transcripts.into_inner())
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            success = report.success,
            host = %self.config.host,
            steps = report.transcripts().len(),
            elapsed_ms,
            "{}",
            report.message
        );
        report
    }
}

fn failure_message(error: &HandshakeError) -> String {
    match error {
        HandshakeError::Connection(_) => "Connection failed".to_string(),
        HandshakeError::Greeting(detail) => format!("HELO failed: {detail}"),
        HandshakeError::TlsUpgrade(detail) => format!("StartTLS failed: {detail}"),
        HandshakeError::Authentication(detail) => format!("Authentication failed: {detail}"),
        HandshakeError::Send(detail) => format!("Send failed: {detail}"),
    }
}
