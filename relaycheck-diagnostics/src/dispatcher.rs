//! Test message dispatch.

use std::time::Instant;

use relaycheck_common::{Configuration, Mailbox, tracing};
use relaycheck_smtp::{Discard, MailSession, Message, Sender, SessionOptions, SmtpSession};

use crate::{
    handshake::{self, Transcripts, client_identity},
    report::DispatchResult,
};

pub const DEFAULT_SUBJECT: &str = "Test email from relaycheck";
pub const DEFAULT_BODY: &str = "This is a test email sent from relaycheck.";

/// Sends a single test message through the configured relay.
pub struct MessageDispatcher<'a> {
    config: &'a Configuration,
    identity: String,
}

impl<'a> MessageDispatcher<'a> {
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

    /// Builds the message and sends it over a fresh network session.
    ///
    /// The plain-text alternative is `html_body` with its markup removed.
    #[tracing::instrument(level = "info", skip(self, subject, html_body), fields(host = %self.config.host))]
    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> DispatchResult {
        let mut session = SmtpSession::new(SessionOptions::from(self.config));
        self.send_with(&mut session, Message::new(to, subject, html_body))
            .await
    }

    /// Sends `message` through `session`, which is closed before returning.
    ///
    /// The recipient and the configured sender go on the wire in their
    /// canonical `local@domain` form; either failing to parse ends the
    /// dispatch before the handshake.
    pub async fn send_with<S: MailSession>(&self, session: &mut S, message: Message) -> DispatchResult {
        let started = Instant::now();

        let outcome = match self.envelope(message) {
            Ok((sender, message)) => self
                .transact(session, &sender, &message)
                .await
                .map(|()| message.to),
            Err(reason) => Err(reason),
        };

        session.close().await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(to) => {
                tracing::info!(%to, host = %self.config.host, elapsed_ms, "Test message sent");
                DispatchResult::sent()
            }
            Err(reason) => {
                tracing::warn!(host = %self.config.host, elapsed_ms, "{reason}");
                DispatchResult::failed(reason)
            }
        }
    }

    fn envelope(&self, message: Message) -> Result<(Sender, Message), String> {
        let from = Mailbox::parse(&self.config.from_email)
            .map_err(|e| format!("Invalid sender address: {e}"))?;
        let to = Mailbox::parse(&message.to)
            .map_err(|e| format!("Invalid recipient address: {e}"))?;

        let sender = Sender::new(from.to_string(), self.config.from_name.clone());
        Ok((
            sender,
            Message {
                to: to.to_string(),
                ..message
            },
        ))
    }

    async fn transact<S: MailSession>(
        &self,
        session: &mut S,
        sender: &Sender,
        message: &Message,
    ) -> Result<(), String> {
        handshake::run(session, self.config, &self.identity, &mut Transcripts::default())
            .await
            .map_err(|error| format!("{} failed: {error}", error.stage()))?;

        session
            .send(sender, message, &mut Discard)
            .await
            .map_err(|error| format!("Message could not be sent. Mailer Error: {error}"))
    }
}
