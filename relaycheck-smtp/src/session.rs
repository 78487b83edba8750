//! The SMTP session state machine.

use std::{future::Future, time::Duration};

use relaycheck_common::{
    Configuration, SecurityMode,
    config::ClientTimeouts,
    incoming, internal, outgoing,
    tracing,
};

use crate::{
    auth::{self, Mechanism},
    capabilities::Capabilities,
    client::{ClientError, Response, SmtpClient},
    error::HandshakeError,
    message::{Message, Sender, dot_stuff},
    state::SessionState,
    transcript::{TranscriptLine, TranscriptSink},
};

/// One SMTP connection's protocol lifecycle.
///
/// Operations must be called in handshake order; calling one from the wrong
/// state fails with an error of that operation's kind.
pub trait MailSession: Send {
    /// Opens the connection and reads the `220` banner within `timeout`.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
        sink: &mut dyn TranscriptSink,
    ) -> impl Future<Output = Result<(), HandshakeError>> + Send;

    /// Sends `EHLO`, falling back to `HELO` when it is rejected.
    fn greet(
        &mut self,
        identity: &str,
        sink: &mut dyn TranscriptSink,
    ) -> impl Future<Output = Result<(), HandshakeError>> + Send;

    /// Issues `STARTTLS` and negotiates TLS. The caller greets again after.
    fn upgrade_to_tls(
        &mut self,
        sink: &mut dyn TranscriptSink,
    ) -> impl Future<Output = Result<(), HandshakeError>> + Send;

    fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        sink: &mut dyn TranscriptSink,
    ) -> impl Future<Output = Result<(), HandshakeError>> + Send;

    /// Transmits `message` with `MAIL FROM`, `RCPT TO` and `DATA`.
    fn send(
        &mut self,
        sender: &Sender,
        message: &Message,
        sink: &mut dyn TranscriptSink,
    ) -> impl Future<Output = Result<(), HandshakeError>> + Send;

    /// Sends `QUIT` if a connection is open and drops it. Never fails.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Connection settings that outlive a single operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub timeouts: ClientTimeouts,
    pub implicit_tls: bool,
    pub accept_invalid_certs: bool,
}

impl From<&Configuration> for SessionOptions {
    fn from(config: &Configuration) -> Self {
        Self {
            timeouts: config.timeouts,
            implicit_tls: config.security == SecurityMode::ImplicitTls,
            accept_invalid_certs: config.tls.accept_invalid_certs,
        }
    }
}

/// A [`MailSession`] over a real network connection.
pub struct SmtpSession {
    options: SessionOptions,
    client: Option<SmtpClient>,
    state: SessionState,
    capabilities: Capabilities,
}

impl SmtpSession {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            client: None,
            state: SessionState::default(),
            capabilities: Capabilities::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Extensions from the most recent greeting.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Sends `command` and reads the reply, recording both. `shown` replaces
    /// the command in transcripts and logs when it carries a secret.
    async fn exchange(
        &mut self,
        command: &str,
        shown: Option<&str>,
        timeout: Duration,
        sink: &mut dyn TranscriptSink,
    ) -> Result<Response, ClientError> {
        let shown = shown.unwrap_or(command);
        outgoing!("{}", shown);
        sink.record(TranscriptLine::Sent(shown.to_string()));

        let client = self.client.as_mut().ok_or(ClientError::ConnectionClosed)?;
        let response = tokio::time::timeout(timeout, client.command(command))
            .await
            .map_err(|_| ClientError::Timeout(verb(shown), timeout))??;

        record_response(&response, sink);
        Ok(response)
    }

    fn wrong_state(&self, operation: &str) -> String {
        format!("Cannot {operation} while the session is {}", self.state)
    }
}

impl MailSession for SmtpSession {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        if !self.state.can_connect() {
            let detail = self.wrong_state("connect");
            return Err(fail(HandshakeError::Connection(detail), sink));
        }

        internal!(level = DEBUG, "Connecting to {}:{}", host, port);
        sink.record(TranscriptLine::Notice(format!(
            "Connection: opening to {host}:{port}, timeout={}",
            timeout.as_secs()
        )));

        if self.options.accept_invalid_certs && self.options.implicit_tls {
            tracing::warn!(
                host,
                "SECURITY WARNING: TLS certificate validation is disabled for this connection"
            );
        }

        let options = self.options;
        let opened = tokio::time::timeout(timeout, async {
            let mut client =
                SmtpClient::connect(host, port, options.implicit_tls, options.accept_invalid_certs)
                    .await?;
            let banner = client.read_response().await?;
            Ok::<_, ClientError>((client, banner))
        })
        .await
        .map_err(|_| ClientError::Timeout("Connection", timeout))
        .and_then(|result| result);

        let (client, banner) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                let detail = format!("Failed to connect to server {host}:{port}: {e}");
                return Err(fail(HandshakeError::Connection(detail), sink));
            }
        };

        self.client = Some(client);
        record_response(&banner, sink);

        if banner.code != 220 {
            let detail = format!("Server rejected connection: {banner}");
            return Err(fail(HandshakeError::Connection(detail), sink));
        }

        sink.record(TranscriptLine::Notice("Connection: opened".to_string()));
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn greet(
        &mut self,
        identity: &str,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        if !self.state.can_greet() {
            let detail = self.wrong_state("greet");
            return Err(fail(HandshakeError::Greeting(detail), sink));
        }

        let timeout = self.options.timeouts.command();

        let ehlo = self
            .exchange(&format!("EHLO {identity}"), None, timeout, sink)
            .await
            .map_err(|e| fail(HandshakeError::Greeting(e.to_string()), sink))?;

        if ehlo.is_success() {
            self.capabilities = Capabilities::from_ehlo(&ehlo);
        } else {
            internal!(level = DEBUG, "EHLO rejected ({}), falling back to HELO", ehlo);

            let helo = self
                .exchange(&format!("HELO {identity}"), None, timeout, sink)
                .await
                .map_err(|e| fail(HandshakeError::Greeting(e.to_string()), sink))?;

            if !helo.is_success() {
                let detail = format!("HELO command failed: {helo}");
                return Err(fail(HandshakeError::Greeting(detail), sink));
            }

            self.capabilities = Capabilities::default();
        }

        self.state = SessionState::Greeted;
        Ok(())
    }

    async fn upgrade_to_tls(&mut self, sink: &mut dyn TranscriptSink) -> Result<(), HandshakeError> {
        let already_secure = self.client.as_ref().is_some_and(SmtpClient::is_tls);
        if !self.state.can_upgrade() || already_secure {
            let detail = if already_secure {
                "Connection is already encrypted".to_string()
            } else {
                self.wrong_state("start TLS")
            };
            return Err(fail(HandshakeError::TlsUpgrade(detail), sink));
        }

        if self.options.accept_invalid_certs {
            tracing::warn!(
                "SECURITY WARNING: TLS certificate validation is disabled for this connection"
            );
        }

        let timeout = self.options.timeouts.command();
        let response = self
            .exchange("STARTTLS", None, timeout, sink)
            .await
            .map_err(|e| fail(HandshakeError::TlsUpgrade(e.to_string()), sink))?;

        if response.code != 220 {
            let detail = format!("STARTTLS command failed: {response}");
            return Err(fail(HandshakeError::TlsUpgrade(detail), sink));
        }

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| fail(HandshakeError::TlsUpgrade(ClientError::ConnectionClosed.to_string()), sink))?;

        let upgraded = tokio::time::timeout(timeout, client.upgrade_to_tls())
            .await
            .map_err(|_| ClientError::Timeout("TLS negotiation", timeout))
            .and_then(|result| result);

        if let Err(e) = upgraded {
            self.client = None;
            return Err(fail(HandshakeError::TlsUpgrade(e.to_string()), sink));
        }

        internal!(level = DEBUG, "Connection upgraded to TLS");
        sink.record(TranscriptLine::Notice("TLS negotiation complete".to_string()));

        self.capabilities = Capabilities::default();
        self.state = SessionState::SecureChannel;
        Ok(())
    }

    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        if !self.state.can_authenticate() {
            let detail = self.wrong_state("authenticate");
            return Err(fail(HandshakeError::Authentication(detail), sink));
        }

        let timeout = self.options.timeouts.command();
        let mechanism = Mechanism::select(&self.capabilities);
        internal!(level = DEBUG, "Authenticating as {} with {}", username, mechanism.as_str());

        let auth_error = |e: ClientError| HandshakeError::Authentication(e.to_string());

        let response = match mechanism {
            Mechanism::Plain => {
                let command = format!("AUTH PLAIN {}", auth::plain_response(username, password));
                self.exchange(&command, Some("AUTH PLAIN <credentials hidden>"), timeout, sink)
                    .await
                    .map_err(|e| fail(auth_error(e), sink))?
            }
            Mechanism::Login => {
                let challenge = self
                    .exchange("AUTH LOGIN", None, timeout, sink)
                    .await
                    .map_err(|e| fail(auth_error(e), sink))?;
                if challenge.code != 334 {
                    let detail = format!("AUTH LOGIN command failed: {challenge}");
                    return Err(fail(HandshakeError::Authentication(detail), sink));
                }

                let challenge = self
                    .exchange(&auth::encode(username), None, timeout, sink)
                    .await
                    .map_err(|e| fail(auth_error(e), sink))?;
                if challenge.code != 334 {
                    let detail = format!("Username command failed: {challenge}");
                    return Err(fail(HandshakeError::Authentication(detail), sink));
                }

                self.exchange(&auth::encode(password), Some("<password hidden>"), timeout, sink)
                    .await
                    .map_err(|e| fail(auth_error(e), sink))?
            }
        };

        if response.code != 235 {
            let detail = format!("AUTH {} command failed: {response}", mechanism.as_str());
            return Err(fail(HandshakeError::Authentication(detail), sink));
        }

        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn send(
        &mut self,
        sender: &Sender,
        message: &Message,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        if !self.state.can_send() {
            let detail = self.wrong_state("send");
            return Err(fail(HandshakeError::Send(detail), sink));
        }

        let timeouts = self.options.timeouts;
        let send_error = |e: ClientError| HandshakeError::Send(e.to_string());

        let response = self
            .exchange(&format!("MAIL FROM:<{}>", sender.address), None, timeouts.command(), sink)
            .await
            .map_err(|e| fail(send_error(e), sink))?;
        if !response.is_success() {
            let detail = format!("MAIL FROM command failed: {response}");
            return Err(fail(HandshakeError::Send(detail), sink));
        }

        let response = self
            .exchange(&format!("RCPT TO:<{}>", message.to), None, timeouts.command(), sink)
            .await
            .map_err(|e| fail(send_error(e), sink))?;
        if !response.is_success() {
            let detail = format!("RCPT TO command failed: {response}");
            return Err(fail(HandshakeError::Send(detail), sink));
        }

        let response = self
            .exchange("DATA", None, timeouts.command(), sink)
            .await
            .map_err(|e| fail(send_error(e), sink))?;
        if response.code != 354 {
            let detail = format!("DATA command failed: {response}");
            return Err(fail(HandshakeError::Send(detail), sink));
        }

        let body = dot_stuff(&message.render(sender));
        outgoing!("<message body, {} bytes>", body.len());

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| fail(send_error(ClientError::ConnectionClosed), sink))?;
        let data_timeout = timeouts.data();
        let response = tokio::time::timeout(data_timeout, client.send_data(&body))
            .await
            .map_err(|_| ClientError::Timeout("DATA", data_timeout))
            .and_then(|result| result)
            .map_err(|e| fail(send_error(e), sink))?;

        record_response(&response, sink);
        if !response.is_success() {
            let detail = format!("DATA END command failed: {response}");
            return Err(fail(HandshakeError::Send(detail), sink));
        }

        internal!(level = INFO, "Message accepted for {}", message.to);
        Ok(())
    }

    async fn close(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::Closed);

        let Some(mut client) = self.client.take() else {
            return;
        };

        let quit_timeout = self.options.timeouts.quit();
        outgoing!("QUIT");
        match tokio::time::timeout(quit_timeout, client.command("QUIT")).await {
            Ok(Ok(response)) => {
                incoming!("{}", response);
            }
            Ok(Err(e)) => {
                tracing::warn!(%state, "QUIT failed: {e}");
            }
            Err(_) => {
                tracing::warn!(%state, timeout = ?quit_timeout, "QUIT timed out");
            }
        }
    }
}

fn record_response(response: &Response, sink: &mut dyn TranscriptSink) {
    for line in response.raw_lines() {
        incoming!("{}", line);
        sink.record(TranscriptLine::Received(line));
    }
}

/// Records `error` as the step's closing line and hands it back.
fn fail(error: HandshakeError, sink: &mut dyn TranscriptSink) -> HandshakeError {
    tracing::debug!(stage = error.stage(), "{error}");
    sink.record(TranscriptLine::Error(error.to_string()));
    error
}

/// The command verb, for timeout messages.
fn verb(command: &str) -> &'static str {
    match command.split_whitespace().next().map(str::to_ascii_uppercase).as_deref() {
        Some("EHLO") => "EHLO",
        Some("HELO") => "HELO",
        Some("STARTTLS") => "STARTTLS",
        Some("AUTH") => "AUTH",
        Some("MAIL") => "MAIL FROM",
        Some("RCPT") => "RCPT TO",
        Some("DATA") => "DATA",
        _ => "Command",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Transcript;

    #[tokio::test]
    async fn test_greet_before_connect_fails_with_greeting_error() {
        let mut session = SmtpSession::new(SessionOptions::default());
        let mut transcript = Transcript::new();

        let err = session.greet("client", &mut transcript).await.unwrap_err();

        assert!(matches!(err, HandshakeError::Greeting(_)));
        assert_eq!(err.to_string(), "Cannot greet while the session is disconnected");
        assert_eq!(
            transcript.lines(),
            [TranscriptLine::Error(err.to_string())]
        );
    }

    #[tokio::test]
    async fn test_out_of_order_operations_keep_their_kind() {
        let mut session = SmtpSession::new(SessionOptions::default());
        let mut transcript = Transcript::new();

        assert!(matches!(
            session.upgrade_to_tls(&mut transcript).await,
            Err(HandshakeError::TlsUpgrade(_))
        ));
        assert!(matches!(
            session.authenticate("u", "p", &mut transcript).await,
            Err(HandshakeError::Authentication(_))
        ));
        let message = Message::new("a@b.com", "Hi", "Hello");
        assert!(matches!(
            session
                .send(&Sender::new("x@y.com", None), &message, &mut transcript)
                .await,
            Err(HandshakeError::Send(_))
        ));
    }

    #[tokio::test]
    async fn test_close_without_connection_is_quiet() {
        let mut session = SmtpSession::new(SessionOptions::default());
        session.close().await;
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_options_from_configuration() {
        let config = Configuration {
            security: SecurityMode::ImplicitTls,
            ..Configuration::default()
        };
        let options = SessionOptions::from(&config);
        assert!(options.implicit_tls);
        assert!(!options.accept_invalid_certs);

        let config = Configuration {
            security: SecurityMode::StartTls,
            ..Configuration::default()
        };
        assert!(!SessionOptions::from(&config).implicit_tls);
    }

    #[test]
    fn test_verb() {
        assert_eq!(verb("AUTH PLAIN <credentials hidden>"), "AUTH");
        assert_eq!(verb("MAIL FROM:<a@b.com>"), "MAIL FROM");
        assert_eq!(verb("<password hidden>"), "Command");
    }
}
