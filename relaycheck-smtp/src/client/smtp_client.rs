//! Line-level SMTP client.

use tokio::net::TcpStream;

use super::{
    connection::ClientConnection,
    error::{ClientError, Result},
    response::Response,
};

/// Initial size of the read buffer for SMTP responses.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Sends commands and reads replies over a single connection.
///
/// The client knows nothing about session state; ordering and timeouts are
/// the caller's concern.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    server_domain: String,
    accept_invalid_certs: bool,
}

impl SmtpClient {
    /// Opens a TCP connection to `host:port`, wrapping it in TLS straight
    /// away when `implicit_tls` is set. The banner is left unread.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the TLS handshake fails.
    pub async fn connect(
        host: &str,
        port: u16,
        implicit_tls: bool,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;

        let mut connection = ClientConnection::Plain(stream);
        if implicit_tls {
            connection = connection.upgrade_to_tls(host, accept_invalid_certs).await?;
        }

        Ok(Self {
            connection: Some(connection),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            server_domain: host.to_string(),
            accept_invalid_certs,
        })
    }

    /// Returns `true` once the connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.connection.as_ref().is_some_and(ClientConnection::is_tls)
    }

    /// Sends a command line, appending CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;

        connection.send(format!("{command}\r\n").as_bytes()).await?;
        connection.flush().await
    }

    /// Sends a command and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.send_command(command).await?;
        self.read_response().await
    }

    /// Sends an already dot-stuffed message body followed by the terminating
    /// `.` line, then reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn send_data(&mut self, data: &str) -> Result<Response> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;

        connection.send(data.as_bytes()).await?;

        if !data.ends_with("\r\n") {
            connection.send(b"\r\n").await?;
        }

        connection.send(b".\r\n").await?;
        connection.flush().await?;

        self.read_response().await
    }

    /// Upgrades the connection to TLS after the server accepted `STARTTLS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS handshake fails; the connection is lost in
    /// that case.
    pub async fn upgrade_to_tls(&mut self) -> Result<()> {
        let connection = self
            .connection
            .take()
            .ok_or(ClientError::ConnectionClosed)?;

        self.buffer_pos = 0;
        self.connection = Some(
            connection
                .upgrade_to_tls(&self.server_domain, self.accept_invalid_certs)
                .await?,
        );

        Ok(())
    }

    /// Reads a complete reply from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the reply is malformed.
    pub async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;
                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.buffer_pos..]).await?;
            self.buffer_pos += n;
        }
    }
}
