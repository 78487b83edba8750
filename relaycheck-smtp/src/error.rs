//! Handshake error taxonomy.

use thiserror::Error;

use crate::transcript::Step;

/// The failure of one session operation.
///
/// `Display` yields only the detail (server reply text where one was
/// involved), so callers can prefix it with their own stage label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Greeting(String),

    #[error("{0}")]
    TlsUpgrade(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Send(String),
}

impl HandshakeError {
    /// The label used in user-facing failure messages.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection",
            Self::Greeting(_) => "HELO",
            Self::TlsUpgrade(_) => "StartTLS",
            Self::Authentication(_) => "Authentication",
            Self::Send(_) => "Send",
        }
    }

    /// The transcript step this error belongs to, if any.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::Connection(_) => Some(Step::Connection),
            Self::Greeting(_) => Some(Step::Hello),
            Self::TlsUpgrade(_) => Some(Step::Tls),
            Self::Authentication(_) => Some(Step::Auth),
            Self::Send(_) => None,
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Connection(detail)
            | Self::Greeting(detail)
            | Self::TlsUpgrade(detail)
            | Self::Authentication(detail)
            | Self::Send(detail) => detail,
        }
    }
}
