//! SASL mechanisms for `AUTH`.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::capabilities::Capabilities;

/// Supported `AUTH` mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    Plain,
    Login,
}

impl Mechanism {
    /// Picks PLAIN, then LOGIN, from what the server advertised. Servers that
    /// advertise neither are tried with PLAIN.
    #[must_use]
    pub fn select(capabilities: &Capabilities) -> Self {
        if !capabilities.supports_auth("PLAIN") && capabilities.supports_auth("LOGIN") {
            Self::Login
        } else {
            Self::Plain
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

/// The RFC 4616 initial response: `\0username\0password`, base64-encoded.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// A single base64-encoded LOGIN challenge answer.
#[must_use]
pub fn encode(value: &str) -> String {
    STANDARD.encode(value)
}
