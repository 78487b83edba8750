//! SMTP relay configuration.
//!
//! A [`Configuration`] is an immutable snapshot handed to every probe and
//! dispatch. It is usually loaded from a RON file through a
//! [`FileConfigProvider`]:
//!
//! ```ron
//! (
//!     host: "mail.example.com",
//!     port: 587,
//!     security: tls,
//!     username: Some("relay"),
//!     password: Some("secret"),
//!     from_email: "noreply@example.com",
//!     from_name: Some("Example"),
//! )
//! ```

pub mod provider;
pub mod timeouts;
pub mod tls;
pub mod update;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use provider::{ConfigProvider, FileConfigProvider, StaticConfigProvider};
pub use timeouts::ClientTimeouts;
pub use tls::TlsCertificatePolicy;
pub use update::ConfigUpdate;

use crate::{ConfigError, Mailbox};

const REDACTED: &str = "********";

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Plaintext throughout.
    #[default]
    None,
    /// TLS from the first byte (usually port 465).
    #[serde(rename = "ssl", alias = "implicit_tls")]
    ImplicitTls,
    /// Plaintext connection upgraded with STARTTLS (usually port 587).
    #[serde(rename = "tls", alias = "starttls")]
    StartTls,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::ImplicitTls => "ssl",
            Self::StartTls => "tls",
        })
    }
}

impl FromStr for SecurityMode {
    type Err = ConfigError;

    /// Accepts the configuration names, and an empty string for [`Self::None`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "ssl" | "implicit_tls" => Ok(Self::ImplicitTls),
            "tls" | "starttls" => Ok(Self::StartTls),
            other => Err(ConfigError::Invalid(vec![format!(
                "SMTP Security must be one of none, ssl or tls, not '{other}'"
            )])),
        }
    }
}

/// Connection and sender settings for the relay under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    #[serde(default)]
    pub security: SecurityMode,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Envelope sender and `From` address.
    #[serde(default)]
    pub from_email: String,

    /// Display name for the `From` header.
    #[serde(default)]
    pub from_name: Option<String>,

    #[serde(default)]
    pub timeouts: ClientTimeouts,

    #[serde(default)]
    pub tls: TlsCertificatePolicy,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            security: SecurityMode::default(),
            username: None,
            password: None,
            from_email: String::default(),
            from_name: None,
            timeouts: ClientTimeouts::default(),
            tls: TlsCertificatePolicy::default(),
        }
    }
}

impl Configuration {
    /// The username and password, only when both are non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Whether a session against this relay authenticates.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.credentials().is_some()
    }

    /// Checks the fields an operator edits by hand.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every failing field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("SMTP Host is required".to_string());
        }

        if self.port == 0 {
            errors.push("SMTP Port must be a valid number".to_string());
        }

        if Mailbox::parse(&self.from_email).is_err() {
            errors.push("From Email must be a valid email address".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// A copy safe to display, with the password masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            password: self
                .password
                .as_ref()
                .filter(|p| !p.is_empty())
                .map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }
}

mod defaults {
    pub fn host() -> String {
        "localhost".to_string()
    }

    pub const fn port() -> u16 {
        25
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn valid() -> Configuration {
        Configuration {
            from_email: "noreply@example.com".to_string(),
            ..Configuration::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config: Configuration = ron::from_str(r#"(from_email: "a@b.com")"#).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 25);
        assert_eq!(config.security, SecurityMode::None);
        assert!(!config.tls.accept_invalid_certs);
        assert!(!config.requires_auth());
    }

    #[test]
    fn test_security_mode_names() {
        let config: Configuration =
            ron::from_str(r#"(security: ssl, from_email: "a@b.com")"#).unwrap();
        assert_eq!(config.security, SecurityMode::ImplicitTls);

        let config: Configuration =
            ron::from_str(r#"(security: tls, from_email: "a@b.com")"#).unwrap();
        assert_eq!(config.security, SecurityMode::StartTls);
        assert_eq!(config.security.to_string(), "tls");
    }

    #[test]
    fn test_security_mode_from_str() {
        assert_eq!("".parse::<SecurityMode>().unwrap(), SecurityMode::None);
        assert_eq!("SSL".parse::<SecurityMode>().unwrap(), SecurityMode::ImplicitTls);
        assert_eq!("starttls".parse::<SecurityMode>().unwrap(), SecurityMode::StartTls);
        assert!("smime".parse::<SecurityMode>().is_err());
    }

    #[test]
    fn test_credentials_require_both() {
        let mut config = valid();
        config.username = Some("user".to_string());
        assert_eq!(config.credentials(), None);

        config.password = Some(String::new());
        assert_eq!(config.credentials(), None);

        config.password = Some("pass".to_string());
        assert_eq!(config.credentials(), Some(("user", "pass")));

        config.username = Some(String::new());
        assert!(!config.requires_auth());
    }

    #[test]
    fn test_validate_accepts_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_field() {
        let config = Configuration {
            host: "  ".to_string(),
            port: 0,
            from_email: "not-an-address".to_string(),
            ..Configuration::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.messages(),
            &[
                "SMTP Host is required".to_string(),
                "SMTP Port must be a valid number".to_string(),
                "From Email must be a valid email address".to_string(),
            ]
        );
    }

    #[test]
    fn test_redacted_masks_password() {
        let mut config = valid();
        config.username = Some("user".to_string());
        config.password = Some("hunter2".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.password.as_deref(), Some("********"));
        assert_eq!(redacted.username.as_deref(), Some("user"));

        config.password = None;
        assert_eq!(config.redacted().password, None);
    }
}
