//! Partial edits of the operator-facing settings.

use serde::Deserialize;

use super::{Configuration, SecurityMode};

/// The fields an operator edits by hand. Absent fields keep their current
/// value; timeouts and TLS policy are file-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub security: Option<SecurityMode>,
    /// An empty username disables authentication.
    pub username: Option<String>,
    /// An empty password keeps the stored one when the result is stored.
    pub password: Option<String>,
    pub from_email: Option<String>,
    /// An empty name removes the display name.
    pub from_name: Option<String>,
}

impl ConfigUpdate {
    /// `current` with this update's fields laid over it.
    #[must_use]
    pub fn apply(self, current: &Configuration) -> Configuration {
        let mut config = current.clone();

        if let Some(host) = self.host {
            config.host = host.trim().to_string();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(security) = self.security {
            config.security = security;
        }
        if let Some(username) = self.username {
            config.username = non_empty(&username);
        }
        if self.password.is_some() {
            config.password = self.password;
        }
        if let Some(from_email) = self.from_email {
            config.from_email = from_email.trim().to_string();
        }
        if let Some(from_name) = self.from_name {
            config.from_name = non_empty(&from_name);
        }

        config
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
