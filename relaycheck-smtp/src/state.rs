//! Session lifecycle states.

use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Disconnected -> Connected -> Greeted -> [SecureChannel -> Greeted]
///              -> [Authenticated] -> Closed
/// ```
///
/// Any state may move to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Greeted,
    /// Encrypted after STARTTLS, awaiting a fresh greeting.
    SecureChannel,
    Authenticated,
    Closed,
}

impl SessionState {
    #[must_use]
    pub const fn can_connect(self) -> bool {
        matches!(self, Self::Disconnected)
    }

    #[must_use]
    pub const fn can_greet(self) -> bool {
        matches!(self, Self::Connected | Self::SecureChannel)
    }

    #[must_use]
    pub const fn can_upgrade(self) -> bool {
        matches!(self, Self::Greeted)
    }

    #[must_use]
    pub const fn can_authenticate(self) -> bool {
        matches!(self, Self::Greeted | Self::SecureChannel)
    }

    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(
            self,
            Self::Greeted | Self::SecureChannel | Self::Authenticated
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::SecureChannel => "secure channel",
            Self::Authenticated => "authenticated",
            Self::Closed => "closed",
        })
    }
}
