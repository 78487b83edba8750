//! TLS certificate validation settings.

use serde::{Deserialize, Serialize};

/// Controls whether invalid or self-signed server certificates are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TlsCertificatePolicy {
    /// Accept invalid TLS certificates (self-signed, expired, wrong host).
    ///
    /// **SECURITY WARNING**: disables certificate validation and exposes the
    /// session, including any credentials, to man-in-the-middle attacks.
    /// Only enable this against test servers.
    ///
    /// Default: `false`
    #[serde(default)]
    pub accept_invalid_certs: bool,
}
