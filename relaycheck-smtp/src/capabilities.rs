//! ESMTP extensions advertised in an EHLO reply.

use crate::client::Response;

/// Extension keywords from an EHLO reply, keyed by upper-cased keyword.
///
/// The first reply line is the server's greeting domain and is not an
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    extensions: Vec<(String, Vec<String>)>,
}

impl Capabilities {
    /// Parses an EHLO reply. A `HELO` reply yields no extensions.
    #[must_use]
    pub fn from_ehlo(response: &Response) -> Self {
        let extensions = response
            .lines
            .iter()
            .skip(1)
            .filter_map(|line| {
                let mut words = line.split_whitespace();
                let keyword = words.next()?.to_ascii_uppercase();
                Some((keyword, words.map(str::to_ascii_uppercase).collect()))
            })
            .collect();

        Self { extensions }
    }

    /// Returns `true` if `keyword` was advertised.
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(keyword))
    }

    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports("STARTTLS")
    }

    /// Mechanisms listed by the `AUTH` extension, upper-cased.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[String] {
        self.extensions
            .iter()
            .find(|(name, _)| name == "AUTH")
            .map_or(&[], |(_, params)| params.as_slice())
    }

    /// Returns `true` if `mechanism` is listed by the `AUTH` extension.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.auth_mechanisms()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mechanism))
    }
}
