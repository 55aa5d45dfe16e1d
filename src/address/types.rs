use std::fmt;

use thiserror::Error;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Strict,
    Relaxed,
}

/// A syntactically valid address, split into its parts.
///
/// `domain` holds the lower-cased ASCII (IDNA) form, which is what the
/// verifier batches on and what SMTP probes are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    raw: String,
    username: String,
    domain: String,
}

impl Address {
    pub(crate) fn new(raw: &str, username: &str, domain: String) -> Self {
        Self {
            raw: raw.to_string(),
            username: username.to_string(),
            domain,
        }
    }

    /// The input exactly as it was handed to the parser.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `username@domain`, with the normalised domain.
    pub fn address(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.domain)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid email address '{raw}': {}", reasons.join("; "))]
    Invalid { raw: String, reasons: Vec<String> },
}

impl AddressError {
    pub(crate) fn invalid(raw: &str, reasons: Vec<String>) -> Self {
        Self::Invalid {
            raw: raw.to_string(),
            reasons,
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Invalid { reasons, .. } => reasons,
        }
    }
}
