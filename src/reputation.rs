//! Reputation signal: does the address have a public avatar?

use std::time::Duration;

use thiserror::Error;

use crate::address::Address;

const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar";

/// Weak legitimacy signal for a single address.
pub trait ReputationChecker: Send + Sync {
    fn has_reputation(&self, address: &Address) -> bool;
}

/// Never reports a reputation; used when lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReputation;

impl ReputationChecker for NoReputation {
    fn has_reputation(&self, _address: &Address) -> bool {
        false
    }
}

#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

/// Looks up a Gravatar for the address; a 404 means no avatar.
#[derive(Debug, Clone)]
pub struct GravatarChecker {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GravatarChecker {
    pub fn new(timeout: Duration) -> Result<Self, ReputationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("mailverify/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ReputationError::Client { source })?;
        Ok(Self {
            client,
            base_url: GRAVATAR_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn avatar_url(&self, email: &str) -> String {
        format!("{}/{}?d=404", self.base_url, gravatar_hash(email))
    }
}

impl ReputationChecker for GravatarChecker {
    fn has_reputation(&self, address: &Address) -> bool {
        let url = self.avatar_url(&address.address());
        match self.client.head(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(address = %address, error = %err, "avatar lookup failed");
                false
            }
        }
    }
}

/// Lower-hex MD5 of the trimmed, lower-cased address.
pub fn gravatar_hash(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    format!("{:x}", md5::compute(normalized.as_bytes()))
}
