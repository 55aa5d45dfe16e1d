use std::time::Duration;

use crate::address::ValidationMode;
use crate::smtp::SmtpOptions;

/// Tuning knobs of a [`Verifier`](super::Verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Upper bound on concurrently verified domains.
    pub max_workers: usize,
    /// Name announced in EHLO; defaults to the machine hostname.
    pub hostname: Option<String>,
    /// Envelope sender for probes; defaults to `postmaster@<hostname>`.
    pub source_address: Option<String>,
    pub catch_all_attempts: u32,
    pub recipient_attempts: u32,
    pub validation_mode: ValidationMode,
    pub reputation_timeout: Duration,
    pub smtp: SmtpOptions,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_workers: 8,
            hostname: None,
            source_address: None,
            catch_all_attempts: 5,
            recipient_attempts: 5,
            validation_mode: ValidationMode::Strict,
            reputation_timeout: Duration::from_secs(5),
            smtp: SmtpOptions::default(),
        }
    }
}

impl VerifierOptions {
    pub fn helo_name(&self) -> String {
        if let Some(name) = self.hostname.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub fn envelope_sender(&self, helo_name: &str) -> String {
        match self.source_address.as_deref().map(str::trim) {
            Some(sender) if !sender.is_empty() => sender.to_string(),
            _ => format!("postmaster@{helo_name}"),
        }
    }
}
