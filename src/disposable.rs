//! Disposable-domain detection.

use std::collections::HashSet;

use phf::phf_set;

/// Tells whether a domain hands out throwaway mailboxes.
pub trait DisposableChecker: Send + Sync {
    fn is_disposable(&self, domain: &str) -> bool;
}

// Providers seen most often in sign-up abuse. Extend at runtime with
// `StaticDisposableList::with_domains` / `from_list`.
const KNOWN_DISPOSABLE: phf::Set<&'static str> = phf_set! {
    "10minutemail.com",
    "20minutemail.com",
    "33mail.com",
    "anonbox.net",
    "burnermail.io",
    "discard.email",
    "dispostable.com",
    "dropmail.me",
    "emailondeck.com",
    "fakeinbox.com",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.biz",
    "guerrillamail.com",
    "guerrillamail.de",
    "guerrillamail.info",
    "guerrillamail.net",
    "guerrillamail.org",
    "harakirimail.com",
    "incognitomail.org",
    "jetable.org",
    "mailcatch.com",
    "maildrop.cc",
    "mailinator.com",
    "mailnesia.com",
    "mintemail.com",
    "moakt.com",
    "mohmal.com",
    "mytemp.email",
    "sharklasers.com",
    "spam4.me",
    "spamgourmet.com",
    "temp-mail.org",
    "tempail.com",
    "tempmail.dev",
    "tempmailo.com",
    "tempr.email",
    "throwawaymail.com",
    "trashmail.com",
    "trashmail.de",
    "yopmail.com",
    "yopmail.fr",
};

/// Compile-time list of well-known providers plus optional extra domains.
///
/// A domain matches when it, or any of its parent domains, is listed:
/// `inbox.mailinator.com` is disposable.
#[derive(Debug, Clone, Default)]
pub struct StaticDisposableList {
    extra: HashSet<String>,
}

impl StaticDisposableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra.extend(
            domains
                .into_iter()
                .map(|d| normalize(d.as_ref()))
                .filter(|d| !d.is_empty()),
        );
        self
    }

    /// Adds domains from a text list: one per line, blank lines and `#`
    /// comments ignored.
    pub fn from_list(text: &str) -> Self {
        let domains = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .map(str::trim)
            .filter(|line| !line.is_empty());
        Self::new().with_domains(domains)
    }

    pub fn extra_len(&self) -> usize {
        self.extra.len()
    }

    fn contains(&self, candidate: &str) -> bool {
        KNOWN_DISPOSABLE.contains(candidate) || self.extra.contains(candidate)
    }
}

impl DisposableChecker for StaticDisposableList {
    fn is_disposable(&self, domain: &str) -> bool {
        let domain = normalize(domain);
        let mut candidate = domain.as_str();
        loop {
            if self.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                // Bare TLDs are never listed.
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
