use std::fmt;
use std::io;

use thiserror::Error;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::stream::SmtpReply;

/// Closed set of reasons a session could not be established.
///
/// Variants are listed in the precedence used by
/// [`FailureKind::from_message`].
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    HostNotFound,
    Unavailable,
    Blocked,
    Other,
}

impl FailureKind {
    /// Text heuristic for errors that carry no structural hint. Matches are
    /// case-sensitive and the first one wins.
    pub fn from_message(text: &str) -> Self {
        if text.contains("timeout") {
            Self::Timeout
        } else if text.contains("no such host") {
            Self::HostNotFound
        } else if text.contains("unavailable") {
            Self::Unavailable
        } else if text.contains("block") {
            Self::Blocked
        } else {
            Self::Other
        }
    }
}

/// Step of the SMTP dialogue an error or reply belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpStage {
    Connect,
    Greeting,
    Ehlo,
    StartTls,
    MailFrom,
    RcptTo,
    Rset,
    Quit,
}

impl fmt::Display for SmtpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
        })
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: io::Error,
    },
    #[error("lookup {domain}: no such host")]
    HostNotFound { domain: String },
    #[error("MX lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
    #[error("address lookup for {host} failed: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("no reachable mail server for {domain}")]
    NoMailServers { domain: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error with {host} during {stage}: {source}")]
    Io {
        host: String,
        stage: SmtpStage,
        #[source]
        source: io::Error,
    },
    #[error("TLS handshake with {host} failed: {message}")]
    Tls { host: String, message: String },
    #[error("{host} refused {stage} with {code} {message}")]
    Refused {
        host: String,
        stage: SmtpStage,
        code: u16,
        message: String,
    },
    #[error("protocol error with {host}: {message}")]
    Protocol { host: String, message: String },
}

impl TransportError {
    pub(crate) fn resolver_init(source: io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn host_not_found(domain: &str) -> Self {
        Self::HostNotFound {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn lookup(domain: &str, source: ResolveError) -> Self {
        Self::Lookup {
            domain: domain.to_string(),
            source,
        }
    }

    pub(crate) fn resolve(host: &str, source: io::Error) -> Self {
        Self::Resolve {
            host: host.to_string(),
            source,
        }
    }

    pub(crate) fn io(host: &str, stage: SmtpStage, source: io::Error) -> Self {
        Self::Io {
            host: host.to_string(),
            stage,
            source,
        }
    }

    pub(crate) fn refused(host: &str, stage: SmtpStage, reply: &SmtpReply) -> Self {
        Self::Refused {
            host: host.to_string(),
            stage,
            code: reply.code,
            message: reply.message.replace('\n', " "),
        }
    }

    pub(crate) fn protocol(host: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            host: host.to_string(),
            message: message.into(),
        }
    }

    /// Structural classification of the failure. Falls back to
    /// [`FailureKind::from_message`] on the rendered error when the variant
    /// alone is not conclusive.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::HostNotFound { .. } => FailureKind::HostNotFound,
            Self::NoMailServers { .. } => FailureKind::Unavailable,
            Self::Lookup { source, .. } => match source.kind() {
                ResolveErrorKind::Timeout => FailureKind::Timeout,
                _ => FailureKind::from_message(&source.to_string()),
            },
            Self::Connect { source, .. } | Self::Io { source, .. } | Self::Resolve { source, .. } => {
                io_kind(source)
            }
            Self::Refused {
                stage,
                code,
                message,
                ..
            } => refused_kind(*stage, *code, message),
            Self::ResolverInit { .. } | Self::Tls { .. } | Self::Protocol { .. } => {
                FailureKind::from_message(&self.to_string())
            }
        }
    }
}

fn io_kind(err: &io::Error) -> FailureKind {
    use io::ErrorKind::*;
    match err.kind() {
        TimedOut | WouldBlock => FailureKind::Timeout,
        ConnectionRefused | ConnectionReset | ConnectionAborted | HostUnreachable
        | NetworkUnreachable | UnexpectedEof => FailureKind::Unavailable,
        _ => FailureKind::from_message(&err.to_string()),
    }
}

fn refused_kind(stage: SmtpStage, code: u16, message: &str) -> FailureKind {
    if mentions_block(message) {
        return FailureKind::Blocked;
    }
    match (stage, code) {
        (_, 421) => FailureKind::Unavailable,
        (SmtpStage::Greeting, 400..=499 | 554) => FailureKind::Unavailable,
        _ => FailureKind::from_message(message),
    }
}

pub(crate) fn mentions_block(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["block", "blacklist", "spamhaus", "denied", "banned"]
        .iter()
        .any(|needle| lower.contains(needle))
}
