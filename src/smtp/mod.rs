//! SMTP side of the verifier.
//!
//! [`SessionOpener`] and [`DeliverabilitySession`] are the seams the
//! verification engine works against; [`SmtpConnector`] / [`SmtpSession`]
//! implement them over a real SMTP dialogue (MX lookup with implicit-MX
//! fallback, EHLO, opportunistic STARTTLS, `MAIL FROM`, then one `RCPT TO`
//! per probe). Failures to open a session are reported as a typed
//! [`TransportError`] whose [`FailureKind`] drives classification.

mod dns;
mod error;
mod options;
mod session;
mod stream;
mod util;

pub use dns::{LookupMx, MxRecord};
pub use error::{FailureKind, SmtpStage, TransportError};
pub use options::SmtpOptions;
pub use session::{SmtpConnector, SmtpSession};
pub use stream::SmtpReply;

/// Result of a single-recipient probe.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accepted,
    MailboxFull,
    Other,
}

/// A live connection to one domain's mail server.
///
/// `close` consumes the session, so it runs at most once.
pub trait DeliverabilitySession {
    /// Probes a recipient at `domain` that cannot legitimately exist; a
    /// server accepting it accepts everything.
    fn probe_catch_all(&mut self, domain: &str, attempts: u32) -> bool {
        let probe = format!("{}@{domain}", util::random_local_part());
        self.probe_recipient(&probe, attempts) == ProbeOutcome::Accepted
    }

    fn probe_recipient(&mut self, address: &str, attempts: u32) -> ProbeOutcome;

    fn close(self);
}

/// Opens a [`DeliverabilitySession`] for a domain.
pub trait SessionOpener: Send + Sync {
    type Session: DeliverabilitySession;

    fn open(
        &self,
        domain: &str,
        local_hostname: &str,
        source_address: &str,
    ) -> Result<Self::Session, TransportError>;
}

#[cfg(test)]
mod tests;
