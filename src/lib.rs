#![forbid(unsafe_code)]
//! mailverify_lib : vérification de délivrabilité e-mail sans envoi.
//!
//! Addresses are grouped per domain and each domain gets exactly one SMTP
//! session, shared by all of its addresses: catch-all behaviour is probed
//! once, then every recipient is probed with `RCPT TO` while a reputation
//! lookup runs alongside. See [`Verifier::verify`].
//!
//! ```no_run
//! use mailverify_lib::{Verifier, VerifierOptions};
//!
//! let verifier = Verifier::new(VerifierOptions::default())?;
//! for record in verifier.verify(&["alice@example.com", "not an address"]) {
//!     println!("{} deliverable={}", record.address, record.deliverable);
//! }
//! # Ok::<(), mailverify_lib::VerifierError>(())
//! ```

pub mod address;
pub mod disposable;
pub mod reputation;
pub mod smtp;
pub mod verifier;

pub use address::{Address, AddressError, ValidationMode, parse_address};
pub use disposable::{DisposableChecker, StaticDisposableList};
pub use reputation::{GravatarChecker, NoReputation, ReputationChecker, ReputationError};
pub use smtp::{
    DeliverabilitySession, FailureKind, ProbeOutcome, SessionOpener, SmtpConnector, SmtpOptions,
    TransportError,
};
pub use verifier::{ErrorInfo, Lookup, Verifier, VerifierError, VerifierOptions};
