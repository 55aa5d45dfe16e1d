use std::fmt;

use crate::address::{Address, AddressError};
use crate::smtp::FailureKind;

/// Category attached to records whose input could not be parsed.
pub const PARSE_FAILURE: &str = "failed to parse email";

/// Short category plus the full error text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Typed reason when the error came from the transport.
    #[cfg_attr(feature = "with-serde", serde(skip))]
    pub kind: Option<FailureKind>,
    #[cfg_attr(feature = "with-serde", serde(rename = "error"))]
    pub category: String,
    #[cfg_attr(feature = "with-serde", serde(rename = "errorDetails"))]
    pub detail: String,
}

impl ErrorInfo {
    pub fn new(kind: Option<FailureKind>, category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            category: category.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category == self.detail {
            f.write_str(&self.category)
        } else {
            write!(f, "{}: {}", self.category, self.detail)
        }
    }
}

/// Verification result for one input address.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub address: String,
    pub username: String,
    pub domain: String,
    pub host_exists: bool,
    pub deliverable: bool,
    pub full_inbox: bool,
    pub catch_all: bool,
    pub disposable: bool,
    pub reputation: bool,
    #[cfg_attr(
        feature = "with-serde",
        serde(flatten, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<ErrorInfo>,
}

/// Flags computed once per domain and shared by all its records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DomainStatus {
    pub catch_all: bool,
    pub disposable: bool,
}

/// Per-address outcome of the probe and reputation join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AddressChecks {
    pub deliverable: bool,
    pub full_inbox: bool,
    pub reputation: bool,
}

impl Lookup {
    fn blank(address: String, username: String, domain: String) -> Self {
        Self {
            address,
            username,
            domain,
            host_exists: false,
            deliverable: false,
            full_inbox: false,
            catch_all: false,
            disposable: false,
            reputation: false,
            error: None,
        }
    }

    pub(crate) fn parse_failure(raw: &str, err: &AddressError) -> Self {
        Self {
            error: Some(ErrorInfo::new(None, PARSE_FAILURE, err.to_string())),
            ..Self::blank(raw.to_string(), String::new(), String::new())
        }
    }

    /// Record for an address whose domain could not be reached.
    pub(crate) fn unreachable(address: &Address, error: ErrorInfo) -> Self {
        Self {
            host_exists: !error.detail.contains("no such host"),
            error: Some(error),
            ..Self::from_address(address)
        }
    }

    pub(crate) fn probed(address: &Address, domain: DomainStatus, checks: AddressChecks) -> Self {
        Self {
            host_exists: true,
            deliverable: checks.deliverable,
            full_inbox: checks.full_inbox,
            catch_all: domain.catch_all,
            disposable: domain.disposable,
            reputation: checks.reputation,
            ..Self::from_address(address)
        }
    }

    fn from_address(address: &Address) -> Self {
        Self::blank(
            address.address(),
            address.username().to_string(),
            address.domain().to_string(),
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
