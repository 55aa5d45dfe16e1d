//! Address parsing: splits a raw string into username and domain and checks
//! both parts against the RFC subset the verifier relies on.

mod domain;
mod local;
mod types;

pub use types::{Address, AddressError, ValidationMode};

use domain::check_domain;
use local::{MAX_LOCAL_LEN, is_local_relaxed, is_local_strict};

const MAX_ADDRESS_LEN: usize = 254;

/// Parses `raw` into an [`Address`].
///
/// The input is trimmed first. Every reason that makes the address invalid
/// is collected into the returned [`AddressError`].
pub fn parse_address(raw: &str, mode: ValidationMode) -> Result<Address, AddressError> {
    let input = raw.trim();
    let mut reasons = Vec::new();

    if input.len() > MAX_ADDRESS_LEN {
        reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", input.len()));
    }

    let parts: Vec<&str> = input.split('@').collect();
    let [local, domain] = parts.as_slice() else {
        reasons.push("must contain exactly one '@'".to_string());
        return Err(AddressError::invalid(raw, reasons));
    };

    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        reasons.push(format!(
            "local part length {} invalid (1..={MAX_LOCAL_LEN})",
            local.len()
        ));
    }

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ascii_domain = check_domain(domain, &mut reasons);

    match ascii_domain {
        Some(ascii) if reasons.is_empty() => Ok(Address::new(raw, local, ascii)),
        _ => Err(AddressError::invalid(raw, reasons)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_basic() {
        let a = parse_address("alice@example.com", ValidationMode::Strict).unwrap();
        assert_eq!(a.username(), "alice");
        assert_eq!(a.domain(), "example.com");
        assert_eq!(a.address(), "alice@example.com");
    }

    #[test]
    fn trims_and_lowercases_domain_only() {
        let a = parse_address("  Bob@Example.ORG \n", ValidationMode::Strict).unwrap();
        assert_eq!(a.raw(), "  Bob@Example.ORG \n");
        assert_eq!(a.address(), "Bob@example.org");
    }

    #[test]
    fn rejects_double_at() {
        let err = parse_address("a@@b", ValidationMode::Strict).unwrap_err();
        assert!(err.reasons().iter().any(|r| r.contains("exactly one '@'")));
    }

    #[test]
    fn rejects_missing_at() {
        assert!(parse_address("bad", ValidationMode::Strict).is_err());
    }

    #[test]
    fn collects_every_reason() {
        let err = parse_address(".bob@-x", ValidationMode::Strict).unwrap_err();
        assert!(err.reasons().len() >= 2, "{:?}", err.reasons());
        assert!(err.to_string().starts_with("invalid email address '.bob@-x'"));
    }

    #[test]
    fn relaxed_mode_accepts_quoted_local() {
        assert!(parse_address("\"john smith\"@example.com", ValidationMode::Strict).is_err());
        let a = parse_address("\"john smith\"@example.com", ValidationMode::Relaxed).unwrap();
        assert_eq!(a.username(), "\"john smith\"");
    }

    #[test]
    fn rejects_overlong_local() {
        let local = "a".repeat(65);
        assert!(parse_address(&format!("{local}@example.com"), ValidationMode::Strict).is_err());
    }
}
