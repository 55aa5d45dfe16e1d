const MAX_LABEL_LEN: usize = 63;

/// Valide le domaine (conversion IDNA + labels) et renvoie sa forme ASCII.
///
/// Every invalidating reason is pushed to `reasons`; `None` is returned as
/// soon as at least one was found.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let before = reasons.len();
    let ascii = match idna::domain_to_ascii(domain) {
        Ok(d) => d,
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return None;
    }

    if !ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    for label in ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            reasons.push(format!(
                "domain label '{}' length {} > {MAX_LABEL_LEN}",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
    }

    (reasons.len() == before).then(|| ascii.to_ascii_lowercase())
}
