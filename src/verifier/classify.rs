use crate::smtp::{FailureKind, TransportError};

use super::types::ErrorInfo;

pub const TIMED_OUT: &str = "connection timed out";
pub const HOST_NOT_FOUND: &str = "mail server does not exist";
pub const UNAVAILABLE: &str = "mail server is unavailable";
pub const BLOCKED: &str = "blocked by mail server";
pub const ABORTED: &str = "verification aborted";

/// Maps a session-open failure to a short category and its full text.
pub fn classify(err: &TransportError) -> ErrorInfo {
    from_kind(err.kind(), err.to_string())
}

/// Classifies free-form error text with [`FailureKind::from_message`].
pub fn classify_text(text: &str) -> ErrorInfo {
    from_kind(FailureKind::from_message(text), text.to_string())
}

fn from_kind(kind: FailureKind, detail: String) -> ErrorInfo {
    let category = match kind {
        FailureKind::Timeout => TIMED_OUT.to_string(),
        FailureKind::HostNotFound => HOST_NOT_FOUND.to_string(),
        FailureKind::Unavailable => UNAVAILABLE.to_string(),
        FailureKind::Blocked => BLOCKED.to_string(),
        FailureKind::Other => detail.clone(),
    };
    ErrorInfo::new(Some(kind), category, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::SmtpStage;
    use std::io;

    #[test]
    fn text_heuristic_keeps_precedence() {
        assert_eq!(
            classify_text("dial tcp: i/o timeout, service unavailable").category,
            TIMED_OUT
        );
        assert_eq!(
            classify_text("lookup x.com: no such host (blocked)").category,
            HOST_NOT_FOUND
        );
        assert_eq!(classify_text("421 service unavailable").category, UNAVAILABLE);
        assert_eq!(classify_text("550 blocked using spamhaus").category, BLOCKED);
    }

    #[test]
    fn text_heuristic_is_case_sensitive() {
        let info = classify_text("Connection Timeout");
        assert_eq!(info.kind, Some(FailureKind::Other));
        assert_eq!(info.category, "Connection Timeout");
        assert_eq!(info.detail, "Connection Timeout");
    }

    #[test]
    fn typed_errors_classify_structurally() {
        let missing = TransportError::HostNotFound {
            domain: "nowhere.example".into(),
        };
        let info = classify(&missing);
        assert_eq!(info.category, HOST_NOT_FOUND);
        assert!(info.detail.contains("no such host"));

        let timed_out = TransportError::Connect {
            host: "mx.example.com".into(),
            source: io::Error::new(io::ErrorKind::TimedOut, "connection timed out"),
        };
        assert_eq!(classify(&timed_out).category, TIMED_OUT);

        let blocked = TransportError::Refused {
            host: "mx.example.com".into(),
            stage: SmtpStage::Greeting,
            code: 554,
            message: "5.7.1 client host rejected, listed on spamhaus".into(),
        };
        assert_eq!(classify(&blocked).category, BLOCKED);
    }

    #[test]
    fn other_uses_raw_text() {
        let err = TransportError::Protocol {
            host: "mx.example.com".into(),
            message: "malformed reply".into(),
        };
        let info = classify(&err);
        assert_eq!(info.kind, Some(FailureKind::Other));
        assert_eq!(info.category, err.to_string());
        assert_eq!(info.detail, err.to_string());
    }
}
