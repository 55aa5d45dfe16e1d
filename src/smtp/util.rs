use rand::{Rng, distributions::Alphanumeric};

use super::stream::SmtpReply;

/// Random local part used to detect catch-all servers; long enough that no
/// real mailbox will ever match it.
pub(crate) fn random_local_part() -> String {
    let mut rng = rand::thread_rng();
    let length = rng.gen_range(16..=24);
    rng.sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub(crate) fn indicates_full_inbox(reply: &SmtpReply) -> bool {
    if reply.code == 552 {
        return true;
    }
    if reply.is_positive_completion() {
        return false;
    }
    let lower = reply.message.to_ascii_lowercase();
    [
        "mailbox full",
        "inbox full",
        "is full",
        "quota",
        "insufficient storage",
        "insufficient system storage",
        "storage exceeded",
        "exceeded storage",
        "too many messages",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(code: u16, message: &str) -> SmtpReply {
        SmtpReply {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn random_local_part_shape() {
        let local = random_local_part();
        assert!((16..=24).contains(&local.len()));
        assert!(local.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(local, random_local_part());
    }

    #[test]
    fn detects_full_mailboxes() {
        assert!(indicates_full_inbox(&reply(552, "5.2.2 Requested action aborted")));
        assert!(indicates_full_inbox(&reply(452, "4.2.2 Mailbox full")));
        assert!(indicates_full_inbox(&reply(550, "User is over quota")));
        assert!(!indicates_full_inbox(&reply(550, "5.1.1 User unknown")));
        assert!(!indicates_full_inbox(&reply(250, "Storage OK")));
        assert!(indicates_full_inbox(&reply(450, "4.2.2 The email account is full")));
        assert!(indicates_full_inbox(&reply(452, "4.3.1 Insufficient system storage")));
        assert!(!indicates_full_inbox(&reply(
            504,
            "5.5.2 <bob>: Recipient address rejected: need fully-qualified address"
        )));
        assert!(!indicates_full_inbox(&reply(550, "5.7.1 Message was not successfully relayed")));
    }
}
