use std::time::Duration;

/// Controls how [`SmtpConnector`](crate::smtp::SmtpConnector) talks to mail
/// exchangers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    pub port: u16,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Number of MX hosts tried, in preference order, before giving up.
    pub max_servers: usize,
    /// Upgrade with STARTTLS when the server advertises it.
    pub starttls: bool,
    pub ipv6: bool,
    /// Pause between two attempts of a recipient probe that got a 4xx.
    pub retry_delay: Duration,
    /// Accepted recipients per envelope before `RSET` + `MAIL FROM`.
    pub max_recipients_per_transaction: usize,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            port: 25,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            max_servers: 3,
            starttls: true,
            ipv6: false,
            retry_delay: Duration::from_millis(500),
            max_recipients_per_transaction: 50,
        }
    }
}

impl SmtpOptions {
    /// Sets both the connect and the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.command_timeout = timeout;
        self
    }
}
