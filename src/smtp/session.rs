use std::thread;
use std::time::Duration;

use native_tls::TlsConnector;
use trust_dns_resolver::Resolver;

use super::dns::{LookupMx, MxHost, resolve_hosts};
use super::error::{SmtpStage, TransportError};
use super::options::SmtpOptions;
use super::stream::{SmtpReply, SmtpStream};
use super::util::indicates_full_inbox;
use super::{DeliverabilitySession, ProbeOutcome, SessionOpener};

/// Opens [`SmtpSession`]s against the MX hosts of a domain.
pub struct SmtpConnector<R = Resolver> {
    resolver: R,
    options: SmtpOptions,
    tls: Option<TlsConnector>,
}

impl SmtpConnector<Resolver> {
    /// Uses the system resolver configuration.
    pub fn new(options: SmtpOptions) -> Result<Self, TransportError> {
        let resolver = Resolver::from_system_conf().map_err(TransportError::resolver_init)?;
        Ok(Self::with_resolver(resolver, options))
    }
}

impl<R: LookupMx> SmtpConnector<R> {
    pub fn with_resolver(resolver: R, options: SmtpOptions) -> Self {
        let tls = if options.starttls {
            match TlsConnector::new() {
                Ok(connector) => Some(connector),
                Err(err) => {
                    tracing::warn!(error = %err, "TLS unavailable, STARTTLS disabled");
                    None
                }
            }
        } else {
            None
        };
        Self {
            resolver,
            options,
            tls,
        }
    }

    pub fn options(&self) -> &SmtpOptions {
        &self.options
    }
}

impl<R> SessionOpener for SmtpConnector<R>
where
    R: LookupMx + Send + Sync,
{
    type Session = SmtpSession;

    fn open(
        &self,
        domain: &str,
        local_hostname: &str,
        source_address: &str,
    ) -> Result<SmtpSession, TransportError> {
        let hosts = resolve_hosts(&self.resolver, domain, &self.options)?;
        let mut last_err = None;
        for host in &hosts {
            match SmtpSession::establish(
                host,
                local_hostname,
                source_address,
                &self.options,
                self.tls.as_ref(),
            ) {
                Ok(session) => {
                    tracing::debug!(domain, host = %host.host, "session established");
                    return Ok(session);
                }
                Err(err) => {
                    tracing::debug!(domain, host = %host.host, error = %err, "host failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| TransportError::NoMailServers {
            domain: domain.to_string(),
        }))
    }
}

/// An open SMTP dialogue positioned after `MAIL FROM`, ready for `RCPT TO`
/// probes.
#[derive(Debug)]
pub struct SmtpSession {
    stream: SmtpStream,
    source_address: String,
    retry_delay: Duration,
    max_recipients: usize,
    recipients: usize,
    broken: bool,
}

impl SmtpSession {
    fn establish(
        host: &MxHost,
        local_hostname: &str,
        source_address: &str,
        options: &SmtpOptions,
        tls: Option<&TlsConnector>,
    ) -> Result<Self, TransportError> {
        let mut stream = SmtpStream::connect(
            &host.host,
            &host.addresses,
            options.connect_timeout,
            options.command_timeout,
        )?;

        let banner = stream.read_reply(SmtpStage::Greeting)?;
        if !banner.is_positive_completion() {
            return Err(TransportError::refused(
                &host.host,
                SmtpStage::Greeting,
                &banner,
            ));
        }

        let ehlo = greet(&mut stream, local_hostname)?;
        if let Some(connector) = tls.filter(|_| ehlo.has_capability("STARTTLS")) {
            let reply = stream.command(SmtpStage::StartTls, "STARTTLS")?;
            if reply.is_positive_completion() {
                stream.upgrade_tls(connector)?;
                greet(&mut stream, local_hostname)?;
            } else {
                tracing::debug!(host = %host.host, code = reply.code, "STARTTLS refused, staying in clear");
            }
        }

        let mut session = Self {
            stream,
            source_address: source_address.to_string(),
            retry_delay: options.retry_delay,
            max_recipients: options.max_recipients_per_transaction.max(1),
            recipients: 0,
            broken: false,
        };
        session.start_envelope()?;
        Ok(session)
    }

    pub fn host(&self) -> &str {
        self.stream.host()
    }

    fn start_envelope(&mut self) -> Result<(), TransportError> {
        let command = format!("MAIL FROM:<{}>", self.source_address);
        let reply = self.stream.command(SmtpStage::MailFrom, &command)?;
        if !reply.is_positive_completion() {
            return Err(TransportError::refused(
                self.stream.host(),
                SmtpStage::MailFrom,
                &reply,
            ));
        }
        self.recipients = 0;
        Ok(())
    }

    fn send_rcpt(&mut self, address: &str) -> Result<SmtpReply, TransportError> {
        if self.recipients >= self.max_recipients {
            self.stream.command(SmtpStage::Rset, "RSET")?;
            self.start_envelope()?;
        }
        let reply = self
            .stream
            .command(SmtpStage::RcptTo, &format!("RCPT TO:<{address}>"))?;
        if reply.is_positive_completion() {
            self.recipients += 1;
        }
        Ok(reply)
    }
}

impl DeliverabilitySession for SmtpSession {
    fn probe_recipient(&mut self, address: &str, attempts: u32) -> ProbeOutcome {
        let mut remaining = attempts.max(1);
        loop {
            if self.broken {
                return ProbeOutcome::Other;
            }
            remaining -= 1;
            let reply = match self.send_rcpt(address) {
                Ok(reply) => reply,
                Err(err) => {
                    // The dialogue is out of sync after a failed read or write.
                    tracing::debug!(host = %self.host(), address, error = %err, "probe failed");
                    self.broken = true;
                    return ProbeOutcome::Other;
                }
            };
            if reply.is_positive_completion() {
                return ProbeOutcome::Accepted;
            }
            if indicates_full_inbox(&reply) {
                return ProbeOutcome::MailboxFull;
            }
            if !reply.is_transient_failure() || remaining == 0 {
                tracing::debug!(host = %self.host(), address, code = reply.code, "recipient not accepted");
                return ProbeOutcome::Other;
            }
            thread::sleep(self.retry_delay);
        }
    }

    fn close(mut self) {
        if self.broken {
            return;
        }
        if let Err(err) = self.stream.command(SmtpStage::Quit, "QUIT") {
            tracing::debug!(host = %self.host(), error = %err, "QUIT failed");
        }
    }
}

fn greet(stream: &mut SmtpStream, local_hostname: &str) -> Result<SmtpReply, TransportError> {
    let ehlo = stream.command(SmtpStage::Ehlo, &format!("EHLO {local_hostname}"))?;
    if ehlo.is_positive_completion() {
        return Ok(ehlo);
    }
    let helo = stream.command(SmtpStage::Ehlo, &format!("HELO {local_hostname}"))?;
    if helo.is_positive_completion() {
        Ok(helo)
    } else {
        Err(TransportError::refused(stream.host(), SmtpStage::Ehlo, &helo))
    }
}
