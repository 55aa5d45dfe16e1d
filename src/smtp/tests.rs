use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use trust_dns_resolver::error::ResolveError;

use super::dns::{self, MxRecord};
use super::{
    DeliverabilitySession, FailureKind, LookupMx, ProbeOutcome, SessionOpener, SmtpConnector,
    SmtpOptions, TransportError,
};

type LookupResult = Result<Vec<MxRecord>, ResolveError>;
type LookupFn = dyn Fn(&str) -> LookupResult + Send + Sync;

pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
}

impl StubResolver {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + Send + Sync + 'static,
    {
        Self {
            on_lookup: Box::new(f),
        }
    }
}

impl LookupMx for StubResolver {
    fn lookup_mx(&self, domain: &str) -> LookupResult {
        (self.on_lookup)(domain)
    }
}

#[test]
fn resolve_hosts_sorts_dedups_and_truncates() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![
            MxRecord::new(30, "127.0.0.3"),
            MxRecord::new(10, "127.0.0.2"),
            MxRecord::new(10, "127.0.0.2"),
            MxRecord::new(20, "127.0.0.1"),
        ])
    });
    let options = SmtpOptions {
        max_servers: 2,
        ..SmtpOptions::default()
    };

    let hosts = dns::resolve_hosts(&stub, "example.com", &options).expect("hosts");
    let names: Vec<&str> = hosts.iter().map(|h| h.host.as_str()).collect();
    assert_eq!(names, ["127.0.0.2", "127.0.0.1"]);
    assert_eq!(hosts[0].addresses[0].port(), 25);
}

#[test]
fn null_mx_means_no_mail_server() {
    let stub = StubResolver::new(|_| Ok(vec![MxRecord::new(0, "")]));
    let err = dns::resolve_hosts(&stub, "example.com", &SmtpOptions::default()).unwrap_err();
    assert!(matches!(err, TransportError::NoMailServers { .. }));
    assert_eq!(err.kind(), FailureKind::Unavailable);
}

#[test]
fn implicit_mx_without_address_is_not_a_missing_host() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let err =
        dns::resolve_hosts(&stub, "nothing-here.invalid", &SmtpOptions::default()).unwrap_err();
    assert!(matches!(err, TransportError::Resolve { .. }));
    assert_ne!(err.kind(), FailureKind::HostNotFound);
    assert!(!err.to_string().contains("no such host"));
}

#[test]
fn implicit_mx_with_only_filtered_addresses_is_unavailable() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let err = dns::resolve_hosts(&stub, "::1", &SmtpOptions::default()).unwrap_err();
    assert!(matches!(err, TransportError::NoMailServers { .. }));
    assert_eq!(err.kind(), FailureKind::Unavailable);

    let options = SmtpOptions {
        ipv6: true,
        ..SmtpOptions::default()
    };
    let hosts = dns::resolve_hosts(&stub, "::1", &options).expect("ipv6 allowed");
    assert!(hosts[0].addresses[0].is_ipv6());
}

#[test]
fn resolver_failure_is_reported() {
    let stub = StubResolver::new(|_| Err(ResolveError::from("resolver exploded")));
    let err = dns::resolve_hosts(&stub, "example.com", &SmtpOptions::default()).unwrap_err();
    assert!(matches!(err, TransportError::Lookup { .. }));
    assert_eq!(err.kind(), FailureKind::Other);
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    assert_eq!(dns::normalize_exchange("Mail.EXAMPLE.com."), "mail.example.com");
    assert_eq!(dns::normalize_exchange("."), "");
}

fn spawn_mock_server(
    banner: &'static str,
    script: Vec<(&'static str, &'static str)>,
) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, banner, script);
        }
    });
    ready_rx.recv().expect("server ready");
    (port, handle)
}

fn handle_session(
    stream: &mut TcpStream,
    banner: &str,
    script: Vec<(&'static str, &'static str)>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(banner.as_bytes())?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        assert!(
            line.starts_with(expected),
            "expected command starting with '{expected}', got '{line}'"
        );
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

fn loopback_connector(port: u16) -> SmtpConnector<StubResolver> {
    let resolver = StubResolver::new(|_| Ok(vec![MxRecord::new(10, "127.0.0.1")]));
    let options = SmtpOptions {
        port,
        starttls: false,
        retry_delay: Duration::from_millis(10),
        ..SmtpOptions::default()
    };
    SmtpConnector::with_resolver(resolver, options)
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn probes_share_one_session() {
    let (port, handle) = spawn_mock_server(
        "220 mock.smtp.test ESMTP\r\n",
        vec![
            ("EHLO verifier.test", "250-mock.example\r\n250 SIZE 1000\r\n"),
            ("MAIL FROM:<probe@verifier.test>", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:<alice@example.com>", "250 2.1.5 Ok\r\n"),
            ("RCPT TO:<bob@example.com>", "552 5.2.2 Mailbox full\r\n"),
            ("RCPT TO:<carol@example.com>", "550 5.1.1 User unknown\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ],
    );
    let connector = loopback_connector(port);
    let mut session = connector
        .open("example.com", "verifier.test", "probe@verifier.test")
        .expect("session");

    assert_eq!(
        session.probe_recipient("alice@example.com", 1),
        ProbeOutcome::Accepted
    );
    assert_eq!(
        session.probe_recipient("bob@example.com", 1),
        ProbeOutcome::MailboxFull
    );
    assert_eq!(
        session.probe_recipient("carol@example.com", 1),
        ProbeOutcome::Other
    );
    session.close();
    handle.join().expect("server thread");
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn transient_rejections_are_retried() {
    let (port, handle) = spawn_mock_server(
        "220 mock.smtp.test ESMTP\r\n",
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:<dave@example.com>", "451 4.7.1 Greylisted\r\n"),
            ("RCPT TO:<dave@example.com>", "250 2.1.5 Ok\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ],
    );
    let connector = loopback_connector(port);
    let mut session = connector
        .open("example.com", "verifier.test", "probe@verifier.test")
        .expect("session");
    assert_eq!(
        session.probe_recipient("dave@example.com", 3),
        ProbeOutcome::Accepted
    );
    session.close();
    handle.join().expect("server thread");
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn blocked_greeting_fails_open() {
    let (port, handle) = spawn_mock_server(
        "554 5.7.1 Service unavailable; client host blocked using zen.spamhaus.org\r\n",
        Vec::new(),
    );
    let connector = loopback_connector(port);
    let err = connector
        .open("example.com", "verifier.test", "probe@verifier.test")
        .expect_err("greeting refused");
    assert_eq!(err.kind(), FailureKind::Blocked);
    handle.join().expect("server thread");
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn falls_back_to_helo() {
    let (port, handle) = spawn_mock_server(
        "220 old.smtp.test\r\n",
        vec![
            ("EHLO", "502 5.5.1 Command not implemented\r\n"),
            ("HELO verifier.test", "250 old.smtp.test\r\n"),
            ("MAIL FROM:", "250 Ok\r\n"),
            ("QUIT", "221 Bye\r\n"),
        ],
    );
    let connector = loopback_connector(port);
    let session = connector
        .open("example.com", "verifier.test", "probe@verifier.test")
        .expect("session");
    session.close();
    handle.join().expect("server thread");
}
