use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};

use super::error::{SmtpStage, TransportError};

const MAX_HANDSHAKE_ROUNDS: usize = 8;

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// EHLO keyword lookup, one capability per reply line.
    pub fn has_capability(&self, cap: &str) -> bool {
        self.message.lines().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

/// Line-oriented SMTP connection, plain or upgraded through STARTTLS.
#[derive(Debug)]
pub(crate) struct SmtpStream {
    host: String,
    state: StreamState,
    buffer: Vec<u8>,
}

impl SmtpStream {
    /// Connects to the first reachable address in `addrs`.
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(command_timeout))
                        .map_err(|err| TransportError::io(host, SmtpStage::Connect, err))?;
                    stream
                        .set_write_timeout(Some(command_timeout))
                        .map_err(|err| TransportError::io(host, SmtpStage::Connect, err))?;
                    return Ok(Self {
                        host: host.to_string(),
                        state: StreamState::Plain(stream),
                        buffer: Vec::new(),
                    });
                }
                Err(err) => {
                    tracing::debug!(host, %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(TransportError::Connect {
            host: host.to_string(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no socket address available",
                )
            }),
        })
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn upgrade_tls(&mut self, connector: &TlsConnector) -> Result<(), TransportError> {
        let plain = match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => stream,
            tls @ StreamState::Tls(_) => {
                self.state = tls;
                return Ok(());
            }
            StreamState::Invalid => {
                return Err(TransportError::protocol(&self.host, "invalid stream state"));
            }
        };

        let tls = complete_handshake(connector, &self.host, plain)?;
        self.state = StreamState::Tls(Box::new(tls));
        self.buffer.clear();
        Ok(())
    }

    /// Sends `command` and reads the reply to it.
    pub(crate) fn command(
        &mut self,
        stage: SmtpStage,
        command: &str,
    ) -> Result<SmtpReply, TransportError> {
        tracing::trace!(host = %self.host, %stage, command, "C:");
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.write_all(&data)
            .map_err(|err| TransportError::io(&self.host, stage, err))?;
        self.read_reply(stage)
    }

    pub(crate) fn read_reply(&mut self, stage: SmtpStage) -> Result<SmtpReply, TransportError> {
        let mut code: Option<u16> = None;
        let mut lines = Vec::new();
        loop {
            let raw = self
                .read_line()
                .map_err(|err| TransportError::io(&self.host, stage, err))?;
            let line = parse_reply_line(&raw)
                .map_err(|message| TransportError::protocol(&self.host, message))?;
            if let Some(existing) = code {
                if existing != line.code {
                    return Err(TransportError::protocol(
                        &self.host,
                        format!("inconsistent reply codes: {existing} vs {}", line.code),
                    ));
                }
            } else {
                code = Some(line.code);
            }
            lines.push(line.text);
            if line.last {
                break;
            }
        }
        let reply = SmtpReply {
            code: code.unwrap_or_default(),
            message: lines.join("\n"),
        };
        tracing::trace!(host = %self.host, %stage, code = reply.code, "S: {}", reply.message);
        Ok(reply)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.state {
            StreamState::Plain(stream) => {
                stream.write_all(data)?;
                stream.flush()
            }
            StreamState::Tls(stream) => {
                stream.write_all(data)?;
                stream.flush()
            }
            StreamState::Invalid => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "invalid stream state",
            )),
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf)?,
                StreamState::Tls(stream) => stream.read(&mut buf)?,
                StreamState::Invalid => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotConnected,
                        "invalid stream state",
                    ));
                }
            };
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReplyLine {
    pub code: u16,
    pub last: bool,
    pub text: String,
}

pub(crate) fn parse_reply_line(raw: &str) -> Result<ReplyLine, String> {
    if raw.len() < 3 || !raw.is_char_boundary(3) {
        return Err(format!("invalid SMTP reply: '{raw}'"));
    }
    let code = raw[..3]
        .parse::<u16>()
        .map_err(|_| format!("invalid SMTP status code in line: '{raw}'"))?;
    let last = raw.as_bytes().get(3) != Some(&b'-');
    let text = raw.get(4..).unwrap_or_default().to_string();
    Ok(ReplyLine { code, last, text })
}

fn complete_handshake(
    connector: &TlsConnector,
    host: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, TransportError> {
    let tls_error = |message: String| TransportError::Tls {
        host: host.to_string(),
        message,
    };
    let mut pending = match connector.connect(host, stream) {
        Ok(tls) => return Ok(tls),
        Err(HandshakeError::Failure(err)) => return Err(tls_error(err.to_string())),
        Err(HandshakeError::WouldBlock(mid)) => mid,
    };
    // Blocking sockets only report WouldBlock when the read timeout fires.
    for _ in 0..MAX_HANDSHAKE_ROUNDS {
        match pending.handshake() {
            Ok(tls) => return Ok(tls),
            Err(HandshakeError::Failure(err)) => return Err(tls_error(err.to_string())),
            Err(HandshakeError::WouldBlock(next)) => pending = next,
        }
    }
    Err(tls_error("handshake timeout".to_string()))
}
