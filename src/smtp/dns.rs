use std::net::{SocketAddr, ToSocketAddrs};

use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;

use super::error::TransportError;
use super::options::SmtpOptions;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Source of MX records; implemented for the system resolver.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
            .collect())
    }
}

/// A mail exchanger with its resolved socket addresses.
#[derive(Debug, Clone)]
pub(crate) struct MxHost {
    pub host: String,
    pub addresses: Vec<SocketAddr>,
}

/// Resolves the hosts to try for `domain`, most preferred first.
///
/// Without MX records the domain itself is used (implicit MX). A null MX
/// (`.`) means the domain explicitly accepts no mail.
pub(crate) fn resolve_hosts<R>(
    resolver: &R,
    domain: &str,
    options: &SmtpOptions,
) -> Result<Vec<MxHost>, TransportError>
where
    R: LookupMx + ?Sized,
{
    let mut records = match resolver.lookup_mx(domain) {
        Ok(records) => records,
        Err(err) => match err.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. }
                if *response_code == ResponseCode::NXDomain =>
            {
                return Err(TransportError::host_not_found(domain));
            }
            ResolveErrorKind::NoRecordsFound { .. } => Vec::new(),
            _ => return Err(TransportError::lookup(domain, err)),
        },
    };

    records.sort();
    records.dedup();

    // The domain answered without MX records: it exists, so a failed address
    // lookup here is never "no such host".
    if records.is_empty() {
        let addresses = resolve_addrs(domain, options.port, options.ipv6)
            .map_err(|err| TransportError::resolve(domain, err))?;
        if addresses.is_empty() {
            return Err(TransportError::NoMailServers {
                domain: domain.to_string(),
            });
        }
        return Ok(vec![MxHost {
            host: domain.to_string(),
            addresses,
        }]);
    }

    if records.iter().all(|record| record.exchange.is_empty()) {
        return Err(TransportError::NoMailServers {
            domain: domain.to_string(),
        });
    }

    let mut hosts = Vec::new();
    for record in records
        .iter()
        .filter(|record| !record.exchange.is_empty())
        .take(options.max_servers.max(1))
    {
        match resolve_addrs(&record.exchange, options.port, options.ipv6) {
            Ok(addresses) if !addresses.is_empty() => hosts.push(MxHost {
                host: record.exchange.clone(),
                addresses,
            }),
            Ok(_) => tracing::debug!(domain, exchange = %record.exchange, "no usable address"),
            Err(err) => {
                tracing::debug!(domain, exchange = %record.exchange, error = %err, "exchange did not resolve")
            }
        }
    }

    if hosts.is_empty() {
        return Err(TransportError::NoMailServers {
            domain: domain.to_string(),
        });
    }
    Ok(hosts)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

fn resolve_addrs(host: &str, port: u16, allow_ipv6: bool) -> std::io::Result<Vec<SocketAddr>> {
    Ok((host, port)
        .to_socket_addrs()?
        .filter(|addr| allow_ipv6 || addr.is_ipv4())
        .collect())
}
