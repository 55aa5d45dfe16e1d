use std::collections::HashMap;

use crate::address::{Address, ValidationMode, parse_address};

use super::types::Lookup;

/// All parsed addresses sharing one domain; the unit of work of a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBatch {
    pub domain: String,
    pub addresses: Vec<Address>,
}

/// Output of [`batch_addresses`].
#[derive(Debug, Default)]
pub struct Batches {
    /// One batch per distinct domain, in order of first appearance.
    pub domains: Vec<DomainBatch>,
    /// Records for inputs that failed to parse.
    pub failures: Vec<Lookup>,
}

impl Batches {
    /// Number of successfully parsed addresses.
    pub fn address_count(&self) -> usize {
        self.domains.iter().map(|batch| batch.addresses.len()).sum()
    }
}

/// Parses every input and groups the valid ones by domain. Per-domain input
/// order is preserved.
pub fn batch_addresses<S: AsRef<str>>(emails: &[S], mode: ValidationMode) -> Batches {
    let mut batches = Batches::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for raw in emails {
        let raw = raw.as_ref();
        let address = match parse_address(raw, mode) {
            Ok(address) => address,
            Err(err) => {
                tracing::debug!(input = raw, error = %err, "unparseable address");
                batches.failures.push(Lookup::parse_failure(raw, &err));
                continue;
            }
        };
        let slot = *index
            .entry(address.domain().to_string())
            .or_insert_with(|| {
                batches.domains.push(DomainBatch {
                    domain: address.domain().to_string(),
                    addresses: Vec::new(),
                });
                batches.domains.len() - 1
            });
        batches.domains[slot].addresses.push(address);
    }
    batches
}
