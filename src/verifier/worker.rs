use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::address::Address;
use crate::disposable::DisposableChecker;
use crate::reputation::ReputationChecker;
use crate::smtp::{DeliverabilitySession, FailureKind, ProbeOutcome, SessionOpener};

use super::batch::DomainBatch;
use super::classify::{ABORTED, classify};
use super::types::{AddressChecks, DomainStatus, ErrorInfo, Lookup};

/// Everything a worker reads; shared by reference across the pool.
pub(crate) struct WorkerContext<'a, O> {
    pub opener: &'a O,
    pub disposable: &'a dyn DisposableChecker,
    pub reputation: &'a dyn ReputationChecker,
    pub helo_name: &'a str,
    pub sender: &'a str,
    pub catch_all_attempts: u32,
    pub recipient_attempts: u32,
}

/// Takes domain batches off the shared queue until it is drained.
pub(crate) fn run_worker<O: SessionOpener>(
    id: usize,
    ctx: &WorkerContext<'_, O>,
    queue: &Mutex<Receiver<DomainBatch>>,
    results: SyncSender<Lookup>,
) {
    let mut handled = 0usize;
    loop {
        // The guard is released before the batch is processed.
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(batch) = next else {
            break;
        };
        verify_domain(ctx, &batch, &results);
        handled += 1;
    }
    tracing::debug!(worker = id, domains = handled, "worker done");
}

/// Verifies every address of one domain over a single session.
pub(crate) fn verify_domain<O: SessionOpener>(
    ctx: &WorkerContext<'_, O>,
    batch: &DomainBatch,
    results: &SyncSender<Lookup>,
) {
    let domain = batch.domain.as_str();
    let mut session = match ctx.opener.open(domain, ctx.helo_name, ctx.sender) {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(domain, addresses = batch.addresses.len(), error = %err, "cannot open session");
            let info = classify(&err);
            for address in &batch.addresses {
                emit(results, Lookup::unreachable(address, info.clone()));
            }
            return;
        }
    };

    // A panic in the session or a checker still closes the session and
    // leaves one record per address.
    let mut done = 0usize;
    let checked = panic::catch_unwind(AssertUnwindSafe(|| {
        let status = DomainStatus {
            catch_all: session.probe_catch_all(domain, ctx.catch_all_attempts),
            disposable: ctx.disposable.is_disposable(domain),
        };
        tracing::debug!(
            domain,
            addresses = batch.addresses.len(),
            catch_all = status.catch_all,
            disposable = status.disposable,
            "session open"
        );

        for address in &batch.addresses {
            let checks = check_address(ctx, &mut session, address, status.catch_all);
            emit(results, Lookup::probed(address, status, checks));
            done += 1;
        }
    }));

    session.close();

    if checked.is_err() {
        let remaining = &batch.addresses[done..];
        tracing::error!(domain, remaining = remaining.len(), "domain verification panicked");
        let info = ErrorInfo::new(
            Some(FailureKind::Other),
            ABORTED,
            format!("{ABORTED}: {domain} check panicked"),
        );
        for address in remaining {
            emit(results, Lookup::unreachable(address, info.clone()));
        }
    }
}

/// Runs the recipient probe and the reputation lookup side by side.
fn check_address<O: SessionOpener>(
    ctx: &WorkerContext<'_, O>,
    session: &mut O::Session,
    address: &Address,
    catch_all: bool,
) -> AddressChecks {
    let reputation = ctx.reputation;
    thread::scope(|scope| {
        let lookup = scope.spawn(move || reputation.has_reputation(address));

        let outcome = if catch_all {
            ProbeOutcome::Accepted
        } else {
            session.probe_recipient(&address.address(), ctx.recipient_attempts)
        };

        let reputation = lookup.join().unwrap_or_else(|_| {
            tracing::warn!(address = %address, "reputation check panicked");
            false
        });

        AddressChecks {
            deliverable: outcome == ProbeOutcome::Accepted,
            full_inbox: outcome == ProbeOutcome::MailboxFull,
            reputation,
        }
    })
}

fn emit(results: &SyncSender<Lookup>, record: Lookup) {
    if let Err(err) = results.send(record) {
        tracing::debug!(address = %err.0.address, "result dropped, aggregator gone");
    }
}
