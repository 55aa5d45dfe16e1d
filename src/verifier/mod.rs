//! Concurrent verification engine.
//!
//! Inputs are parsed and grouped per domain; a bounded pool of workers then
//! takes one domain at a time, opens a single SMTP session for it, probes
//! catch-all behaviour once and every address in turn (each probe joined
//! with a reputation lookup), and closes the session. Failures never escape
//! [`Verifier::verify`]: they end up on the returned [`Lookup`] records.

mod aggregate;
mod batch;
mod classify;
mod options;
mod types;
mod worker;

pub use batch::{Batches, DomainBatch, batch_addresses};
pub use classify::{ABORTED, BLOCKED, HOST_NOT_FOUND, TIMED_OUT, UNAVAILABLE, classify, classify_text};
pub use options::VerifierOptions;
pub use types::{ErrorInfo, Lookup, PARSE_FAILURE};

use std::sync::{Mutex, mpsc};
use std::thread;

use thiserror::Error;

use crate::disposable::{DisposableChecker, StaticDisposableList};
use crate::reputation::{GravatarChecker, ReputationChecker, ReputationError};
use crate::smtp::{SessionOpener, SmtpConnector, TransportError};

use worker::{WorkerContext, run_worker};

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Reputation(#[from] ReputationError),
}

pub struct Verifier<O = SmtpConnector> {
    options: VerifierOptions,
    opener: O,
    disposable: Box<dyn DisposableChecker>,
    reputation: Box<dyn ReputationChecker>,
    helo_name: String,
    sender: String,
}

impl Verifier<SmtpConnector> {
    /// Production setup: system resolver, built-in disposable list and
    /// Gravatar lookups.
    pub fn new(options: VerifierOptions) -> Result<Self, VerifierError> {
        let opener = SmtpConnector::new(options.smtp.clone())?;
        let reputation = GravatarChecker::new(options.reputation_timeout)?;
        Ok(Self::with_components(
            options,
            opener,
            StaticDisposableList::new(),
            reputation,
        ))
    }
}

impl<O: SessionOpener> Verifier<O> {
    pub fn with_components<D, R>(options: VerifierOptions, opener: O, disposable: D, reputation: R) -> Self
    where
        D: DisposableChecker + 'static,
        R: ReputationChecker + 'static,
    {
        let helo_name = options.helo_name();
        let sender = options.envelope_sender(&helo_name);
        Self {
            options,
            opener,
            disposable: Box::new(disposable),
            reputation: Box::new(reputation),
            helo_name,
            sender,
        }
    }

    pub fn with_disposable<D: DisposableChecker + 'static>(mut self, disposable: D) -> Self {
        self.disposable = Box::new(disposable);
        self
    }

    pub fn with_reputation<R: ReputationChecker + 'static>(mut self, reputation: R) -> Self {
        self.reputation = Box::new(reputation);
        self
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    pub fn helo_name(&self) -> &str {
        &self.helo_name
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Workers used for `domains` distinct domains.
    pub fn worker_count(&self, domains: usize) -> usize {
        self.options.max_workers.min(domains)
    }

    /// Verifies every input and returns one record per input.
    ///
    /// Records for unparseable inputs come first, followed by the others in
    /// completion order.
    pub fn verify<S: AsRef<str>>(&self, emails: &[S]) -> Vec<Lookup> {
        let batches = batch_addresses(emails, self.options.validation_mode);
        let total = batches.address_count();
        let Batches { domains, failures } = batches;
        let workers = self.worker_count(domains.len());
        let mut records = failures;

        if domains.is_empty() {
            return records;
        }
        if workers == 0 {
            tracing::warn!(addresses = total, "max_workers is 0, nothing verified");
            return records;
        }

        tracing::debug!(
            domains = domains.len(),
            addresses = total,
            workers,
            "starting verification"
        );

        let (job_tx, job_rx) = mpsc::sync_channel(domains.len());
        for batch in domains {
            // Sized for every batch, never blocks.
            if job_tx.send(batch).is_err() {
                break;
            }
        }
        drop(job_tx);
        let queue = Mutex::new(job_rx);

        let (result_tx, result_rx) = mpsc::sync_channel(total);
        let ctx = WorkerContext {
            opener: &self.opener,
            disposable: self.disposable.as_ref(),
            reputation: self.reputation.as_ref(),
            helo_name: &self.helo_name,
            sender: &self.sender,
            catch_all_attempts: self.options.catch_all_attempts,
            recipient_attempts: self.options.recipient_attempts,
        };

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for id in 0..workers {
                let results = result_tx.clone();
                let (ctx, queue) = (&ctx, &queue);
                let spawned = thread::Builder::new()
                    .name(format!("mailverify-worker-{id}"))
                    .spawn_scoped(scope, move || run_worker(id, ctx, queue, results));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => tracing::warn!(worker = id, error = %err, "failed to spawn worker"),
                }
            }
            drop(result_tx);

            aggregate::collect(&result_rx, total, &mut records);

            for handle in handles {
                if handle.join().is_err() {
                    tracing::error!("verification worker panicked");
                }
            }
        });

        tracing::info!(
            records = records.len(),
            errors = records.iter().filter(|r| r.is_error()).count(),
            "verification finished"
        );
        records
    }
}
