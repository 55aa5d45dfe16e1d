use std::sync::mpsc::Receiver;

use super::types::Lookup;

/// Moves `expected` records from the result channel into `into`, in arrival
/// order. Returns early only when every producer has hung up.
pub(crate) fn collect(results: &Receiver<Lookup>, expected: usize, into: &mut Vec<Lookup>) {
    into.reserve(expected);
    for received in 0..expected {
        match results.recv() {
            Ok(record) => into.push(record),
            Err(_) => {
                tracing::warn!(expected, received, "result channel closed early");
                return;
            }
        }
    }
}
