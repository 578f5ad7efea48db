//! # Publication rejection payload.
//!
//! The broker recovers locally from everything it can: subscriber failures
//! become rejection outcomes, token misses become `false`. The one failure
//! callers observe as an error value is a rejected publication — the latch
//! became unsatisfiable — and it carries the rejection values accumulated
//! up to that point (possibly none).

use thiserror::Error;

/// What a publication resolves to: the fulfillment values on success, the
/// accumulated rejections on latch failure.
pub type Outcome<R> = Result<Vec<R>, Rejected<R>>;

/// A rejected publication: the latch can no longer be satisfied.
///
/// Carries every rejection value recorded before settlement, in completion
/// order. Empty when the latch was unsatisfiable before any subscriber
/// settled (e.g. a count latch with too few subscribers).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("publication rejected: latch unsatisfiable after {} rejection(s)", .values.len())]
pub struct Rejected<R> {
    /// Rejection values in completion order.
    pub values: Vec<R>,
}

impl<R> Rejected<R> {
    pub(crate) fn new(values: Vec<R>) -> Self {
        Rejected { values }
    }
}
