//! # Resolver: outcome accounting and latch evaluation.
//!
//! Tracks per-publication counters and value lists, and decides when the
//! publication settles. Working set, with `F` fulfilled, `R` rejected and
//! `P` pending:
//!
//! ```text
//! S = F + R        settled so far
//! T = F + P + R    everyone notified
//! M = F + P        best case: everything pending fulfills
//! ```
//!
//! Reject as soon as the latch is unsatisfiable even in the best case;
//! fulfill as soon as it is met. Reject tests run first. A publication
//! whose latch is neither met nor unsatisfiable stays pending.
//!
//! ## Rules
//! - Fulfillment latch (default): `Count(l)` rejects when `M < l`,
//!   fulfills when `F ≥ l`; `Fraction(l)`/`All` reject when `T == 0` or
//!   the best-case fraction `M/T` falls below the latch, fulfill when
//!   `F/T` reaches it.
//! - Settlement latch: `Count(l)` rejects when `T < l`, fulfills when
//!   `S ≥ l`; `Fraction(l)`/`All` reject only when `T == 0`, fulfill when
//!   `S/T` reaches the latch.
//! - Outcomes arriving after settlement are dropped unless
//!   `update_after_settlement` is set, in which case counters and value
//!   lists keep updating on the settled publication.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use tracing::trace;

use crate::config::{Config, Latch, PublishEffective, PublishOptions};
use crate::token::Token;

/// Deferred subscriber invocation, queued until the semaphore admits it.
pub(crate) type InvokeThunk<R> = Box<dyn FnOnce() -> BoxFuture<'static, Result<R, R>> + Send>;

/// One subscriber outcome. `None` marks a panicked invocation: counted as
/// a rejection, with no value to append.
pub(crate) type Delivered<R> = Option<Result<R, R>>;

/// Mutable per-publication state, shared between the dispatcher and the
/// publication handle.
pub(crate) struct Core<R> {
    /// `Some(true)` fulfilled, `Some(false)` rejected, `None` pending.
    pub(crate) settled: Option<bool>,
    pub(crate) fulfilled_values: Vec<R>,
    pub(crate) rejected_values: Vec<R>,
    pub(crate) fulfilled: usize,
    pub(crate) rejected: usize,
    pub(crate) pending: usize,
    pub(crate) in_flight: usize,
    pub(crate) queue: VecDeque<InvokeThunk<R>>,
    pub(crate) token: Option<Token>,
    /// Effective options; installed when dispatch begins.
    pub(crate) opts: PublishEffective,
}

impl<R> Core<R> {
    pub(crate) fn new() -> Self {
        Core {
            settled: None,
            fulfilled_values: Vec::new(),
            rejected_values: Vec::new(),
            fulfilled: 0,
            rejected: 0,
            pending: 0,
            in_flight: 0,
            queue: VecDeque::new(),
            token: None,
            opts: Config::default().for_publish(&PublishOptions::default()),
        }
    }

    /// Records one subscriber outcome. Returns `false` when the outcome
    /// was dropped (already settled, no updates after settlement).
    pub(crate) fn record(&mut self, outcome: Delivered<R>) -> bool {
        if self.settled.is_some() && !self.opts.update_after_settlement {
            return false;
        }
        match outcome {
            Some(Ok(v)) => {
                self.fulfilled += 1;
                self.fulfilled_values.push(v);
            }
            Some(Err(v)) => {
                self.rejected += 1;
                self.rejected_values.push(v);
            }
            None => self.rejected += 1,
        }
        self.pending -= 1;
        trace!(
            fulfilled = self.fulfilled,
            rejected = self.rejected,
            pending = self.pending,
            "outcome recorded"
        );
        true
    }

    /// Evaluates the latch: `Some(true)` fulfill, `Some(false)` reject,
    /// `None` keep waiting.
    pub(crate) fn evaluate(&self) -> Option<bool> {
        let f = self.fulfilled;
        let s = f + self.rejected;
        let t = s + self.pending;
        let m = f + self.pending;
        let latch = self.opts.latch;

        let reject = if self.opts.settlement_latch {
            match latch {
                Latch::Count(l) => t < l,
                Latch::All | Latch::Fraction(_) => t == 0,
            }
        } else {
            match latch {
                Latch::Count(l) => m < l,
                Latch::All => t == 0 || m < t,
                Latch::Fraction(l) => t == 0 || ratio(m, t) < l,
            }
        };
        if reject {
            return Some(false);
        }

        // T > 0 past this point for All/Fraction.
        let fulfill = if self.opts.settlement_latch {
            match latch {
                Latch::Count(l) => s >= l,
                Latch::All => s >= t,
                Latch::Fraction(l) => ratio(s, t) >= l,
            }
        } else {
            match latch {
                Latch::Count(l) => f >= l,
                Latch::All => f >= t,
                Latch::Fraction(l) => ratio(f, t) >= l,
            }
        };
        fulfill.then_some(true)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    num as f64 / den as f64
}
