//! # Broker configuration and per-call option patches.
//!
//! [`Config`] holds the broker-wide defaults for every publish- and
//! subscribe-time option. It is plain data, mutable at runtime through
//! [`Broker::configure`](crate::Broker::configure); changes affect
//! subsequent operations only.
//!
//! Per-call overrides are expressed as patches — [`PublishOptions`] and
//! [`SubscribeOptions`] — whose fields are all optional and shallow-merge
//! over the defaults.
//!
//! # Example
//! ```
//! use arbor::{Config, Latch, PublishOptions};
//!
//! let mut cfg = Config::default();
//! cfg.sync = true;
//! cfg.semaphore = 4;
//!
//! let opts = PublishOptions::new().latch(Latch::Count(2)).persist(true);
//! let eff = cfg.for_publish(&opts);
//! assert!(eff.sync);
//! assert!(eff.persist);
//! assert_eq!(eff.semaphore, 4);
//! assert_eq!(eff.latch, Latch::Count(2));
//! ```

/// Settlement policy for a publication.
///
/// Decides when the publication future settles, based on the counters kept
/// by the resolver: fulfilled `F`, rejected `R`, pending `P`, with
/// `S = F + R` and `T = F + P + R`.
///
/// - [`Latch::Count`] — an absolute number of outcomes.
/// - [`Latch::Fraction`] — a fraction of all notified subscribers, in
///   `(0, 1]`.
/// - [`Latch::All`] — every subscriber; equivalent to `Fraction(1.0)` and
///   the default. With zero subscribers an `All`/`Fraction` latch is
///   unsatisfiable and the publication rejects.
///
/// By default the latch counts *fulfillments* only; with
/// `settlement_latch` it counts settlements (fulfilled or rejected).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Latch {
    /// Every notified subscriber must fulfill (or settle).
    All,
    /// An absolute number of fulfillments (or settlements).
    Count(usize),
    /// A fraction of all notified subscribers, in `(0, 1]`.
    Fraction(f64),
}

impl Default for Latch {
    fn default() -> Self {
        Latch::All
    }
}

/// Broker-wide defaults for all options.
///
/// Publish-time fields: `sync`, `persist`, `prevent_bubble`, `latch`,
/// `settlement_latch`, `semaphore`, `update_after_settlement`.
/// Subscribe-time fields: `priority`, `ignore_persisted`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Run dispatch inline in `publish` instead of deferring it to the
    /// next scheduler turn. Subscriber invocations still settle later.
    pub sync: bool,
    /// Retain published messages for late delivery to future subscribers.
    pub persist: bool,
    /// Notify only exact-topic subscribers, skipping the ancestor chain.
    pub prevent_bubble: bool,
    /// Settlement policy for publications.
    pub latch: Latch,
    /// Count settlements (fulfilled or rejected) toward the latch instead
    /// of fulfillments only.
    pub settlement_latch: bool,
    /// Upper bound on concurrently pending subscriber invocations per
    /// publish. `usize::MAX` means unbounded.
    pub semaphore: usize,
    /// Keep updating counters and value lists after the publication has
    /// settled.
    pub update_after_settlement: bool,
    /// Default subscription priority. Higher fires earlier.
    pub priority: f64,
    /// Skip retained-message replay on subscribe.
    pub ignore_persisted: bool,
}

impl Default for Config {
    /// Defaults: deferred dispatch, no persistence, bubbling delivery,
    /// `Latch::All`, fulfillment latch, unbounded semaphore, no updates
    /// after settlement, priority `0.0`, replay enabled.
    fn default() -> Self {
        Self {
            sync: false,
            persist: false,
            prevent_bubble: false,
            latch: Latch::All,
            settlement_latch: false,
            semaphore: usize::MAX,
            update_after_settlement: false,
            priority: 0.0,
            ignore_persisted: false,
        }
    }
}

impl Config {
    /// Effective publish-time options: `opts` over these defaults.
    #[must_use]
    pub fn for_publish(&self, opts: &PublishOptions) -> PublishEffective {
        PublishEffective {
            sync: opts.sync.unwrap_or(self.sync),
            persist: opts.persist.unwrap_or(self.persist),
            prevent_bubble: opts.prevent_bubble.unwrap_or(self.prevent_bubble),
            latch: opts.latch.unwrap_or(self.latch),
            settlement_latch: opts.settlement_latch.unwrap_or(self.settlement_latch),
            semaphore: opts.semaphore.unwrap_or(self.semaphore),
            update_after_settlement: opts
                .update_after_settlement
                .unwrap_or(self.update_after_settlement),
        }
    }

    /// Effective subscribe-time options: `opts` over these defaults.
    #[must_use]
    pub fn for_subscribe(&self, opts: &SubscribeOptions) -> SubscribeEffective {
        SubscribeEffective {
            priority: opts.priority.unwrap_or(self.priority),
            ignore_persisted: opts.ignore_persisted.unwrap_or(self.ignore_persisted),
        }
    }
}

/// Per-publish overrides; unset fields fall back to the broker defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishOptions {
    pub sync: Option<bool>,
    pub persist: Option<bool>,
    pub prevent_bubble: Option<bool>,
    pub latch: Option<Latch>,
    pub settlement_latch: Option<bool>,
    pub semaphore: Option<usize>,
    pub update_after_settlement: Option<bool>,
}

impl PublishOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sync(mut self, v: bool) -> Self {
        self.sync = Some(v);
        self
    }

    #[must_use]
    pub fn persist(mut self, v: bool) -> Self {
        self.persist = Some(v);
        self
    }

    #[must_use]
    pub fn prevent_bubble(mut self, v: bool) -> Self {
        self.prevent_bubble = Some(v);
        self
    }

    #[must_use]
    pub fn latch(mut self, v: Latch) -> Self {
        self.latch = Some(v);
        self
    }

    #[must_use]
    pub fn settlement_latch(mut self, v: bool) -> Self {
        self.settlement_latch = Some(v);
        self
    }

    #[must_use]
    pub fn semaphore(mut self, v: usize) -> Self {
        self.semaphore = Some(v);
        self
    }

    #[must_use]
    pub fn update_after_settlement(mut self, v: bool) -> Self {
        self.update_after_settlement = Some(v);
        self
    }
}

/// Per-subscribe overrides; unset fields fall back to the broker defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscribeOptions {
    pub priority: Option<f64>,
    pub ignore_persisted: Option<bool>,
}

impl SubscribeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn priority(mut self, v: f64) -> Self {
        self.priority = Some(v);
        self
    }

    #[must_use]
    pub fn ignore_persisted(mut self, v: bool) -> Self {
        self.ignore_persisted = Some(v);
        self
    }
}

/// Resolved publish-time options after merging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PublishEffective {
    pub sync: bool,
    pub persist: bool,
    pub prevent_bubble: bool,
    pub latch: Latch,
    pub settlement_latch: bool,
    pub semaphore: usize,
    pub update_after_settlement: bool,
}

/// Resolved subscribe-time options after merging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubscribeEffective {
    pub priority: f64,
    pub ignore_persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert!(!cfg.sync);
        assert!(!cfg.persist);
        assert!(!cfg.prevent_bubble);
        assert_eq!(cfg.latch, Latch::All);
        assert!(!cfg.settlement_latch);
        assert_eq!(cfg.semaphore, usize::MAX);
        assert!(!cfg.update_after_settlement);
        assert_eq!(cfg.priority, 0.0);
        assert!(!cfg.ignore_persisted);
    }

    #[test]
    fn publish_patch_overrides_only_set_fields() {
        let mut cfg = Config::default();
        cfg.persist = true;
        cfg.semaphore = 2;

        let eff = cfg.for_publish(&PublishOptions::new().persist(false).sync(true));
        assert!(eff.sync);
        assert!(!eff.persist);
        assert_eq!(eff.semaphore, 2);
        assert_eq!(eff.latch, Latch::All);
    }

    #[test]
    fn subscribe_patch_overrides_only_set_fields() {
        let mut cfg = Config::default();
        cfg.priority = 5.0;

        let eff = cfg.for_subscribe(&SubscribeOptions::new().ignore_persisted(true));
        assert_eq!(eff.priority, 5.0);
        assert!(eff.ignore_persisted);

        let eff = cfg.for_subscribe(&SubscribeOptions::new().priority(-1.0));
        assert_eq!(eff.priority, -1.0);
        assert!(!eff.ignore_persisted);
    }
}
