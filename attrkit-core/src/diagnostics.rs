//! Drop diagnostics for attribute stores.
//!
//! Stores report through an injected [`DropSink`]. The default sink does nothing,
//! so a store built without one emits no output at all. Use [`TracingSink`] to
//! forward reports to the `tracing` facade.

use std::sync::Arc;

use once_cell::sync::Lazy;

/// Summary of one `set` call that dropped at least one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropReport {
    /// Pairs supplied to the call.
    pub attempted: usize,
    /// Pairs written to the store.
    pub stored: usize,
    /// Pairs refused because the store was at its count limit.
    pub over_limit: usize,
    /// Pairs whose value was null/absent.
    pub absent: usize,
    /// Pairs whose value had an unsupported shape.
    pub malformed: usize,
}

impl DropReport {
    pub fn dropped(&self) -> usize {
        self.attempted - self.stored
    }

    /// True if every drop was an absent value, which is routine.
    pub fn only_absent(&self) -> bool {
        self.over_limit == 0 && self.malformed == 0
    }
}

/// Receives drop reports from attribute stores.
///
/// Requirements:
/// - Implementations must be thread-safe (`Send + Sync`) and `'static`.
/// - `record` must not panic; it is called while the store is being written.
/// - A sink only observes. Stored data and the drop counter are the same with any sink.
pub trait DropSink: Send + Sync + 'static {
    fn record(&self, entity: &str, report: &DropReport);
}

/// Sink that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DropSink for NoopSink {
    fn record(&self, _entity: &str, _report: &DropReport) {}
}

static NOOP_SINK: Lazy<Arc<dyn DropSink>> = Lazy::new(|| Arc::new(NoopSink));

/// Shared handle to the no-op sink.
pub fn noop_sink() -> Arc<dyn DropSink> {
    NOOP_SINK.clone()
}

/// Sink that emits one `tracing` event per report.
///
/// Count-limit and malformed drops are logged at `debug`; reports made up only
/// of absent values go to `trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DropSink for TracingSink {
    fn record(&self, entity: &str, report: &DropReport) {
        if report.only_absent() {
            tracing::trace!(
                entity,
                attempted = report.attempted,
                stored = report.stored,
                absent = report.absent,
                "dropped attributes with absent values"
            );
        } else {
            tracing::debug!(
                entity,
                attempted = report.attempted,
                stored = report.stored,
                over_limit = report.over_limit,
                absent = report.absent,
                malformed = report.malformed,
                "dropped attributes"
            );
        }
    }
}
