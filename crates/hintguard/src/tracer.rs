//! Decoration tracing.
//!
//! The [`DecorTracer`] trait defines hook points at each decoration phase. All
//! hooks default to no-ops, and [`Decorator`](crate::Decorator) carries the
//! tracer as a type parameter, so [`NoopTracer`] compiles away entirely.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`LogTracer`] | Forwards every event to `tracing` |
//! | [`RecordingTracer`] | Records events for tests and post-mortem inspection |
//!
//! Call-time events (forward reference resolution, violations) are not hooks:
//! they go straight to `tracing` at `debug` level.

use crate::sign::HintSign;

/// Event emitted while decorating a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A declared hint reduced to a different hint.
    Reduce { hint: String, reduced: String },
    /// A reduced hint was classified.
    Classify { hint: String, sign: HintSign },
    /// A check was generated for a parameter or `return`.
    Generate { site: String, check: String },
    /// A wrapper was synthesized and registered in the line cache.
    Synthesize { function: String, filename: String },
}

/// Hooks called during decoration.
pub trait DecorTracer: std::fmt::Debug {
    #[inline(always)]
    fn on_reduce(&mut self, _hint: &str, _reduced: &str) {}

    #[inline(always)]
    fn on_classify(&mut self, _hint: &str, _sign: HintSign) {}

    /// # Arguments
    /// * `site` - Parameter name, or `return`
    /// * `check` - The rendered check expression
    #[inline(always)]
    fn on_generate(&mut self, _site: &str, _check: &str) {}

    #[inline(always)]
    fn on_synthesize(&mut self, _function: &str, _filename: &str) {}
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl DecorTracer for NoopTracer {}

/// Tracer that forwards every event to the `tracing` crate.
///
/// Reductions and classifications are logged at `trace` level, generated checks
/// and synthesized wrappers at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl DecorTracer for LogTracer {
    fn on_reduce(&mut self, hint: &str, reduced: &str) {
        tracing::trace!(hint, reduced, "reduced hint");
    }

    fn on_classify(&mut self, hint: &str, sign: HintSign) {
        tracing::trace!(hint, %sign, "classified hint");
    }

    fn on_generate(&mut self, site: &str, check: &str) {
        tracing::debug!(site, check, "generated check");
    }

    fn on_synthesize(&mut self, function: &str, filename: &str) {
        tracing::debug!(function, filename, "synthesized wrapper");
    }
}

/// Tracer that records all events in order.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Consumes the tracer and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl DecorTracer for RecordingTracer {
    fn on_reduce(&mut self, hint: &str, reduced: &str) {
        self.events.push(TraceEvent::Reduce {
            hint: hint.to_owned(),
            reduced: reduced.to_owned(),
        });
    }

    fn on_classify(&mut self, hint: &str, sign: HintSign) {
        self.events.push(TraceEvent::Classify {
            hint: hint.to_owned(),
            sign,
        });
    }

    fn on_generate(&mut self, site: &str, check: &str) {
        self.events.push(TraceEvent::Generate {
            site: site.to_owned(),
            check: check.to_owned(),
        });
    }

    fn on_synthesize(&mut self, function: &str, filename: &str) {
        self.events.push(TraceEvent::Synthesize {
            function: function.to_owned(),
            filename: filename.to_owned(),
        });
    }
}
