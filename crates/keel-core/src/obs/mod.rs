//! Observability: metrics events and sink abstractions.
//!
//! Runtime code never touches counters directly. Every instrumentation
//! point emits a `MetricsEvent` into the factory's `MetricsSink`.

mod sink;

#[cfg(test)]
mod tests;

// re-exports
pub use sink::{CounterSink, MetricsEvent, MetricsSink, MetricsSnapshot, NoopSink};
