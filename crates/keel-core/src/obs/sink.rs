use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    UnitOfWorkStarted,
    UnitOfWorkCompleted {
        created: u64,
        updated: u64,
        removed: u64,
    },
    UnitOfWorkDiscarded,
    UnitOfWorkConflicted {
        entities: u64,
    },
    EntityLoaded,
    QueryExecuted {
        entity_type: &'static str,
        results: u64,
    },
    StaleReferenceSkipped {
        entity_type: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopSink
/// Default sink when the factory is built without one.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _event: MetricsEvent) {}
}

///
/// CounterSink
///
/// Thread-safe counters over every event kind. Shareable across unit of
/// work factories through an `Arc`.
///

#[derive(Debug, Default)]
pub struct CounterSink {
    units_started: AtomicU64,
    units_completed: AtomicU64,
    units_discarded: AtomicU64,
    units_conflicted: AtomicU64,
    entities_created: AtomicU64,
    entities_updated: AtomicU64,
    entities_removed: AtomicU64,
    entities_loaded: AtomicU64,
    queries_executed: AtomicU64,
    query_results: AtomicU64,
    stale_references: AtomicU64,
}

impl CounterSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsSnapshot {
            units_started: read(&self.units_started),
            units_completed: read(&self.units_completed),
            units_discarded: read(&self.units_discarded),
            units_conflicted: read(&self.units_conflicted),
            entities_created: read(&self.entities_created),
            entities_updated: read(&self.entities_updated),
            entities_removed: read(&self.entities_removed),
            entities_loaded: read(&self.entities_loaded),
            queries_executed: read(&self.queries_executed),
            query_results: read(&self.query_results),
            stale_references: read(&self.stale_references),
        }
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl MetricsSink for CounterSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::UnitOfWorkStarted => bump(&self.units_started, 1),
            MetricsEvent::UnitOfWorkCompleted {
                created,
                updated,
                removed,
            } => {
                bump(&self.units_completed, 1);
                bump(&self.entities_created, created);
                bump(&self.entities_updated, updated);
                bump(&self.entities_removed, removed);
            }
            MetricsEvent::UnitOfWorkDiscarded => bump(&self.units_discarded, 1),
            MetricsEvent::UnitOfWorkConflicted { .. } => bump(&self.units_conflicted, 1),
            MetricsEvent::EntityLoaded => bump(&self.entities_loaded, 1),
            MetricsEvent::QueryExecuted { results, .. } => {
                bump(&self.queries_executed, 1);
                bump(&self.query_results, results);
            }
            MetricsEvent::StaleReferenceSkipped { .. } => bump(&self.stale_references, 1),
        }
    }
}

///
/// MetricsSnapshot
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub units_started: u64,
    pub units_completed: u64,
    pub units_discarded: u64,
    pub units_conflicted: u64,
    pub entities_created: u64,
    pub entities_updated: u64,
    pub entities_removed: u64,
    pub entities_loaded: u64,
    pub queries_executed: u64,
    pub query_results: u64,
    pub stale_references: u64,
}
