use super::*;

#[test]
fn counter_sink_accumulates_commit_counts() {
    let sink = CounterSink::new();
    sink.record(MetricsEvent::UnitOfWorkStarted);
    sink.record(MetricsEvent::UnitOfWorkCompleted {
        created: 2,
        updated: 1,
        removed: 0,
    });
    sink.record(MetricsEvent::UnitOfWorkStarted);
    sink.record(MetricsEvent::UnitOfWorkDiscarded);

    let snap = sink.snapshot();
    assert_eq!(snap.units_started, 2);
    assert_eq!(snap.units_completed, 1);
    assert_eq!(snap.units_discarded, 1);
    assert_eq!(snap.entities_created, 2);
    assert_eq!(snap.entities_updated, 1);
}

#[test]
fn counter_sink_tracks_query_results() {
    let sink = CounterSink::new();
    sink.record(MetricsEvent::QueryExecuted {
        entity_type: "Person",
        results: 3,
    });
    sink.record(MetricsEvent::QueryExecuted {
        entity_type: "Person",
        results: 0,
    });
    sink.record(MetricsEvent::StaleReferenceSkipped {
        entity_type: "Person",
    });

    let snap = sink.snapshot();
    assert_eq!(snap.queries_executed, 2);
    assert_eq!(snap.query_results, 3);
    assert_eq!(snap.stale_references, 1);
}

#[test]
fn snapshot_serializes_flat() {
    let snap = CounterSink::new().snapshot();
    let json = serde_json::to_value(snap).expect("snapshot should serialize");

    assert_eq!(json["units_started"], 0);
}
