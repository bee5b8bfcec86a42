//! Integration tests for physgen-telemetry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use physgen_telemetry::bus::EventBus;
use physgen_telemetry::events::{EventKind, TrialEvent};
use physgen_telemetry::sinks::{JsonLinesSink, TracingSink, VecSink};
use physgen_telemetry::EventSink;

// ─── Bus Tests ────────────────────────────────────────────────

#[test]
fn emit_and_flush() {
    let mut bus = EventBus::new();
    let sink = VecSink::new();
    bus.add_sink(Box::new(sink.clone()));

    bus.emit(TrialEvent::new(0, EventKind::TrialBegin { object_count: 2 }));
    bus.emit(TrialEvent::new(
        0,
        EventKind::TrialEnd {
            frames: 10,
            timed_out: false,
            wall_time: 0.5,
        },
    ));
    assert!(sink.events().is_empty());
    assert_eq!(bus.pending(), 2);

    assert_eq!(bus.flush(), 2);
    assert_eq!(bus.pending(), 0);
    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::TrialBegin { object_count: 2 });
}

#[test]
fn disabled_bus_drops_events() {
    let mut bus = EventBus::new();
    let sink = VecSink::new();
    bus.add_sink(Box::new(sink.clone()));
    bus.set_enabled(false);
    bus.emit(TrialEvent::new(0, EventKind::TrialSkipped));
    bus.flush();
    assert!(sink.events().is_empty());
    assert!(!bus.is_enabled());
}

#[test]
fn multiple_sinks_each_receive() {
    let mut bus = EventBus::new();
    let a = VecSink::new();
    let b = VecSink::new();
    bus.add_sink(Box::new(a.clone()));
    bus.add_sink(Box::new(b.clone()));
    bus.add_sink(Box::new(TracingSink));
    assert_eq!(bus.sink_count(), 3);

    bus.emit(TrialEvent::new(3, EventKind::PlacementFallback { attempts: 1000 }));
    bus.finalize();
    assert_eq!(a.events().len(), 1);
    assert_eq!(b.events().len(), 1);
}

/// Counts `finalize` calls.
struct FinalizeCounter(Arc<AtomicUsize>);

impl EventSink for FinalizeCounter {
    fn handle(&mut self, _event: &TrialEvent) {}

    fn finalize(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "finalize_counter"
    }
}

#[test]
fn finalize_runs_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = VecSink::new();
    let mut bus = EventBus::new();
    bus.add_sink(Box::new(FinalizeCounter(count.clone())));
    bus.add_sink(Box::new(sink.clone()));

    bus.emit(TrialEvent::new(0, EventKind::TrialSkipped));
    bus.finalize();
    assert!(bus.is_finalized());
    bus.emit(TrialEvent::new(1, EventKind::TrialSkipped));
    bus.finalize();
    drop(bus);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(sink.events().len(), 2);
}

#[test]
fn dropped_bus_delivers_pending_events() {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = VecSink::new();
    {
        let mut bus = EventBus::new();
        bus.add_sink(Box::new(FinalizeCounter(count.clone())));
        bus.add_sink(Box::new(sink.clone()));
        bus.emit(TrialEvent::new(
            4,
            EventKind::TrialFailed {
                error: "missing record: rigi".into(),
            },
        ));
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(sink.events()[0].trial, 4);
}

// ─── Sink Tests ───────────────────────────────────────────────

#[test]
fn json_lines_sink_writes_one_line_per_event() {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.handle(&TrialEvent::new(1, EventKind::TrialSkipped));
    sink.handle(&TrialEvent::new(
        2,
        EventKind::FrameRetry {
            frame: 4,
            missing: "rigidbodies".into(),
            attempt: 1,
        },
    ));
    let text = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let second: TrialEvent = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second.trial, 2);
}

#[test]
fn event_serialization() {
    let event = TrialEvent::new(
        5,
        EventKind::RunBegin {
            scenario: "drop".into(),
            first_trial: 5,
            num_trials: 10,
        },
    );
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("RunBegin"));
    let recovered: TrialEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, event);
}
