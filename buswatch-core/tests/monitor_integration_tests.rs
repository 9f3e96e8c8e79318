//! End-to-end wiring: LocalBus + MonitoredBus + BusMonitor
//!
//! These tests run the whole observation path the way a host application
//! wires it: construct a monitor, wrap the bus once, emit traffic, query.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use buswatch_core::bus::{EventBus, LocalBus, MonitoredBus};
use buswatch_core::core::EventPriority;
use buswatch_core::memory::{MemoryReader, MemoryReading};
use buswatch_core::monitor::{BusMonitor, MonitorConfig, Trend};
use buswatch_core::subscriptions::{SubscriptionKind, SubscriptionState};
use serde_json::{json, Value};

fn wired() -> (MonitoredBus<LocalBus>, Arc<BusMonitor>) {
    let monitor = Arc::new(BusMonitor::new(MonitorConfig::default()));
    let bus = MonitoredBus::new(LocalBus::new(), Arc::clone(&monitor));
    (bus, monitor)
}

#[test]
fn every_emit_is_observed_and_delivered_unchanged() {
    let received = Arc::new(AtomicUsize::new(0));

    let local = LocalBus::new();
    let seen = Arc::clone(&received);
    local.on("market_data.tick", move |payload, priority| {
        assert_eq!(priority, EventPriority::Normal);
        assert_eq!(payload["px"], json!(450.0));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let monitor = Arc::new(BusMonitor::new(MonitorConfig::default()));
    let bus = MonitoredBus::new(local, Arc::clone(&monitor));

    let delivered = bus.emit("market_data.tick", json!({"px": 450.0}), EventPriority::Normal);
    assert_eq!(delivered, 1, "the inner bus's return value passes through");
    assert_eq!(received.load(Ordering::SeqCst), 1, "delivered exactly once");

    let record = monitor.event_record("market_data.tick").unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.last_payload, json!({"px": 450.0}));
    monitor.cleanup();
}

#[test]
fn subscription_traffic_flows_through_the_wrapper() {
    let (bus, monitor) = wired();
    let payload = json!({
        "contract": {"symbol": "ES", "secType": "FUT", "exchange": "CME", "currency": "USD"}
    });

    bus.emit("market_data.subscribe", payload.clone(), EventPriority::Normal);
    bus.emit("market_data.subscribe", payload.clone(), EventPriority::Normal);

    let subs = monitor.subscriptions_by_kind(SubscriptionKind::MarketData);
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].state, SubscriptionState::Active);
    assert_eq!(monitor.subscription_counts().active, 1);
    monitor.cleanup();
}

#[test]
fn history_and_filters_expose_the_traffic() {
    let (bus, monitor) = wired();

    bus.emit("order.place", json!({"qty": 1}), EventPriority::Critical);
    bus.emit("order.fill", json!({"qty": 1}), EventPriority::High);
    bus.emit("market_data.tick", Value::Null, EventPriority::Normal);

    assert_eq!(monitor.event_history(Some(2)).len(), 2);
    assert_eq!(monitor.events_by_priority(EventPriority::Critical).len(), 1);
    assert_eq!(monitor.events_by_name_substring("order").len(), 2);

    let all = monitor.event_history_between(
        SystemTime::now() - Duration::from_secs(60),
        SystemTime::now(),
    );
    assert_eq!(all.len(), 3);
    monitor.cleanup();
}

struct RampReader {
    calls: AtomicUsize,
}

impl MemoryReader for RampReader {
    fn read(&self) -> MemoryReading {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        MemoryReading {
            rss_mb: 100.0 + (n as f64) * 40.0,
            reclaimed_objects: n as u64,
            unreclaimable_objects: 0,
        }
    }
}

#[test]
fn report_classifies_a_rising_memory_series() {
    let monitor = BusMonitor::with_memory_reader(
        MonitorConfig::default(),
        Box::new(RampReader {
            calls: AtomicUsize::new(0),
        }),
    );

    for _ in 0..6 {
        monitor.sample_memory();
    }

    let report = monitor.report();
    assert_eq!(report.memory_trend, Trend::Increasing);
    let memory = report.memory.unwrap();
    assert_eq!(memory.rss_mb, 300.0);
    assert_eq!(memory.peak_mb, 300.0);
    monitor.cleanup();
}

#[test]
fn logging_surface_reaches_the_pipeline() {
    let (_bus, monitor) = wired();

    monitor.log_event_flow(
        "order.place",
        EventPriority::Critical,
        "gui",
        "broker",
        Some(1.5),
        true,
        None,
        Some(json!({"qty": 2})),
    );
    monitor.log_performance("engine", "rebalance", 12.0, Some(150.0), None, None, None);

    // The worker drains asynchronously
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while std::time::Instant::now() < deadline {
        let stats = monitor.pipeline_stats();
        if stats.event_flow_records == 1 && stats.performance_records == 1 {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(monitor.event_flow_summary(5).total_events, 1);
    assert_eq!(monitor.performance_summary(Some("engine")).len(), 1);
    monitor.cleanup();
}

#[test]
fn cleanup_makes_the_monitor_inert_but_safe() {
    let (bus, monitor) = wired();
    bus.emit("market_data.tick", Value::Null, EventPriority::Normal);
    monitor.cleanup();

    assert!(monitor.event_records().is_empty());
    assert!(monitor.subscriptions().is_empty());

    // Observation and logging after cleanup still must not fail
    bus.emit("market_data.tick", Value::Null, EventPriority::Normal);
    monitor.log_performance("engine", "step", 1.0, None, None, None, None);
    assert_eq!(monitor.event_record("market_data.tick").unwrap().count, 1);
}
