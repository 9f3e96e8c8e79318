//! Monitor demo: a synthetic trading session under observation
//!
//! Wires a `LocalBus` through the `MonitoredBus` decorator, runs a
//! synthetic emitter (ticks, subscription lifecycle, occasional errors),
//! samples memory, and prints monitor reports until Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use buswatch_bins::common::{init_logging, print_report, CommonArgs};
use buswatch_core::bus::{EventBus, LocalBus, MonitoredBus};
use buswatch_core::core::EventPriority;
use buswatch_core::monitor::{BusMonitor, MonitorConfig};
use clap::Parser;
use rand::Rng;
use serde_json::json;

fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level, args.json_logs)?;

    tracing::info!("=== Buswatch: monitor demo ===");
    tracing::info!("Rate: {} events/s, report every {}s", args.rate, args.report_interval);

    // Explicit construction, no ambient global: the monitor is created
    // here and handed to whoever needs it
    let monitor = Arc::new(BusMonitor::new(MonitorConfig::default()));

    let bus = LocalBus::new();
    bus.on("market_data.tick", |_, _| {
        // A real host would update books/strategies here
    });
    let bus = MonitoredBus::new(bus, Arc::clone(&monitor));

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        tracing::info!("Ctrl-C received, shutting down");
        r.store(false, Ordering::SeqCst);
    })?;

    // One subscription per symbol, started (twice: pending → active) on
    // the way in
    let symbols = ["SPY", "QQQ", "ES", "NQ"];
    for symbol in symbols {
        let payload = subscribe_payload(symbol);
        bus.emit("market_data.subscribe", payload.clone(), EventPriority::Normal);
        bus.emit("market_data.subscribe", payload, EventPriority::Normal);
    }

    let mut rng = rand::thread_rng();
    let tick_interval = Duration::from_micros(1_000_000 / args.rate.max(1));
    let mut last_report = Instant::now();
    let mut last_sample = Instant::now();

    while running.load(Ordering::SeqCst) {
        let symbol = symbols[rng.gen_range(0..symbols.len())];
        let px = 400.0 + rng.gen_range(-2.0..2.0);

        let start = Instant::now();
        bus.emit(
            "market_data.tick",
            json!({"symbol": symbol, "px": px}),
            EventPriority::Normal,
        );
        let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;

        monitor.log_event_flow(
            "market_data.tick",
            EventPriority::Normal,
            "demo_feed",
            "demo_engine",
            Some(elapsed_ms),
            true,
            None,
            None,
        );

        // A rare pacing error on one subscription, recovered right away
        if rng.gen_ratio(1, 2000) {
            let mut payload = subscribe_payload(symbol);
            payload["errorString"] = json!("pacing violation");
            bus.emit("market_data.error", payload, EventPriority::High);
            bus.emit(
                "market_data.subscribe",
                subscribe_payload(symbol),
                EventPriority::Normal,
            );
        }

        if last_sample.elapsed() >= Duration::from_secs(1) {
            last_sample = Instant::now();
            monitor.sample_memory();
        }

        if last_report.elapsed() >= Duration::from_secs(args.report_interval) {
            last_report = Instant::now();
            print_report(&monitor.report());
        }

        std::thread::sleep(tick_interval);
    }

    print_report(&monitor.report());
    monitor.cleanup();
    tracing::info!("demo finished");
    Ok(())
}

fn subscribe_payload(symbol: &str) -> serde_json::Value {
    json!({
        "contract": {
            "symbol": symbol,
            "secType": "STK",
            "exchange": "SMART",
            "currency": "USD"
        }
    })
}
