//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and report printing.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use buswatch_core::monitor::MonitorReport;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Synthetic events emitted per second
    #[arg(short, long, default_value = "200")]
    pub rate: u64,

    /// Seconds between printed monitor reports
    #[arg(short = 'i', long, default_value = "5")]
    pub report_interval: u64,

    /// Emit structured log lines as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initialize tracing/logging
pub fn init_logging(level: &str, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }

    Ok(())
}

/// Print one monitor report
pub fn print_report(report: &MonitorReport) {
    tracing::info!("=== Monitor Report ===");
    tracing::info!(
        "Events: {} types, {} total, {:.1}/s",
        report.statistics.total_events,
        report.statistics.total_count,
        report.events_per_second
    );
    tracing::info!(
        "Subscriptions: {} tracked, {} active",
        report.subscriptions.total,
        report.subscriptions.active
    );
    match &report.memory {
        Some(memory) => tracing::info!(
            "Memory: {:.1} MB (peak {:.1} MB, {:+.1} MB/min, trend {})",
            memory.rss_mb,
            memory.peak_mb,
            memory.growth_rate_mb_per_min,
            report.memory_trend.as_str()
        ),
        None => tracing::info!("Memory: no samples yet"),
    }
    tracing::info!(
        "Log pipeline: {} queued, {} dropped",
        report.pipeline.queued,
        report.pipeline.dropped
    );
}
