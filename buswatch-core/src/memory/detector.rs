//! Rolling-window growth detection with deduplicated warnings

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, warn};

use crate::memory::{MemoryReader, MemoryReading, ProcessMemoryReader};

/// Thresholds and capacities for trend detection
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Above this RSS a warning-level message fires
    pub warning_threshold_mb: f64,
    /// Above this RSS a critical-level message fires
    pub critical_threshold_mb: f64,
    /// Growth rate beyond which a rapid-growth warning fires
    pub rapid_growth_mb_per_min: f64,
    /// Rolling sample window capacity
    pub window_capacity: usize,
    /// Cap on retained warning messages
    pub max_warnings: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            warning_threshold_mb: 1000.0,
            critical_threshold_mb: 2000.0,
            rapid_growth_mb_per_min: 50.0,
            window_capacity: 100,
            max_warnings: 100,
        }
    }
}

/// One sample in the rolling window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySample {
    pub rss_mb: f64,
    /// Running maximum across the detector's lifetime
    pub peak_mb: f64,
    /// Delta vs. the previous sample, in MB per minute; 0 with fewer than
    /// two samples or non-positive elapsed time
    pub growth_rate_mb_per_min: f64,
    pub reclaimed_objects: u64,
    pub unreclaimable_objects: u64,
    pub timestamp: SystemTime,
}

/// Latest-sample view plus recent warnings
#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub rss_mb: f64,
    pub peak_mb: f64,
    pub growth_rate_mb_per_min: f64,
    pub reclaimed_objects: u64,
    pub unreclaimable_objects: u64,
    /// Up to the 10 most recent warnings, oldest of those first
    pub warnings: Vec<String>,
}

struct DetectorInner {
    window: VecDeque<MemorySample>,
    warnings: Vec<String>,
    peak_mb: f64,
}

/// Samples memory and tracks growth across a bounded window
pub struct MemoryTrendDetector {
    config: MemoryConfig,
    reader: Box<dyn MemoryReader>,
    inner: Mutex<DetectorInner>,
}

impl MemoryTrendDetector {
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_reader(config, Box::new(ProcessMemoryReader))
    }

    pub fn with_reader(config: MemoryConfig, reader: Box<dyn MemoryReader>) -> Self {
        Self {
            config,
            reader,
            inner: Mutex::new(DetectorInner {
                window: VecDeque::new(),
                warnings: Vec::new(),
                peak_mb: 0.0,
            }),
        }
    }

    /// Take one sample from the reader at the current wall time
    pub fn sample(&self) -> MemorySample {
        self.ingest(self.reader.read(), SystemTime::now())
    }

    /// Ingest a reading taken at `timestamp`.
    ///
    /// Appends to the window (evicting the oldest on overflow), derives
    /// growth rate and peak, then evaluates the three threshold rules. The
    /// rapid-growth rule is independent of the absolute-level rules, so one
    /// sample can raise two warnings.
    pub fn ingest(&self, reading: MemoryReading, timestamp: SystemTime) -> MemorySample {
        let mut inner = self.inner.lock();

        let growth_rate = match inner.window.back() {
            Some(previous) => timestamp
                .duration_since(previous.timestamp)
                .ok()
                .map(|elapsed| elapsed.as_secs_f64() / 60.0)
                .filter(|minutes| *minutes > 0.0)
                .map(|minutes| (reading.rss_mb - previous.rss_mb) / minutes)
                .unwrap_or(0.0),
            None => 0.0,
        };

        inner.peak_mb = inner.peak_mb.max(reading.rss_mb);
        let sample = MemorySample {
            rss_mb: reading.rss_mb,
            peak_mb: inner.peak_mb,
            growth_rate_mb_per_min: growth_rate,
            reclaimed_objects: reading.reclaimed_objects,
            unreclaimable_objects: reading.unreclaimable_objects,
            timestamp,
        };

        if inner.window.len() == self.config.window_capacity {
            inner.window.pop_front();
        }
        inner.window.push_back(sample.clone());

        self.check_thresholds(&mut inner, &sample);
        sample
    }

    fn check_thresholds(&self, inner: &mut DetectorInner, sample: &MemorySample) {
        if sample.rss_mb > self.config.critical_threshold_mb {
            let message = format!(
                "CRITICAL: Memory usage {:.1}MB exceeds {:.0}MB",
                sample.rss_mb, self.config.critical_threshold_mb
            );
            if Self::push_warning(inner, self.config.max_warnings, message.clone()) {
                error!("{message}");
            }
        } else if sample.rss_mb > self.config.warning_threshold_mb {
            let message = format!(
                "WARNING: Memory usage {:.1}MB exceeds {:.0}MB",
                sample.rss_mb, self.config.warning_threshold_mb
            );
            if Self::push_warning(inner, self.config.max_warnings, message.clone()) {
                warn!("{message}");
            }
        }

        if sample.growth_rate_mb_per_min > self.config.rapid_growth_mb_per_min {
            let message = format!(
                "WARNING: Rapid memory growth detected: {:.1}MB/min",
                sample.growth_rate_mb_per_min
            );
            if Self::push_warning(inner, self.config.max_warnings, message.clone()) {
                warn!("{message}");
            }
        }
    }

    // Dedup by exact text; returns whether the message was new
    fn push_warning(inner: &mut DetectorInner, cap: usize, message: String) -> bool {
        if inner.warnings.contains(&message) {
            return false;
        }
        if inner.warnings.len() == cap {
            inner.warnings.remove(0);
        }
        inner.warnings.push(message);
        true
    }

    /// Latest sample plus the 10 most recent warnings; `None` before the
    /// first sample
    pub fn summary(&self) -> Option<MemorySummary> {
        let inner = self.inner.lock();
        let latest = inner.window.back()?;
        let tail = inner.warnings.len().saturating_sub(10);
        Some(MemorySummary {
            rss_mb: latest.rss_mb,
            peak_mb: latest.peak_mb,
            growth_rate_mb_per_min: latest.growth_rate_mb_per_min,
            reclaimed_objects: latest.reclaimed_objects,
            unreclaimable_objects: latest.unreclaimable_objects,
            warnings: inner.warnings[tail..].to_vec(),
        })
    }

    /// Snapshot of the sample window, oldest first
    pub fn samples(&self) -> Vec<MemorySample> {
        self.inner.lock().window.iter().cloned().collect()
    }

    /// All retained warnings, oldest first
    pub fn warnings(&self) -> Vec<String> {
        self.inner.lock().warnings.clone()
    }

    /// Drop samples and warnings (peak survives: it is a lifetime maximum)
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.window.clear();
        inner.warnings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reading(rss_mb: f64) -> MemoryReading {
        MemoryReading {
            rss_mb,
            reclaimed_objects: 0,
            unreclaimable_objects: 0,
        }
    }

    fn detector() -> MemoryTrendDetector {
        MemoryTrendDetector::new(MemoryConfig::default())
    }

    #[test]
    fn test_no_samples_means_no_summary() {
        assert!(detector().summary().is_none());
    }

    #[test]
    fn test_first_sample_has_zero_growth() {
        let detector = detector();
        let sample = detector.ingest(reading(100.0), SystemTime::now());
        assert_eq!(sample.growth_rate_mb_per_min, 0.0);
        assert_eq!(sample.peak_mb, 100.0);
    }

    #[test]
    fn test_growth_rate_from_synthetic_sequence() {
        let detector = detector();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let minute = Duration::from_secs(60);

        detector.ingest(reading(100.0), t0);
        let second = detector.ingest(reading(100.0), t0 + minute);
        assert_eq!(second.growth_rate_mb_per_min, 0.0);

        let third = detector.ingest(reading(160.0), t0 + minute * 2);
        assert!((third.growth_rate_mb_per_min - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_rapid_growth_warning_fires_once() {
        let detector = detector();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let minute = Duration::from_secs(60);

        detector.ingest(reading(100.0), t0);
        detector.ingest(reading(160.0), t0 + minute);
        // Same rate again: same warning text, deduplicated
        detector.ingest(reading(220.0), t0 + minute * 2);

        let rapid = detector
            .warnings()
            .into_iter()
            .filter(|w| w.contains("Rapid"))
            .count();
        assert_eq!(rapid, 1);
    }

    #[test]
    fn test_level_and_growth_rules_are_independent() {
        let detector = detector();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);

        detector.ingest(reading(1900.0), t0);
        detector.ingest(reading(2100.0), t0 + Duration::from_secs(60));

        let warnings = detector.warnings();
        assert!(warnings.iter().any(|w| w.starts_with("CRITICAL")));
        assert!(warnings.iter().any(|w| w.contains("Rapid")));
    }

    #[test]
    fn test_non_positive_elapsed_gives_zero_growth() {
        let detector = detector();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        detector.ingest(reading(100.0), t0);
        let sample = detector.ingest(reading(500.0), t0);
        assert_eq!(sample.growth_rate_mb_per_min, 0.0);
    }

    #[test]
    fn test_window_is_bounded() {
        let detector = MemoryTrendDetector::new(MemoryConfig {
            window_capacity: 4,
            ..MemoryConfig::default()
        });
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        for i in 0..10 {
            detector.ingest(reading(100.0 + i as f64), t0 + Duration::from_secs(i));
        }
        let samples = detector.samples();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].rss_mb, 106.0);
    }

    #[test]
    fn test_summary_reports_last_ten_warnings_oldest_first() {
        let detector = MemoryTrendDetector::new(MemoryConfig {
            warning_threshold_mb: 0.0,
            critical_threshold_mb: f64::MAX,
            ..MemoryConfig::default()
        });
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        for i in 0..12 {
            // Distinct RSS per sample → distinct warning texts
            detector.ingest(reading(10.0 + i as f64), t0 + Duration::from_secs(i * 3600));
        }

        let summary = detector.summary().unwrap();
        assert_eq!(summary.warnings.len(), 10);
        assert!(summary.warnings[0].contains("12.0MB"));
        assert!(summary.warnings[9].contains("21.0MB"));
    }

    #[test]
    fn test_peak_is_running_maximum() {
        let detector = detector();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        detector.ingest(reading(300.0), t0);
        let dip = detector.ingest(reading(200.0), t0 + Duration::from_secs(60));
        assert_eq!(dip.peak_mb, 300.0);
    }
}
