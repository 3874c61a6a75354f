//! Relay health tracking.
//!
//! Counters are lock-free; the few string fields sit behind a
//! `parking_lot::RwLock` and are only touched once per cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Health status of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Last cycle completed without error.
    Healthy,
    /// Last cycle failed; the relay keeps running.
    Degraded,
    /// No cycle has completed yet.
    #[default]
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Default)]
struct CycleRecord {
    last_check: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_delivered_id: Option<String>,
}

/// Shared, cheaply updated view of what the relay has been doing.
#[derive(Debug)]
pub struct RelayHealth {
    start_time: Instant,
    source: String,
    check_interval: Duration,
    destination_ready: AtomicBool,
    cycles: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
    record: RwLock<CycleRecord>,
}

/// Point-in-time copy of [`RelayHealth`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub source: String,
    pub destination_ready: bool,
    pub uptime_secs: u64,
    pub check_interval_secs: u64,
    pub cycles: u64,
    pub deliveries: u64,
    pub failures: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_delivered_id: Option<String>,
}

impl RelayHealth {
    pub fn new(source: impl Into<String>, check_interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            source: source.into(),
            check_interval,
            destination_ready: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            record: RwLock::new(CycleRecord::default()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Mark the destination session usable.
    pub fn set_destination_ready(&self, ready: bool) {
        self.destination_ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_destination_ready(&self) -> bool {
        self.destination_ready.load(Ordering::Relaxed)
    }

    /// Record a cycle that finished without error.
    pub fn record_success(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        let mut record = self.record.write();
        record.last_check = Some(Utc::now());
        record.last_error = None;
    }

    /// Record a confirmed delivery. Call before [`Self::record_success`].
    pub fn record_delivery(&self, item_id: &str) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        self.record.write().last_delivered_id = Some(item_id.to_string());
    }

    /// Record a failed cycle.
    pub fn record_failure(&self, error: &impl std::fmt::Display) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        let mut record = self.record.write();
        record.last_check = Some(Utc::now());
        record.last_error = Some(error.to_string());
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.record.read().last_check
    }

    pub fn status(&self) -> HealthStatus {
        let record = self.record.read();
        match (&record.last_check, &record.last_error) {
            (None, _) => HealthStatus::Unknown,
            (Some(_), None) => HealthStatus::Healthy,
            (Some(_), Some(_)) => HealthStatus::Degraded,
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let status = self.status();
        let record = self.record.read();
        HealthSnapshot {
            status,
            source: self.source.clone(),
            destination_ready: self.is_destination_ready(),
            uptime_secs: self.uptime().as_secs(),
            check_interval_secs: self.check_interval.as_secs(),
            cycles: self.cycles.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_check: record.last_check,
            last_error: record.last_error.clone(),
            last_delivered_id: record.last_delivered_id.clone(),
        }
    }
}
