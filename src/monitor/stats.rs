//! Shared monitor counters, surfaced by the status endpoint.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Point-in-time view of monitor progress.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub price_cycles_completed: u64,
    pub last_cycle_started: Option<DateTime<Utc>>,
    pub last_cycle_finished: Option<DateTime<Utc>>,
    pub last_cycle_apps: usize,
    pub last_cycle_failures: usize,
    pub notifications_sent: u64,
    pub sale_checks_completed: u64,
}

/// Counters written by the monitor loops and read by the web server.
pub struct CycleStats {
    price_cycles_completed: RwLock<u64>,
    last_cycle_started: RwLock<Option<DateTime<Utc>>>,
    last_cycle_finished: RwLock<Option<DateTime<Utc>>>,
    last_cycle_apps: RwLock<usize>,
    last_cycle_failures: RwLock<usize>,
    notifications_sent: RwLock<u64>,
    sale_checks_completed: RwLock<u64>,
}

impl CycleStats {
    pub fn new() -> Self {
        Self {
            price_cycles_completed: RwLock::new(0),
            last_cycle_started: RwLock::new(None),
            last_cycle_finished: RwLock::new(None),
            last_cycle_apps: RwLock::new(0),
            last_cycle_failures: RwLock::new(0),
            notifications_sent: RwLock::new(0),
            sale_checks_completed: RwLock::new(0),
        }
    }

    pub fn cycle_started(&self, at: DateTime<Utc>) {
        *self.last_cycle_started.write() = Some(at);
    }

    pub fn cycle_finished(&self, apps: usize, failures: usize, sent: u64, at: DateTime<Utc>) {
        *self.price_cycles_completed.write() += 1;
        *self.last_cycle_finished.write() = Some(at);
        *self.last_cycle_apps.write() = apps;
        *self.last_cycle_failures.write() = failures;
        *self.notifications_sent.write() += sent;
    }

    pub fn sale_check_finished(&self, sent: u64) {
        *self.sale_checks_completed.write() += 1;
        *self.notifications_sent.write() += sent;
    }

    /// Snapshot for the status endpoint.
    pub fn snapshot(&self) -> MonitorStatus {
        MonitorStatus {
            price_cycles_completed: *self.price_cycles_completed.read(),
            last_cycle_started: *self.last_cycle_started.read(),
            last_cycle_finished: *self.last_cycle_finished.read(),
            last_cycle_apps: *self.last_cycle_apps.read(),
            last_cycle_failures: *self.last_cycle_failures.read(),
            notifications_sent: *self.notifications_sent.read(),
            sale_checks_completed: *self.sale_checks_completed.read(),
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}
