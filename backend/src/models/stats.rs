use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

/// Transfer counters for the lifetime of one server instance.
#[derive(Debug)]
pub struct ServerStats {
    downloads: AtomicU64,
    uploads: AtomicU64,
    start_time: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub downloads: u64,
    pub uploads: u64,
    pub start_time: String,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            downloads: AtomicU64::new(0),
            uploads: AtomicU64::new(0),
            start_time: Local::now(),
        }
    }

    pub fn record_download(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            downloads: self.downloads.load(Ordering::Relaxed),
            uploads: self.uploads.load(Ordering::Relaxed),
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}
