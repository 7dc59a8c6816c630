use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Request counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub records_uploaded: Arc<AtomicUsize>,
    pub records_deleted: Arc<AtomicUsize>,
    pub bytes_uploaded: Arc<AtomicU64>,
    pub tag_lookups: Arc<AtomicU64>,
    pub images_rendered: Arc<AtomicUsize>,
    pub files_downloaded: Arc<AtomicUsize>,
    pub start_time: Instant,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            records_uploaded: Arc::new(AtomicUsize::new(0)),
            records_deleted: Arc::new(AtomicUsize::new(0)),
            bytes_uploaded: Arc::new(AtomicU64::new(0)),
            tag_lookups: Arc::new(AtomicU64::new(0)),
            images_rendered: Arc::new(AtomicUsize::new(0)),
            files_downloaded: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn record_upload(&self, bytes: u64) {
        self.records_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tag_lookups(&self, count: u64) {
        self.tag_lookups.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_images_rendered(&self) {
        self.images_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_downloaded(&self) {
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_uploaded: self.records_uploaded.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            tag_lookups: self.tag_lookups.load(Ordering::Relaxed),
            images_rendered: self.images_rendered.load(Ordering::Relaxed),
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub records_uploaded: usize,
    pub records_deleted: usize,
    pub bytes_uploaded: u64,
    pub tag_lookups: u64,
    pub images_rendered: usize,
    pub files_downloaded: usize,
    pub uptime_seconds: u64,
    pub started_at: String,
}
