use crate::config::SECONDS_PER_PAGE;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Page-based progress estimate for a history fetch.
#[derive(Debug)]
pub struct Progress {
    estimated_pages: AtomicU64,
    pages_done: AtomicU64,
    started: Instant,
}

impl Default for Progress {
    fn default() -> Self {
        Progress::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Progress {
            estimated_pages: AtomicU64::new(0),
            pages_done: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn set_estimate(&self, pages: u64) {
        self.estimated_pages.store(pages, Ordering::Relaxed);
        info!(
            "Estimated {} pages, ~{:.0} seconds",
            pages,
            pages as f64 * SECONDS_PER_PAGE
        );
    }

    pub fn add_page(&self) -> u64 {
        self.pages_done.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn pages_done(&self) -> u64 {
        self.pages_done.load(Ordering::Relaxed)
    }

    pub fn remaining_seconds(&self) -> f64 {
        let estimate = self.estimated_pages.load(Ordering::Relaxed);
        estimate.saturating_sub(self.pages_done()) as f64 * SECONDS_PER_PAGE
    }

    pub fn report_message(&self, message: &str) {
        info!(
            "{} [{:.1}s elapsed, ~{:.0}s remaining]",
            message,
            self.started.elapsed().as_secs_f64(),
            self.remaining_seconds()
        );
    }
}
