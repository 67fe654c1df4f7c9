use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Note id source. Ids are unique within one process run: the stamp is taken
/// once at construction, the counter never repeats.
pub struct IdGen {
    run_stamp: i64,
    counter: AtomicUsize,
}

impl IdGen {
    pub fn new() -> Self {
        Self {
            run_stamp: now_ms(),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.run_stamp, n)
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
