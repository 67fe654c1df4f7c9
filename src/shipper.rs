use std::sync::mpsc::Receiver;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{model::note::SharedNote, sink::NoteSink, util::now_ms};

pub const DEFAULT_INTERVAL_MS: u64 = 3000;

/// Accumulates completed notes and periodically ships them to the sink.
/// Failed batches go back to the front of the queue, so nothing is lost and
/// older notes are retried ahead of newer ones (at-least-once delivery).
pub struct Shipper<S: NoteSink> {
    sink: S,
    interval_ms: u64,
    pending: Vec<SharedNote>,
    receiver_completed: Receiver<SharedNote>,
}

impl<S: NoteSink> Shipper<S> {
    pub fn new(sink: S, receiver_completed: Receiver<SharedNote>) -> Self {
        Self {
            sink,
            interval_ms: DEFAULT_INTERVAL_MS,
            pending: vec![],
            receiver_completed,
        }
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn start(self) -> JoinHandle<()> {
        log::debug!("Shipper::start interval {}ms", self.interval_ms);
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut timer = tokio::time::interval(Duration::from_millis(self.interval_ms));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            self.drain_completed();
            self.flush().await;
        }
    }

    /// Moves notes completed since the last tick out of the channel. Notes
    /// that complete while a send is in flight wait here until the next tick,
    /// so they can never race the failure handling of the current batch.
    fn drain_completed(&mut self) {
        while let Ok(note) = self.receiver_completed.try_recv() {
            self.pending.push(note);
        }
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        // Detach before the await: the batch is fixed from here on.
        let batch = std::mem::take(&mut self.pending);
        let now = now_ms();
        let records = batch
            .iter()
            .map(|note| note.lock().unwrap().record_at(now))
            .collect::<Vec<_>>();
        match self.sink.deliver(&records).await {
            Ok(()) => {
                log::debug!("delivered {} notes", records.len());
            }
            Err(e) => {
                let mut restored = batch;
                restored.append(&mut self.pending);
                self.pending = restored;
                log::warn!("delivery failed, {} notes pending: {e}", self.pending.len());
            }
        }
    }
}
