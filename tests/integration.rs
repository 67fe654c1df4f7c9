//! Integration tests for note_courier.
//!
//! These tests exercise the signal → tracker → shipper pipeline without a
//! hardware MIDI device, using in-memory sinks in place of the HTTP endpoint.

use std::future::Future;
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use note_courier::event::Signal;
use note_courier::model::note::NoteRecord;
use note_courier::shipper::Shipper;
use note_courier::sink::NoteSink;
use note_courier::tracker::Tracker;
use note_courier::util::now_ms;

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}

// ---------------------------------------------------------------------------
// 1. End-to-end delivery with a sink that fails the first attempts
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct FlakySink {
    fail_remaining: Arc<Mutex<u32>>,
    delivered: Arc<Mutex<Vec<Vec<NoteRecord>>>>,
}

impl NoteSink for FlakySink {
    fn deliver(&self, batch: &[NoteRecord]) -> impl Future<Output = Result<()>> + Send {
        let batch = batch.to_vec();
        let sink = self.clone();
        async move {
            {
                let mut fail_remaining = sink.fail_remaining.lock().unwrap();
                if *fail_remaining > 0 {
                    *fail_remaining -= 1;
                    bail!("persist endpoint unavailable");
                }
            }
            sink.delivered.lock().unwrap().push(batch);
            Ok(())
        }
    }
}

/// Three completed notes, a sink that fails twice: every note ends up in
/// exactly one successful batch, in completion order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn notes_survive_failed_deliveries() {
    let (sender_signal, receiver_signal) = channel();
    let (sender_completed, receiver_completed) = channel();
    let tracker = Arc::new(Mutex::new(Tracker::new(sender_completed)));
    Tracker::start_listener(tracker.clone(), receiver_signal);

    let sink = FlakySink::default();
    *sink.fail_remaining.lock().unwrap() = 2;
    Shipper::new(sink.clone(), receiver_completed)
        .with_interval(10)
        .start();

    for (i, key) in [60u8, 62, 64].iter().enumerate() {
        let t = 1000 + i as i64 * 100;
        sender_signal
            .send(Signal::KeyDown {
                key: *key,
                velocity: 80,
                timestamp: t,
            })
            .unwrap();
        sender_signal
            .send(Signal::KeyUp {
                key: *key,
                velocity: 0,
                timestamp: t + 500,
            })
            .unwrap();
    }

    let delivered = sink.delivered.clone();
    wait_until(|| {
        delivered
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.len())
            .sum::<usize>()
            == 3
    })
    .await;

    let delivered = delivered.lock().unwrap();
    let records = delivered.iter().flatten().collect::<Vec<_>>();
    assert_eq!(records.iter().map(|r| r.key).collect::<Vec<_>>(), [60, 62, 64]);
    for record in &records {
        assert_eq!(record.duration, 500);
        assert_eq!(record.velocity, 80);
    }
    // No note appears in more than one successful batch.
    let mut ids = records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    assert!(!tracker.lock().unwrap().playing_p());
    assert_eq!(tracker.lock().unwrap().history().len(), 3);
}

// ---------------------------------------------------------------------------
// 2. A note completing while a failed send is in flight
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct GatedSink {
    entered: tokio::sync::mpsc::UnboundedSender<()>,
    release: Arc<tokio::sync::Notify>,
    fail_remaining: Arc<Mutex<u32>>,
    delivered: Arc<Mutex<Vec<Vec<NoteRecord>>>>,
}

impl NoteSink for GatedSink {
    fn deliver(&self, batch: &[NoteRecord]) -> impl Future<Output = Result<()>> + Send {
        let batch = batch.to_vec();
        let sink = self.clone();
        async move {
            let _ = sink.entered.send(());
            let fail = {
                let mut fail_remaining = sink.fail_remaining.lock().unwrap();
                if *fail_remaining > 0 {
                    *fail_remaining -= 1;
                    true
                } else {
                    false
                }
            };
            if fail {
                // Hold the attempt open until the test has injected more work.
                sink.release.notified().await;
                bail!("persist endpoint unavailable");
            }
            sink.delivered.lock().unwrap().push(batch);
            Ok(())
        }
    }
}

/// Two notes complete before the first flush; a third completes while the
/// failed attempt is still in flight. The final successful batch carries all
/// three, the first two ahead of the third.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn midflight_completion_lands_behind_the_restored_batch() {
    let (sender_signal, receiver_signal) = channel();
    let (sender_completed, receiver_completed) = channel();
    let tracker = Arc::new(Mutex::new(Tracker::new(sender_completed)));
    Tracker::start_listener(tracker.clone(), receiver_signal);

    let (entered_sender, mut entered) = tokio::sync::mpsc::unbounded_channel();
    let sink = GatedSink {
        entered: entered_sender,
        release: Arc::new(tokio::sync::Notify::new()),
        fail_remaining: Arc::new(Mutex::new(1)),
        delivered: Arc::new(Mutex::new(vec![])),
    };
    Shipper::new(sink.clone(), receiver_completed)
        .with_interval(10)
        .start();

    let press_and_release = |key: u8, t: i64| {
        sender_signal
            .send(Signal::KeyDown {
                key,
                velocity: 100,
                timestamp: t,
            })
            .unwrap();
        sender_signal
            .send(Signal::KeyUp {
                key,
                velocity: 0,
                timestamp: t + 200,
            })
            .unwrap();
    };

    press_and_release(60, 1000);
    press_and_release(62, 1300);

    // First attempt is now in flight and will fail once released.
    entered.recv().await.unwrap();
    press_and_release(64, 1600);
    // The third completion must be in the channel before the attempt resolves.
    wait_until(|| {
        let tracker = tracker.lock().unwrap();
        tracker.history().len() == 3 && !tracker.is_active(64)
    })
    .await;
    sink.release.notify_one();

    // Second attempt succeeds.
    entered.recv().await.unwrap();
    let delivered = sink.delivered.clone();
    wait_until(|| !delivered.lock().unwrap().is_empty()).await;

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let keys = delivered[0].iter().map(|r| r.key).collect::<Vec<_>>();
    assert_eq!(keys, [60, 62, 64]);
}

// ---------------------------------------------------------------------------
// 3. Live notes against the wall clock
// ---------------------------------------------------------------------------

/// While a key is held, repeated duration reads grow with the clock; the
/// history entry is the same note the registry holds.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn held_note_duration_grows_until_released() {
    let (sender_completed, _receiver_completed) = channel();
    let mut tracker = Tracker::new(sender_completed);

    tracker.handle(Signal::KeyDown {
        key: 60,
        velocity: 70,
        timestamp: now_ms(),
    });
    assert!(tracker.playing_p());

    let note = tracker.history()[0].clone();
    let first = note.lock().unwrap().duration_at(now_ms());
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = note.lock().unwrap().duration_at(now_ms());
    assert!(second > first);

    tracker.handle(Signal::KeyUp {
        key: 60,
        velocity: 0,
        timestamp: now_ms(),
    });
    let frozen = note.lock().unwrap().duration_at(now_ms());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(note.lock().unwrap().duration_at(now_ms()), frozen);
    assert!(!tracker.playing_p());
}
