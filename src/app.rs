use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::config::Config;
use crate::event::Notification;
use crate::midi_device::MidiDevice;
use crate::shipper::Shipper;
use crate::sink::HttpSink;
use crate::tracker::Tracker;

pub async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    log::info!(
        "endpoint {} flush interval {}ms",
        config.endpoint,
        config.interval_ms
    );

    let (sender_signal, receiver_signal) = channel();
    let (sender_completed, receiver_completed) = channel();

    let tracker = Arc::new(Mutex::new(Tracker::new(sender_completed)));
    let notifications = tracker.lock().unwrap().subscribe();
    Tracker::start_listener(tracker.clone(), receiver_signal);

    let shipper = Shipper::new(HttpSink::new(&config.endpoint), receiver_completed)
        .with_interval(config.interval_ms);
    let shipper_handle = shipper.start();

    // A failed init means the platform has no MIDI access at all.
    let ports = MidiDevice::list()?;
    log::info!("MIDI inputs: {:?}", ports);
    let _device = match MidiDevice::open(config.midi_device_input.as_deref(), sender_signal) {
        Ok(device) => Some(device),
        Err(e) => {
            log::error!("MIDI input unavailable: {e}");
            None
        }
    };

    tokio::task::spawn_blocking(move || {
        while let Ok(notification) = notifications.recv() {
            match notification {
                Notification::Ready => log::info!("MIDI device ready"),
                Notification::NoteStart(record) => {
                    log::info!("note start key {} velocity {}", record.key, record.velocity)
                }
                Notification::NoteEnd(record) => {
                    log::info!("note end key {} duration {}ms", record.key, record.duration)
                }
                Notification::BeforeNoteStart(_) | Notification::BeforeNoteEnd(_) => {}
            }
        }
    });

    shipper_handle.await?;
    Ok(())
}
