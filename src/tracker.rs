use std::sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender, channel},
};

use crate::{
    event::{Notification, Signal},
    model::note::{Note, SharedNote},
    registry::ActiveNotes,
    util::IdGen,
};

/// The note lifecycle state machine. Signals are handled one at a time by the
/// listener loop, so per-key mutations and notifications never interleave.
pub struct Tracker {
    id_gen: IdGen,
    actives: ActiveNotes,
    history: Vec<SharedNote>,
    subscribers: Vec<Sender<Notification>>,
    sender_completed: Sender<SharedNote>,
}

impl Tracker {
    pub fn new(sender_completed: Sender<SharedNote>) -> Self {
        Self {
            id_gen: IdGen::new(),
            actives: ActiveNotes::new(),
            history: vec![],
            subscribers: vec![],
            sender_completed,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn start_listener(tracker: Arc<Mutex<Self>>, receiver: Receiver<Signal>) {
        log::debug!("Tracker::start_listener");
        tokio::spawn(async move {
            tracker_loop(tracker, receiver);
        });
    }

    pub fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::KeyDown {
                key,
                velocity,
                timestamp,
            } => self.key_down(key, velocity, timestamp),
            Signal::KeyUp { key, timestamp, .. } => self.key_up(key, timestamp),
            Signal::Connected => self.emit(Notification::Ready),
        }
    }

    fn key_down(&mut self, key: u8, velocity: u8, timestamp: i64) {
        let note = Note::new(self.id_gen.next_id(), key, velocity, timestamp).shared();
        let record = note.lock().unwrap().record_at(timestamp);
        self.emit(Notification::BeforeNoteStart(record.clone()));
        self.history.push(note.clone());
        self.actives.start(key, note);
        self.emit(Notification::NoteStart(record));
    }

    fn key_up(&mut self, key: u8, timestamp: i64) {
        let Some(note) = self.actives.get(key) else {
            log::warn!("key up for inactive key {key}, ignored");
            return;
        };
        let record = {
            let mut note = note.lock().unwrap();
            note.freeze(timestamp);
            note.record_at(timestamp)
        };
        let _ = self.sender_completed.send(note.clone());
        self.emit(Notification::BeforeNoteEnd(record.clone()));
        self.actives.stop(key);
        self.emit(Notification::NoteEnd(record));
    }

    fn emit(&mut self, notification: Notification) {
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }

    /// Every note ever started, in press order. Entries stay live until their
    /// release freezes them through the shared handle.
    pub fn history(&self) -> &[SharedNote] {
        &self.history
    }

    pub fn is_active(&self, key: u8) -> bool {
        self.actives.is_active(key)
    }

    pub fn active_count(&self) -> usize {
        self.actives.count()
    }

    pub fn playing_p(&self) -> bool {
        self.actives.playing_p()
    }
}

fn tracker_loop(tracker: Arc<Mutex<Tracker>>, receiver: Receiver<Signal>) {
    while let Ok(signal) = receiver.recv() {
        log::debug!("Tracker received {:?}", signal);
        tracker.lock().unwrap().handle(signal);
    }
}
