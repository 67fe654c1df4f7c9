use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Shared handle: the registry, the history log and the delivery buffer all
/// point at the same note, so a freeze is visible everywhere at once.
pub type SharedNote = Arc<Mutex<Note>>;

#[derive(Clone, Debug, PartialEq)]
enum DurationState {
    Live,
    Frozen(u64),
}

/// One press-to-release interval. Identity, key, velocity and start time are
/// fixed at construction; only the duration state changes, exactly once, when
/// the key is released.
#[derive(Clone, Debug)]
pub struct Note {
    pub id: String,
    pub key: u8,
    pub velocity: u8,
    pub timestamp: i64,
    duration: DurationState,
}

impl Note {
    pub fn new(id: String, key: u8, velocity: u8, timestamp: i64) -> Self {
        Self {
            id,
            key,
            velocity,
            timestamp,
            duration: DurationState::Live,
        }
    }

    pub fn shared(self) -> SharedNote {
        Arc::new(Mutex::new(self))
    }

    pub fn playing(&self) -> bool {
        self.duration == DurationState::Live
    }

    /// Elapsed milliseconds since the press. Live notes recompute against
    /// `now_ms` on every read; frozen notes always return the frozen value.
    pub fn duration_at(&self, now_ms: i64) -> u64 {
        match self.duration {
            DurationState::Live => now_ms.saturating_sub(self.timestamp).max(0) as u64,
            DurationState::Frozen(ms) => ms,
        }
    }

    /// Freeze the duration at the release instant. A second call changes
    /// nothing.
    pub fn freeze(&mut self, at_ms: i64) {
        if self.duration == DurationState::Live {
            self.duration = DurationState::Frozen(self.duration_at(at_ms));
        }
    }

    pub fn record_at(&self, now_ms: i64) -> NoteRecord {
        NoteRecord {
            id: self.id.clone(),
            key: self.key,
            velocity: self.velocity,
            timestamp: self.timestamp,
            duration: self.duration_at(now_ms),
        }
    }
}

/// Serialization view sent to subscribers and to the persistence endpoint.
/// `duration` is evaluated at serialization time, so a still-playing note
/// yields its elapsed-so-far value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteRecord {
    pub id: String,
    pub key: u8,
    pub velocity: u8,
    pub timestamp: i64,
    pub duration: u64,
}
