use std::collections::HashMap;

use crate::model::note::SharedNote;

/// The set of currently sounding notes, one slot per key. A key is present
/// iff a note for it has been started and not yet released.
#[derive(Default)]
pub struct ActiveNotes {
    notes: HashMap<u8, SharedNote>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `note` as the sounding note for `key`. A previous unreleased
    /// note on the same key is overwritten, not released.
    pub fn start(&mut self, key: u8, note: SharedNote) {
        self.notes.insert(key, note);
    }

    pub fn stop(&mut self, key: u8) -> Option<SharedNote> {
        self.notes.remove(&key)
    }

    pub fn get(&self, key: u8) -> Option<&SharedNote> {
        self.notes.get(&key)
    }

    pub fn is_active(&self, key: u8) -> bool {
        self.notes.contains_key(&key)
    }

    pub fn count(&self) -> usize {
        self.notes.len()
    }

    pub fn playing_p(&self) -> bool {
        self.count() > 0
    }
}
