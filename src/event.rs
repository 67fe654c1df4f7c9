use crate::model::note::NoteRecord;

/// Decoded input signal. The MIDI decode callback guarantees that velocity 0
/// only ever appears on `KeyUp`; a note-on with velocity 0 arrives here already
/// reclassified as a release.
#[derive(Clone, Debug)]
pub enum Signal {
    KeyDown { key: u8, velocity: u8, timestamp: i64 },
    KeyUp { key: u8, velocity: u8, timestamp: i64 },
    Connected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Ready,
    BeforeNoteStart(NoteRecord),
    NoteStart(NoteRecord),
    BeforeNoteEnd(NoteRecord),
    NoteEnd(NoteRecord),
}
