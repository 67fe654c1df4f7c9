use std::sync::mpsc::Sender;

use anyhow::{Result, anyhow};
use midir::{Ignore, MidiInput, MidiInputConnection};
use wmidi::MidiMessage;

use crate::{event::Signal, util::now_ms};

const CLIENT_NAME: &str = "note_courier";

pub struct MidiDevice {
    _connection: MidiInputConnection<()>,
}

impl MidiDevice {
    pub fn list() -> Result<Vec<String>> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::Sysex | Ignore::Time | Ignore::ActiveSense);
        let ports = input
            .ports()
            .iter()
            .filter_map(|port| input.port_name(port).ok())
            .collect();
        Ok(ports)
    }

    /// Connects to the named port, or the first available one when `name` is
    /// `None`. Decodes raw messages to `Signal`s: note-on with velocity 0 is a
    /// release, so every `KeyDown` carries velocity >= 1 and every `KeyUp`
    /// carries velocity 0.
    pub fn open(name: Option<&str>, sender: Sender<Signal>) -> Result<Self> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::Sysex | Ignore::Time | Ignore::ActiveSense);
        let port = match name {
            Some(name) => input
                .ports()
                .into_iter()
                .find(|port| input.port_name(port).ok().as_deref() == Some(name))
                .ok_or_else(|| anyhow!("{name} is not found!"))?,
            None => input
                .ports()
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no MIDI input port available"))?,
        };
        log::info!("MIDI input {:?}", input.port_name(&port));

        let callback_sender = sender.clone();
        let connection = input
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, data, ()| {
                    let Ok(message) = MidiMessage::try_from(data) else {
                        return;
                    };
                    let Some(signal) = decode(&message) else {
                        return;
                    };
                    let _ = callback_sender.send(signal);
                },
                (),
            )
            .map_err(|e| anyhow!("failed to connect MIDI input: {e}"))?;

        let _ = sender.send(Signal::Connected);
        Ok(Self {
            _connection: connection,
        })
    }
}

fn decode(message: &MidiMessage) -> Option<Signal> {
    let timestamp = now_ms();
    match message {
        MidiMessage::NoteOn(_channel, key, velocity) => {
            let key = *key as u8;
            let velocity = u8::from(*velocity);
            if velocity == 0 {
                Some(Signal::KeyUp {
                    key,
                    velocity: 0,
                    timestamp,
                })
            } else {
                Some(Signal::KeyDown {
                    key,
                    velocity,
                    timestamp,
                })
            }
        }
        MidiMessage::NoteOff(_channel, key, _velocity) => Some(Signal::KeyUp {
            key: *key as u8,
            velocity: 0,
            timestamp,
        }),
        _ => None,
    }
}
