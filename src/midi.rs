// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use midly::live::LiveEvent;
use midly::num::u4;
use midly::MidiMessage;

use crate::sampler::Event;

pub mod midir;
pub mod smf;

/// Translates a channel message into a sampler event. Note On with velocity 0
/// is a Note Off. Messages the sampler doesn't handle return `None`.
pub fn to_event(channel: u4, message: &MidiMessage) -> Option<Event> {
    let channel = channel.as_int();
    match *message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
            Some(Event::note_off(key.as_int(), 0, channel))
        }
        MidiMessage::NoteOn { key, vel } => Some(Event::note_on(key.as_int(), vel.as_int(), channel)),
        MidiMessage::NoteOff { key, vel } => {
            Some(Event::note_off(key.as_int(), vel.as_int(), channel))
        }
        MidiMessage::PitchBend { bend } => Event::pitch_bend(bend.as_int(), channel),
        _ => None,
    }
}

/// Parses raw bytes from a live input into a sampler event.
pub fn parse_live(raw: &[u8]) -> Option<Event> {
    match LiveEvent::parse(raw).ok()? {
        LiveEvent::Midi { channel, message } => to_event(channel, &message),
        _ => None,
    }
}
