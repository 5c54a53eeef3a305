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

//! Musical events and the queue that carries them to the audio context.

use std::collections::VecDeque;

use super::sync::SpinLock;
use super::CH_COUNT;

/// Lowest accepted pitch bend value.
pub const PITCH_BEND_MIN: i16 = -8192;

/// Highest accepted pitch bend value.
pub const PITCH_BEND_MAX: i16 = 8191;

/// Number of events the queue holds before it has to grow.
pub(crate) const QUEUE_CAPACITY: usize = 256;

/// A musical event addressed to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    PitchBend { channel: u8, value: i16 },
}

impl Event {
    /// Builds a Note On. Out of range channels fall back to channel 0 and the
    /// velocity is masked to 7 bits.
    pub fn note_on(note: u8, velocity: u8, channel: u8) -> Event {
        Event::NoteOn {
            channel: sanitize_channel(channel),
            note,
            velocity: velocity & 0x7f,
        }
    }

    /// Builds a Note Off with the same sanitizing as [`Event::note_on`].
    pub fn note_off(note: u8, velocity: u8, channel: u8) -> Event {
        Event::NoteOff {
            channel: sanitize_channel(channel),
            note,
            velocity: velocity & 0x7f,
        }
    }

    /// Builds a pitch bend clamped to the 14-bit MIDI range. Returns `None`
    /// for channels that don't exist.
    pub fn pitch_bend(value: i16, channel: u8) -> Option<Event> {
        if channel as usize >= CH_COUNT {
            return None;
        }
        Some(Event::PitchBend {
            channel,
            value: value.clamp(PITCH_BEND_MIN, PITCH_BEND_MAX),
        })
    }

    /// The channel this event is addressed to.
    pub fn channel(&self) -> u8 {
        match *self {
            Event::NoteOn { channel, .. }
            | Event::NoteOff { channel, .. }
            | Event::PitchBend { channel, .. } => channel,
        }
    }
}

fn sanitize_channel(channel: u8) -> u8 {
    if channel as usize >= CH_COUNT {
        0
    } else {
        channel
    }
}

/// FIFO of pending events. Every operation holds the lock for exactly one
/// push or pop.
pub(crate) struct EventQueue {
    messages: SpinLock<VecDeque<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            messages: SpinLock::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
        }
    }

    pub fn push(&self, event: Event) {
        self.messages.lock().push_back(event);
    }

    pub fn pop(&self) -> Option<Event> {
        self.messages.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }
}
