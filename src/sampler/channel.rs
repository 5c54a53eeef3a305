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
use std::sync::{Arc, Weak};

use tracing::trace;

use super::sync::Semaphore;
use super::tables::VelocityTable;
use super::timbre::Timbre;
use super::voice::VoicePool;
use super::MAX_SOUND;

/// Semitones of bend at full deflection.
const PITCH_BEND_RANGE: f32 = 12.0;

/// Magnitude of a full-deflection bend value.
const PITCH_BEND_SCALE: f32 = 8192.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlayingNote {
    note: u8,
    player: usize,
}

/// A musical channel. Voices are borrowed from the shared pool, which the
/// channel only references weakly.
#[derive(Debug)]
pub struct Channel {
    index: u8,
    timbre: Option<Arc<Timbre>>,
    pitch_bend: f32,
    playing_notes: Vec<PlayingNote>,
    pool: Weak<Semaphore<VoicePool>>,
}

impl Channel {
    pub fn new(index: u8, pool: Weak<Semaphore<VoicePool>>) -> Channel {
        Channel {
            index,
            timbre: None,
            pitch_bend: 0.0,
            playing_notes: Vec::with_capacity(MAX_SOUND),
            pool,
        }
    }

    /// Starts a voice for the note.
    pub fn note_on(&mut self, note: u8, velocity: u8, velocity_table: &VelocityTable) {
        let Some(pool) = self.pool.upgrade() else {
            trace!(channel = self.index, note, "Voice pool is gone, ignoring note on");
            return;
        };

        let sample = self
            .timbre
            .as_ref()
            .and_then(|timbre| timbre.get_appropriate_sample(note, velocity))
            .cloned();

        let mut pool = pool.lock();
        let player = pool.allocate(
            sample,
            note,
            velocity_table.volume(velocity),
            self.pitch_bend,
            self.index,
        );

        // The slot may have been stolen from one of our own notes.
        self.playing_notes.retain(|playing| playing.player != player);
        self.playing_notes.push(PlayingNote { note, player });
        trace!(channel = self.index, note, velocity, player, "Note on");
    }

    /// Releases every voice this channel started for the note that still
    /// belongs to it.
    pub fn note_off(&mut self, note: u8) {
        let Some(pool) = self.pool.upgrade() else {
            trace!(channel = self.index, note, "Voice pool is gone, ignoring note off");
            return;
        };

        let mut pool = pool.lock();
        let index = self.index;
        self.playing_notes.retain(|playing| {
            if playing.note != note {
                return true;
            }
            if let Some(player) = pool.get_mut(playing.player) {
                if player.note() == note && player.channel() == index {
                    player.release();
                }
            }
            false
        });
    }

    /// Applies a 14-bit bend value to the channel and its playing voices.
    pub fn pitch_bend(&mut self, value: i16) {
        self.pitch_bend = value as f32 * PITCH_BEND_RANGE / PITCH_BEND_SCALE;

        let Some(pool) = self.pool.upgrade() else {
            trace!(channel = self.index, value, "Voice pool is gone, ignoring pitch bend");
            return;
        };

        let mut pool = pool.lock();
        for player in pool
            .players_mut()
            .iter_mut()
            .filter(|player| player.is_playing() && player.channel() == self.index)
        {
            player.set_pitch_bend(self.pitch_bend);
        }
    }

    /// Replaces the timbre used by voices started from now on.
    pub fn set_timbre(&mut self, timbre: Option<Arc<Timbre>>) {
        self.timbre = timbre;
    }

    pub fn timbre(&self) -> Option<&Arc<Timbre>> {
        self.timbre.as_ref()
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Current bend in semitones.
    pub fn pitch_bend_semitones(&self) -> f32 {
        self.pitch_bend
    }

    /// Number of note entries this channel is tracking.
    pub fn playing_count(&self) -> usize {
        self.playing_notes.len()
    }
}
