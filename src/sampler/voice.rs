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
use std::sync::Arc;

use super::sample::Sample;
use super::MAX_SOUND;
use crate::audio::resample::{self, ResampleWork};

/// Gain below which an envelope stage is considered settled.
const ENVELOPE_EPSILON: f32 = 0.001;

/// Envelope stage of a sample player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    #[default]
    Attack,
    Decay,
    Sustain,
    Release,
}

/// One slot of the voice pool.
#[derive(Debug, Clone, Default)]
pub struct SamplePlayer {
    sample: Option<Arc<Sample>>,
    note: u8,
    channel: u8,
    /// Base volume from the velocity curve.
    volume: f32,
    /// Pitch bend in semitones.
    pitch_bend: f32,
    pos: usize,
    pos_f: f32,
    pitch: f32,
    gain: f32,
    state: EnvelopeState,
    released: bool,
    playing: bool,
    created_at: u64,
}

impl SamplePlayer {
    /// Creates a playing voice. A voice with an enveloped sample starts
    /// silent in the attack stage.
    pub fn new(
        sample: Option<Arc<Sample>>,
        note: u8,
        volume: f32,
        pitch_bend: f32,
        channel: u8,
        created_at: u64,
    ) -> SamplePlayer {
        let gain = match sample.as_deref() {
            Some(sample) if sample.adsr_enabled() => 0.0,
            _ => volume,
        };
        let mut player = SamplePlayer {
            sample,
            note,
            channel,
            volume,
            pitch_bend,
            pos: 0,
            pos_f: 0.0,
            pitch: 1.0,
            gain,
            state: EnvelopeState::Attack,
            released: false,
            playing: true,
            created_at,
        };
        player.update_pitch();
        player
    }

    /// Recomputes the playback ratio from the note, root and bend.
    pub fn update_pitch(&mut self) {
        let Some(sample) = self.sample.as_deref() else {
            self.pitch = 1.0;
            return;
        };
        let semitones = self.note as f32 - sample.root() as f32 + self.pitch_bend;
        self.pitch = (semitones / 12.0).exp2();
    }

    /// Advances the envelope by one update.
    pub fn update_gain(&mut self) {
        let Some(envelope) = self.sample.as_deref().and_then(Sample::envelope).copied() else {
            self.gain = self.volume;
            return;
        };

        if self.released {
            self.state = EnvelopeState::Release;
        }

        match self.state {
            EnvelopeState::Attack => {
                self.gain += envelope.attack * self.volume;
                if self.gain >= self.volume {
                    self.gain = self.volume;
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                let goal = envelope.sustain * self.volume;
                self.gain = (self.gain - goal) * envelope.decay + goal;
                if self.gain - goal < ENVELOPE_EPSILON {
                    self.gain = goal;
                    self.state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => {}
            EnvelopeState::Release => {
                self.gain *= envelope.release;
                if self.gain < ENVELOPE_EPSILON {
                    self.gain = 0.0;
                    self.playing = false;
                }
            }
        }
    }

    /// Sets the bend in semitones and recomputes the pitch.
    pub fn set_pitch_bend(&mut self, semitones: f32) {
        self.pitch_bend = semitones;
        self.update_pitch();
    }

    /// Marks the voice as released. The envelope enters its release stage on
    /// the next update.
    pub fn release(&mut self) {
        self.released = true;
    }

    /// Renders one sub-block into `dst`, adding to what is already there.
    ///
    /// Returns false once the voice stopped, in which case the remaining
    /// sub-blocks of the block must be skipped.
    pub(crate) fn render(&mut self, dst: &mut [f32], master_gain: f32) -> bool {
        if self.sample.is_none() {
            if self.released {
                self.playing = false;
            }
            return false;
        }

        self.update_gain();
        if !self.playing {
            return false;
        }

        let Some(sample) = self.sample.as_deref() else {
            return false;
        };
        let mut work = ResampleWork {
            src: sample.data(),
            pos: self.pos,
            pos_f: self.pos_f,
            gain: self.gain * master_gain,
            pitch: self.pitch,
        };
        resample::process_inner(&mut work, dst);

        let mut pos = work.pos;
        match sample.loop_region() {
            Some((start, end)) if sample.adsr_enabled() => {
                while pos >= end {
                    pos -= end - start;
                }
            }
            _ => {
                if pos >= sample.len() {
                    self.playing = false;
                    return false;
                }
            }
        }
        self.pos = pos;
        self.pos_f = work.pos_f;
        true
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn sample(&self) -> Option<&Arc<Sample>> {
        self.sample.as_ref()
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Integer and fractional playback position.
    pub fn position(&self) -> (usize, f32) {
        (self.pos, self.pos_f)
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }
}

/// The fixed set of sample players shared by every channel.
#[derive(Debug)]
pub struct VoicePool {
    players: [SamplePlayer; MAX_SOUND],
    clock: u64,
}

impl VoicePool {
    pub fn new() -> VoicePool {
        VoicePool {
            players: Default::default(),
            clock: 0,
        }
    }

    /// Starts a voice in the first free slot, stealing the oldest voice in the
    /// pool when every slot is busy. Returns the slot index.
    pub fn allocate(
        &mut self,
        sample: Option<Arc<Sample>>,
        note: u8,
        volume: f32,
        pitch_bend: f32,
        channel: u8,
    ) -> usize {
        let index = self
            .players
            .iter()
            .position(|player| !player.playing)
            .unwrap_or_else(|| self.oldest());

        self.players[index] =
            SamplePlayer::new(sample, note, volume, pitch_bend, channel, self.clock);
        self.clock += 1;
        index
    }

    fn oldest(&self) -> usize {
        self.players
            .iter()
            .enumerate()
            .min_by_key(|(_, player)| player.created_at)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    pub fn players(&self) -> &[SamplePlayer; MAX_SOUND] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [SamplePlayer; MAX_SOUND] {
        &mut self.players
    }

    pub fn get(&self, index: usize) -> Option<&SamplePlayer> {
        self.players.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SamplePlayer> {
        self.players.get_mut(index)
    }

    /// Number of playing slots.
    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|player| player.playing).count()
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}
