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
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::sampler::Envelope;

/// The full MIDI range, used when a sample leaves a range out.
fn full_range() -> [u8; 2] {
    [0, 127]
}

/// A YAML representation of a timbre.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct TimbreDefinition {
    /// Sample mappings, matched in order.
    samples: Vec<SampleDefinition>,
}

impl TimbreDefinition {
    pub fn samples(&self) -> &[SampleDefinition] {
        &self.samples
    }
}

/// A YAML representation of one sample mapping within a timbre.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct SampleDefinition {
    /// WAV file, relative to the config file.
    file: String,

    /// The note the file was recorded at.
    root: u8,

    /// Inclusive note range.
    #[serde(default = "full_range")]
    notes: [u8; 2],

    /// Inclusive velocity range.
    #[serde(default = "full_range")]
    velocities: [u8; 2],

    /// Loop start, in frames of the file as stored on disk.
    loop_start: Option<usize>,

    /// Loop end, in frames of the file as stored on disk.
    loop_end: Option<usize>,

    /// Envelope coefficients. Samples without one play at constant gain.
    envelope: Option<EnvelopeDefinition>,
}

impl SampleDefinition {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn notes(&self) -> RangeInclusive<u8> {
        self.notes[0]..=self.notes[1]
    }

    pub fn velocities(&self) -> RangeInclusive<u8> {
        self.velocities[0]..=self.velocities[1]
    }

    /// The loop region, when both ends are given.
    pub fn loop_points(&self) -> Option<(usize, usize)> {
        self.loop_start.zip(self.loop_end)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        self.envelope.as_ref().map(EnvelopeDefinition::to_envelope)
    }
}

#[cfg(test)]
impl SampleDefinition {
    /// Creates a new sample definition (test only).
    pub fn new(file: &str, root: u8, notes: [u8; 2], velocities: [u8; 2]) -> SampleDefinition {
        SampleDefinition {
            file: file.to_string(),
            root,
            notes,
            velocities,
            loop_start: None,
            loop_end: None,
            envelope: None,
        }
    }

    /// Sets the loop points (test only).
    pub fn with_loop(mut self, start: usize, end: usize) -> SampleDefinition {
        self.loop_start = Some(start);
        self.loop_end = Some(end);
        self
    }
}

/// Envelope coefficients as written in YAML.
#[derive(Deserialize, Clone, Copy, Serialize, Debug)]
pub struct EnvelopeDefinition {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
}

impl EnvelopeDefinition {
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
        }
    }
}
