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
use std::fmt;
use std::sync::Arc;

/// Errors raised while building a [`Sample`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("invalid loop region {start}..{end} for a sample of length {length}")]
    InvalidLoop {
        start: usize,
        end: usize,
        length: usize,
    },
}

/// ADSR coefficients, applied once per envelope update.
///
/// `attack` is the gain increment relative to the voice volume, `decay` and
/// `release` are multiplicative factors, and `sustain` is the held level
/// relative to the voice volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

/// An immutable PCM waveform plus its playback metadata.
#[derive(Clone)]
pub struct Sample {
    /// Mono 16-bit waveform, shared between every voice that plays it.
    data: Arc<[i16]>,
    /// The note at which the waveform plays back unshifted.
    root: u8,
    /// Loop region as `start..end`, if any.
    loop_region: Option<(usize, usize)>,
    /// Envelope coefficients. `None` plays the sample at constant gain.
    envelope: Option<Envelope>,
}

impl Sample {
    /// Creates a one-shot sample without envelope or loop.
    pub fn new(data: impl Into<Arc<[i16]>>, root: u8) -> Sample {
        Sample {
            data: data.into(),
            root,
            loop_region: None,
            envelope: None,
        }
    }

    /// Sets the loop region. The region must satisfy `start < end <= len`.
    pub fn with_loop(mut self, start: usize, end: usize) -> Result<Sample, SampleError> {
        if start >= end || end > self.data.len() {
            return Err(SampleError::InvalidLoop {
                start,
                end,
                length: self.data.len(),
            });
        }
        self.loop_region = Some((start, end));
        Ok(self)
    }

    /// Enables the envelope with the given coefficients.
    pub fn with_envelope(mut self, envelope: Envelope) -> Sample {
        self.envelope = Some(envelope);
        self
    }

    pub fn data(&self) -> &[i16] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn loop_region(&self) -> Option<(usize, usize)> {
        self.loop_region
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    pub fn adsr_enabled(&self) -> bool {
        self.envelope.is_some()
    }

    /// Returns the memory size of the waveform in bytes.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("len", &self.data.len())
            .field("root", &self.root)
            .field("loop_region", &self.loop_region)
            .field("envelope", &self.envelope)
            .finish()
    }
}
