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

//! Real-time polyphonic sample playback.
//!
//! This module provides:
//! - Event ingestion from any thread through a short-hold queue
//! - A fixed pool of sample players shared by all channels
//! - Voice allocation with global oldest-voice stealing
//! - Per-voice ADSR envelope and pitch computation
//! - Block processing into 16-bit output

mod channel;
mod engine;
mod event;
mod sample;
mod sync;
mod tables;
mod timbre;
mod voice;

pub use channel::Channel;
pub use engine::{Sampler, DEFAULT_MASTER_VOLUME};
pub use event::Event;
pub use sample::{Envelope, Sample, SampleError};
pub use sync::{RawSpinlock, Semaphore, SpinLock};
pub use tables::{VelocityTable, DEFAULT_VELOCITY_CURVE};
pub use timbre::{SampleMapping, Timbre};
pub use voice::{EnvelopeState, SamplePlayer, VoicePool};

/// Number of musical channels.
pub const CH_COUNT: usize = 16;

/// Number of sample players in the voice pool.
pub const MAX_SOUND: usize = 16;

/// Samples produced by one call to [`Sampler::process`].
pub const SAMPLE_BUFFER_SIZE: usize = 128;

/// Samples rendered between two envelope updates.
pub const ADSR_UPDATE_SAMPLE_COUNT: usize = 32;

const _: () = assert!(SAMPLE_BUFFER_SIZE % ADSR_UPDATE_SAMPLE_COUNT == 0);
const _: () = assert!(SAMPLE_BUFFER_SIZE % 8 == 0);
