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

//! Sample assets.
//!
//! This module provides:
//! - WAV loading and caching (in-memory, resident before playback)
//! - Conversion to mono 16-bit PCM at the output sample rate
//! - Timbre construction from configuration
//! - Sampler construction with channel timbre assignments

mod loader;

pub use loader::{load_sampler, LoadError, SampleLoader};
