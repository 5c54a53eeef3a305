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

//! Offline rendering of scheduled events.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::midi::smf::ScheduledEvent;
use crate::sampler::{Sampler, SAMPLE_BUFFER_SIZE};

/// Runs the sampler over the scheduled events and returns the mono output.
///
/// Events are applied at the start of the block they fall in. After the last
/// event, rendering continues until every voice is free or `tail_frames`
/// have elapsed.
pub fn render(sampler: &Sampler, events: &[ScheduledEvent], tail_frames: u64) -> Vec<i16> {
    let last_event = events.iter().map(|event| event.frame).max().unwrap_or(0);
    let block_frames = SAMPLE_BUFFER_SIZE as u64;

    let mut output = Vec::new();
    let mut block = [0i16; SAMPLE_BUFFER_SIZE];
    let mut pending = events.iter().peekable();
    let mut frame = 0u64;

    loop {
        let block_end = frame + block_frames;
        while let Some(scheduled) = pending.next_if(|scheduled| scheduled.frame < block_end) {
            sampler.send(scheduled.event);
        }

        sampler.process(&mut block);
        output.extend_from_slice(&block);
        frame = block_end;

        let tail_elapsed = frame >= last_event.saturating_add(tail_frames);
        if pending.peek().is_none() && (sampler.active_voices() == 0 || tail_elapsed) {
            break;
        }
    }

    info!(
        events = events.len(),
        frames = output.len(),
        "Render complete"
    );
    output
}

/// Writes mono 16-bit samples to a WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()
}
