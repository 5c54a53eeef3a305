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

//! Standard MIDI File scheduling.

use std::path::Path;

use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::sampler::Event;

/// Tempo in microseconds per beat when the file doesn't set one.
const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, thiserror::Error)]
pub enum SmfError {
    #[error("Unable to read MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to parse MIDI file: {0}")]
    Parse(#[from] midly::Error),
}

/// A sampler event with its offset from the start of playback, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub frame: u64,
    pub event: Event,
}

/// Reads a MIDI file and schedules its events at the given sample rate.
pub fn load(path: &Path, sample_rate: u32) -> Result<Vec<ScheduledEvent>, SmfError> {
    let data = std::fs::read(path)?;
    let smf = Smf::parse(&data)?;
    let events = schedule(&smf, sample_rate);
    debug!(
        path = ?path,
        tracks = smf.tracks.len(),
        events = events.len(),
        "MIDI file scheduled"
    );
    Ok(events)
}

/// Merges every track of the file into one list of events ordered by time.
/// Events on the same tick keep their track order.
pub fn schedule(smf: &Smf, sample_rate: u32) -> Vec<ScheduledEvent> {
    let mut merged: Vec<(u64, &TrackEventKind)> = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            merged.push((tick, &event.kind));
        }
    }
    merged.sort_by_key(|(tick, _)| *tick);

    let mut clock = Clock::new(smf.header.timing);
    let mut events = Vec::new();
    for (tick, kind) in merged {
        let micros = clock.advance(tick);
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => clock.set_tempo(tempo.as_int()),
            TrackEventKind::Midi { channel, message } => {
                if let Some(event) = super::to_event(*channel, message) {
                    events.push(ScheduledEvent {
                        frame: (micros * sample_rate as f64 / 1_000_000.0).round() as u64,
                        event,
                    });
                }
            }
            _ => {}
        }
    }
    events
}

/// Converts ticks to microseconds, following tempo changes.
struct Clock {
    timing: Timing,
    tempo: u32,
    last_tick: u64,
    micros: f64,
}

impl Clock {
    fn new(timing: Timing) -> Clock {
        Clock {
            timing,
            tempo: DEFAULT_TEMPO,
            last_tick: 0,
            micros: 0.0,
        }
    }

    fn advance(&mut self, tick: u64) -> f64 {
        let delta = tick.saturating_sub(self.last_tick) as f64;
        self.micros += match self.timing {
            Timing::Metrical(ticks_per_beat) => {
                delta * self.tempo as f64 / ticks_per_beat.as_int().max(1) as f64
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = (fps.as_f32() * subframes as f32).max(1.0) as f64;
                delta * 1_000_000.0 / ticks_per_second
            }
        };
        self.last_tick = tick;
        self.micros
    }

    fn set_tempo(&mut self, tempo: u32) {
        self.tempo = tempo;
    }
}
