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
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::channel::Channel;
use super::event::{Event, EventQueue};
use super::sync::Semaphore;
use super::tables::VelocityTable;
use super::timbre::Timbre;
use super::voice::VoicePool;
use super::{ADSR_UPDATE_SAMPLE_COUNT, CH_COUNT, SAMPLE_BUFFER_SIZE};
use crate::audio::reverb::{Bypass, Reverb};
use crate::audio::simd;

/// Master volume of a freshly created sampler.
pub const DEFAULT_MASTER_VOLUME: f32 = 1.0;

/// Pre-scale applied to the mix so the conversion stage can take the top 16
/// bits of a 32-bit integer.
const OUTPUT_SCALE: f32 = 65536.0;

/// The sampler engine.
///
/// Events may be submitted from any thread. A single audio context calls
/// [`Sampler::process`] once per block; it drains the pending events, mixes
/// every active voice and writes one block of 16-bit output.
pub struct Sampler {
    messages: EventQueue,
    channels: Semaphore<[Channel; CH_COUNT]>,
    players: Arc<Semaphore<VoicePool>>,
    /// f32 bits.
    master_volume: AtomicU32,
    reverb: Semaphore<Box<dyn Reverb>>,
    velocity_table: VelocityTable,
}

impl Sampler {
    /// Creates a sampler with no timbres assigned.
    pub fn new(reverb: Box<dyn Reverb>, velocity_table: VelocityTable) -> Sampler {
        let players = Arc::new(Semaphore::new(VoicePool::new()));
        let channels = std::array::from_fn(|index| {
            Channel::new(index as u8, Arc::downgrade(&players))
        });

        debug!(
            channels = CH_COUNT,
            voices = super::MAX_SOUND,
            block = SAMPLE_BUFFER_SIZE,
            "Sampler initialized"
        );

        Sampler {
            messages: EventQueue::new(),
            channels: Semaphore::new(channels),
            players,
            master_volume: AtomicU32::new(DEFAULT_MASTER_VOLUME.to_bits()),
            reverb: Semaphore::new(reverb),
            velocity_table,
        }
    }

    /// Queues a Note On.
    pub fn note_on(&self, note: u8, velocity: u8, channel: u8) {
        self.messages.push(Event::note_on(note, velocity, channel));
    }

    /// Queues a Note Off.
    pub fn note_off(&self, note: u8, velocity: u8, channel: u8) {
        self.messages.push(Event::note_off(note, velocity, channel));
    }

    /// Queues a pitch bend. Bends for channels that don't exist are dropped.
    pub fn pitch_bend(&self, value: i16, channel: u8) {
        if let Some(event) = Event::pitch_bend(value, channel) {
            self.messages.push(event);
        }
    }

    /// Queues an already built event.
    pub fn send(&self, event: Event) {
        match event {
            Event::NoteOn {
                channel,
                note,
                velocity,
            } => self.note_on(note, velocity, channel),
            Event::NoteOff {
                channel,
                note,
                velocity,
            } => self.note_off(note, velocity, channel),
            Event::PitchBend { channel, value } => self.pitch_bend(value, channel),
        }
    }

    /// Assigns the timbre used by subsequent notes on the channel.
    pub fn set_timbre(&self, channel: u8, timbre: Option<Arc<Timbre>>) {
        let mut channels = self.channels.lock();
        match channels.get_mut(channel as usize) {
            Some(target) => target.set_timbre(timbre),
            None => warn!(channel, "Ignoring timbre for unknown channel"),
        }
    }

    /// Sets the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&self, volume: f32) {
        if volume.is_nan() {
            warn!("Ignoring NaN master volume");
            return;
        }
        self.master_volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    /// Replaces the reverb stage.
    pub fn set_reverb(&self, reverb: Box<dyn Reverb>) {
        *self.reverb.lock() = reverb;
    }

    /// Number of voices currently playing.
    pub fn active_voices(&self) -> usize {
        self.players.lock().active_count()
    }

    /// Number of events waiting for the next block.
    pub fn pending_events(&self) -> usize {
        self.messages.len()
    }

    /// Renders one block.
    pub fn process(&self, output: &mut [i16; SAMPLE_BUFFER_SIZE]) {
        self.dispatch_messages();

        let mut data = [0f32; SAMPLE_BUFFER_SIZE];
        let master_gain = self.master_volume() * OUTPUT_SCALE;
        {
            let mut pool = self.players.lock();
            for player in pool
                .players_mut()
                .iter_mut()
                .filter(|player| player.is_playing())
            {
                for chunk in data.chunks_exact_mut(ADSR_UPDATE_SAMPLE_COUNT) {
                    if !player.render(chunk, master_gain) {
                        break;
                    }
                }
            }
        }

        self.reverb.lock().process(&mut data);
        simd::convert_block(&data, output);
    }

    /// Applies every queued event in arrival order. The queue lock is only
    /// held while popping, so producers are never blocked by dispatch.
    fn dispatch_messages(&self) {
        let mut channels = self.channels.lock();
        while let Some(event) = self.messages.pop() {
            let Some(channel) = channels.get_mut(event.channel() as usize) else {
                continue;
            };
            match event {
                Event::NoteOn { note, velocity, .. } => {
                    channel.note_on(note, velocity, &self.velocity_table)
                }
                Event::NoteOff { note, .. } => channel.note_off(note),
                Event::PitchBend { value, .. } => channel.pitch_bend(value),
            }
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Box::new(Bypass), VelocityTable::default())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::audio::reverb::FeedbackReverb;
    use crate::sampler::{Envelope, Sample, SampleMapping, MAX_SOUND};

    fn constant_timbre(value: i16, len: usize, envelope: Option<Envelope>) -> Arc<Timbre> {
        let mut sample = Sample::new(vec![value; len], 60);
        if let Some(envelope) = envelope {
            sample = sample.with_envelope(envelope);
        }
        Arc::new(Timbre::new(vec![SampleMapping::new(
            0..=127,
            0..=127,
            Arc::new(sample),
        )]))
    }

    fn block(sampler: &Sampler) -> [i16; SAMPLE_BUFFER_SIZE] {
        let mut output = [0i16; SAMPLE_BUFFER_SIZE];
        sampler.process(&mut output);
        output
    }

    fn peak(output: &[i16]) -> i32 {
        output.iter().map(|x| (*x as i32).abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_silence_without_events() {
        let sampler = Sampler::default();
        assert!(block(&sampler).iter().all(|x| *x == 0));
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn test_constant_output() {
        let sampler = Sampler::default();
        sampler.set_timbre(0, Some(constant_timbre(16384, 1024, None)));
        sampler.note_on(60, 127, 0);
        assert!(block(&sampler).iter().all(|x| *x == 16384));

        sampler.set_master_volume(0.5);
        assert!(block(&sampler).iter().all(|x| *x == 8192));
    }

    #[test]
    fn test_master_volume_clamped() {
        let sampler = Sampler::default();
        assert_eq!(sampler.master_volume(), DEFAULT_MASTER_VOLUME);
        sampler.set_master_volume(2.0);
        assert_eq!(sampler.master_volume(), 1.0);
        sampler.set_master_volume(-1.0);
        assert_eq!(sampler.master_volume(), 0.0);
        sampler.set_master_volume(f32::NAN);
        assert_eq!(sampler.master_volume(), 0.0);
    }

    #[test]
    fn test_voice_exhaustion_steals_oldest() {
        let sampler = Sampler::default();
        for i in 0..(MAX_SOUND + 3) {
            sampler.note_on(40 + i as u8, 100, (i % CH_COUNT) as u8);
        }
        sampler.dispatch_messages();

        assert_eq!(sampler.active_voices(), MAX_SOUND);
        let pool = sampler.players.lock();
        let mut notes: Vec<u8> = pool.players().iter().map(|p| p.note()).collect();
        notes.sort_unstable();
        let expected: Vec<u8> = (43..43 + MAX_SOUND as u8).collect();
        assert_eq!(notes, expected);
    }

    #[test]
    fn test_note_off_is_idempotent() {
        let sampler = Sampler::default();
        sampler.note_on(60, 100, 2);
        sampler.note_off(60, 0, 2);
        sampler.note_off(60, 0, 2);
        sampler.note_off(61, 0, 2);
        sampler.dispatch_messages();

        let pool = sampler.players.lock();
        assert!(pool.get(0).unwrap().is_released());
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_pitch_bend_only_retargets_bent_channel() {
        let sampler = Sampler::default();
        let timbre = constant_timbre(1000, 48000, None);
        sampler.set_timbre(0, Some(timbre.clone()));
        sampler.set_timbre(1, Some(timbre));
        sampler.note_on(60, 100, 0);
        sampler.note_on(60, 100, 1);
        block(&sampler);

        let before: Vec<_> = sampler
            .players
            .lock()
            .players()
            .iter()
            .map(|p| p.position())
            .collect();

        sampler.pitch_bend(4096, 0);
        sampler.dispatch_messages();

        let pool = sampler.players.lock();
        let bent = pool.get(0).unwrap();
        let other = pool.get(1).unwrap();
        assert!((bent.pitch() - 2f32.powf(0.5)).abs() < 1e-6);
        assert_eq!(bent.pitch_bend(), 6.0);
        assert_eq!(other.pitch(), 1.0);
        assert_eq!(other.pitch_bend(), 0.0);

        let after: Vec<_> = pool.players().iter().map(|p| p.position()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_pitch_bend_applies_to_new_notes() {
        let sampler = Sampler::default();
        sampler.set_timbre(5, Some(constant_timbre(1000, 1024, None)));
        sampler.pitch_bend(-8192, 5);
        sampler.note_on(60, 100, 5);
        sampler.dispatch_messages();
        assert!((sampler.players.lock().get(0).unwrap().pitch() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_note_on_off_decays_then_frees() {
        let sampler = Sampler::default();
        let envelope = Envelope {
            attack: 0.5,
            decay: 0.9,
            sustain: 0.8,
            release: 0.5,
        };
        sampler.set_timbre(0, Some(constant_timbre(16384, 48000, Some(envelope))));
        sampler.note_on(60, 127, 0);
        assert!(peak(&block(&sampler)) > 0);

        sampler.note_off(60, 0, 0);
        let mut peaks = Vec::new();
        for _ in 0..10 {
            peaks.push(peak(&block(&sampler)));
        }

        assert!(peaks[0] > 0);
        assert!(peaks[1] > 0);
        assert!(peaks.windows(2).all(|pair| pair[1] <= pair[0]));
        assert_eq!(*peaks.last().unwrap(), 0);
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn test_note_on_off_in_same_block_is_silent() {
        let sampler = Sampler::default();
        let envelope = Envelope {
            attack: 0.5,
            decay: 0.9,
            sustain: 0.8,
            release: 0.5,
        };
        sampler.set_timbre(0, Some(constant_timbre(16384, 4096, Some(envelope))));
        sampler.note_on(60, 127, 0);
        sampler.note_off(60, 0, 0);
        assert!(block(&sampler).iter().all(|x| *x == 0));
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn test_missing_timbre_is_silent() {
        let sampler = Sampler::default();
        sampler.note_on(60, 100, 7);
        assert!(block(&sampler).iter().all(|x| *x == 0));
        assert_eq!(sampler.active_voices(), 1);

        sampler.note_off(60, 0, 7);
        block(&sampler);
        assert_eq!(sampler.active_voices(), 0);
    }

    #[test]
    fn test_set_timbre_only_affects_new_voices() {
        let sampler = Sampler::default();
        let first = constant_timbre(1000, 4096, None);
        let second = constant_timbre(2000, 4096, None);

        sampler.set_timbre(0, Some(first.clone()));
        sampler.note_on(60, 100, 0);
        block(&sampler);
        sampler.set_timbre(0, Some(second.clone()));
        sampler.note_on(62, 100, 0);
        sampler.set_timbre(CH_COUNT as u8, None);
        block(&sampler);

        let pool = sampler.players.lock();
        let first_sample = first.get_appropriate_sample(60, 100).unwrap();
        let second_sample = second.get_appropriate_sample(62, 100).unwrap();
        assert!(Arc::ptr_eq(pool.get(0).unwrap().sample().unwrap(), first_sample));
        assert!(Arc::ptr_eq(pool.get(1).unwrap().sample().unwrap(), second_sample));
    }

    #[test]
    fn test_send_sanitizes_like_direct_calls() {
        let sampler = Sampler::default();
        sampler.send(Event::NoteOn {
            channel: 200,
            note: 60,
            velocity: 0xff,
        });
        sampler.send(Event::PitchBend {
            channel: 200,
            value: 0,
        });
        assert_eq!(sampler.pending_events(), 1);
        sampler.dispatch_messages();

        let pool = sampler.players.lock();
        assert_eq!(pool.get(0).unwrap().channel(), 0);
        assert_eq!(pool.active_count(), 1);
    }

    struct RecordingReverb {
        blocks: Arc<parking_lot::Mutex<Vec<Vec<f32>>>>,
    }

    impl Reverb for RecordingReverb {
        fn process(&mut self, block: &mut [f32]) {
            self.blocks.lock().push(block.to_vec());
            for sample in block.iter_mut() {
                *sample *= 0.25;
            }
        }
    }

    #[test]
    fn test_reverb_runs_once_per_block_on_the_mix() {
        let blocks = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sampler = Sampler::default();
        sampler.set_reverb(Box::new(RecordingReverb {
            blocks: blocks.clone(),
        }));
        sampler.set_timbre(0, Some(constant_timbre(16384, 4096, None)));

        assert!(block(&sampler).iter().all(|x| *x == 0));
        assert_eq!(blocks.lock().len(), 1);

        sampler.note_on(60, 127, 0);
        let output = block(&sampler);

        let blocks = blocks.lock();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], vec![0.0; SAMPLE_BUFFER_SIZE]);
        assert_eq!(blocks[1].len(), SAMPLE_BUFFER_SIZE);
        assert!(blocks[1].iter().all(|x| *x == 16384.0 * OUTPUT_SCALE));
        // The in-place result is what gets converted.
        assert!(output.iter().all(|x| *x == 4096));
    }

    #[test]
    fn test_feedback_reverb_blends_dry_signal() {
        let sampler = Sampler::default();
        sampler.set_reverb(Box::new(FeedbackReverb::new(0.5, 0.6)));
        sampler.set_timbre(0, Some(constant_timbre(16384, 4096, None)));
        sampler.note_on(60, 127, 0);

        // The shortest delay line is longer than one block, so only the dry
        // half is heard at first.
        assert!(block(&sampler).iter().all(|x| *x == 8192));
    }

    #[test]
    fn test_concurrent_producers() {
        let sampler = Arc::new(Sampler::default());
        sampler.set_timbre(0, Some(constant_timbre(100, 48000, None)));

        let producers: Vec<_> = (0..4u8)
            .map(|channel| {
                let sampler = sampler.clone();
                thread::spawn(move || {
                    for note in 0..100u8 {
                        sampler.note_on(note, 100, channel);
                        sampler.note_off(note, 0, channel);
                    }
                })
            })
            .collect();

        let mut output = [0i16; SAMPLE_BUFFER_SIZE];
        for _ in 0..50 {
            sampler.process(&mut output);
        }
        for producer in producers {
            producer.join().unwrap();
        }
        sampler.process(&mut output);

        assert_eq!(sampler.pending_events(), 0);
        assert!(sampler.active_voices() <= MAX_SOUND);
    }
}
