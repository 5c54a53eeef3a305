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

/// A per-block transform applied to the mix before conversion.
pub trait Reverb: Send {
    /// Processes one block in place.
    fn process(&mut self, block: &mut [f32]);
}

/// Leaves the block untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bypass;

impl Reverb for Bypass {
    fn process(&mut self, _block: &mut [f32]) {}
}

pub const DEFAULT_MIX: f32 = 0.3;
pub const DEFAULT_DECAY: f32 = 0.6;

/// Prime-length delay lines, in samples.
const DELAY_LENGTHS: [usize; 4] = [1557, 1617, 1491, 1422];

/// Four parallel feedback delay lines blended with the dry signal.
#[derive(Debug, Clone)]
pub struct FeedbackReverb {
    delay_lines: [Vec<f32>; 4],
    write_positions: [usize; 4],
    mix: f32,
    decay: f32,
}

impl FeedbackReverb {
    /// Creates the reverb. `mix` is clamped to `[0, 1]` and `decay` to
    /// `[0.1, 0.95]`.
    pub fn new(mix: f32, decay: f32) -> Self {
        let mut reverb = Self {
            delay_lines: DELAY_LENGTHS.map(|len| vec![0.0; len]),
            write_positions: [0; 4],
            mix: DEFAULT_MIX,
            decay: DEFAULT_DECAY,
        };
        reverb.set_mix(mix);
        reverb.set_decay(decay);
        reverb
    }

    pub fn set_mix(&mut self, mix: f32) {
        if !mix.is_nan() {
            self.mix = mix.clamp(0.0, 1.0);
        }
    }

    pub fn set_decay(&mut self, decay: f32) {
        if !decay.is_nan() {
            self.decay = decay.clamp(0.1, 0.95);
        }
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }
}

impl Default for FeedbackReverb {
    fn default() -> Self {
        Self::new(DEFAULT_MIX, DEFAULT_DECAY)
    }
}

impl Reverb for FeedbackReverb {
    fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            let dry = *sample;
            let mut wet = 0.0f32;

            for (line, write) in self.delay_lines.iter_mut().zip(self.write_positions.iter_mut()) {
                let len = line.len();
                let delayed = line[(*write + 1) % len];
                wet += delayed * 0.25;

                line[*write] = dry + delayed * self.decay;
                *write = (*write + 1) % len;
            }

            *sample = dry * (1.0 - self.mix) + wet * self.mix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_is_identity() {
        let mut block = [1.0f32, -2.0, 3.5];
        Bypass.process(&mut block);
        assert_eq!(block, [1.0, -2.0, 3.5]);
    }

    #[test]
    fn test_parameters_clamped() {
        let reverb = FeedbackReverb::new(4.0, 0.0);
        assert_eq!(reverb.mix(), 1.0);
        assert_eq!(reverb.decay(), 0.1);

        let reverb = FeedbackReverb::new(f32::NAN, f32::NAN);
        assert_eq!(reverb.mix(), DEFAULT_MIX);
        assert_eq!(reverb.decay(), DEFAULT_DECAY);
    }

    #[test]
    fn test_dry_only_when_mix_is_zero() {
        let mut reverb = FeedbackReverb::new(0.0, 0.9);
        let mut block = [0.25f32; 64];
        reverb.process(&mut block);
        assert!(block.iter().all(|x| *x == 0.25));
    }

    #[test]
    fn test_impulse_produces_tail() {
        let mut reverb = FeedbackReverb::new(0.5, 0.6);
        let mut block = vec![0.0f32; 4096];
        block[0] = 1.0;
        reverb.process(&mut block);

        assert_eq!(block[0], 0.5);
        assert!(block[1..1400].iter().all(|x| *x == 0.0));
        // The shortest line echoes back once it wraps around.
        assert_eq!(block[DELAY_LENGTHS[3] - 1], 0.125);
    }
}
