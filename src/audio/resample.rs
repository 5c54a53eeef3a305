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

//! The inner resampling routine that mixes one voice into a sub-block.

/// State handed to the inner routine for one sub-block. The positions are
/// advanced in place.
#[derive(Debug, Clone, Copy)]
pub struct ResampleWork<'a> {
    /// The waveform. Reads past its end are silent.
    pub src: &'a [i16],
    /// Integer read position.
    pub pos: usize,
    /// Fractional read position in `[0, 1)`.
    pub pos_f: f32,
    /// Gain applied to every interpolated sample.
    pub gain: f32,
    /// Source samples consumed per output sample.
    pub pitch: f32,
}

/// Linearly interpolates `work.src` at `work.pitch` and adds the result,
/// scaled by `work.gain`, to every sample of `dst`.
#[inline]
pub fn process_inner(work: &mut ResampleWork<'_>, dst: &mut [f32]) {
    #[cfg(feature = "simd")]
    process_inner_accelerated(work, dst);

    #[cfg(not(feature = "simd"))]
    process_inner_portable(work, dst);
}

/// Reference implementation.
pub fn process_inner_portable(work: &mut ResampleWork<'_>, dst: &mut [f32]) {
    let src = work.src;
    let read = |index: usize| src.get(index).copied().unwrap_or(0);

    for out in dst.iter_mut() {
        let s0 = read(work.pos);
        let s1 = read(work.pos.wrapping_add(1));
        *out += interpolate(s0, s1, work.pos_f) * work.gain;
        advance(work);
    }
}

/// Same arithmetic as [`process_inner_portable`] without per-sample bounds
/// checks. Falls back to the portable routine when the sub-block could read
/// past the waveform.
pub fn process_inner_accelerated(work: &mut ResampleWork<'_>, dst: &mut [f32]) {
    if !fits_in_source(work, dst.len()) {
        process_inner_portable(work, dst);
        return;
    }

    let src = work.src;
    for out in dst.iter_mut() {
        // SAFETY: `fits_in_source` bounds every position reached in this
        // sub-block, plus one for the interpolation partner.
        let (s0, s1) = unsafe {
            (
                *src.get_unchecked(work.pos),
                *src.get_unchecked(work.pos + 1),
            )
        };
        *out += interpolate(s0, s1, work.pos_f) * work.gain;
        advance(work);
    }
}

#[inline(always)]
fn interpolate(s0: i16, s1: i16, frac: f32) -> f32 {
    s0 as f32 + (s1 as i32 - s0 as i32) as f32 * frac
}

#[inline(always)]
fn advance(work: &mut ResampleWork<'_>) {
    work.pos_f += work.pitch;
    let whole = work.pos_f as u32;
    work.pos_f -= whole as f32;
    work.pos += whole as usize;
}

/// Checks that `count` steps from the current position never read past the
/// waveform. Each step moves at most `pitch + 1` samples, with one sample of
/// slack for rounding.
fn fits_in_source(work: &ResampleWork<'_>, count: usize) -> bool {
    if count == 0 {
        return true;
    }
    if !work.pitch.is_finite() || work.pitch < 0.0 || !(0.0..1.0).contains(&work.pos_f) {
        return false;
    }
    let step = (work.pitch as usize).saturating_add(2);
    step.checked_mul(count - 1)
        .and_then(|span| span.checked_add(work.pos))
        .and_then(|last| last.checked_add(1))
        .is_some_and(|last| last < work.src.len())
}
