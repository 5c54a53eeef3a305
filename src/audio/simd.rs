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
// Float to 16-bit output conversion.
// The vector paths are selected at runtime and must match the scalar path exactly.

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
use std::arch::x86_64::*;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
use std::arch::aarch64::*;

/// Converts a pre-scaled mix to 16-bit samples: `((x as i32) >> 16) as i16`.
///
/// The float to integer conversion truncates toward zero and saturates, NaN
/// converts to 0. Converts `min(src.len(), dst.len())` samples.
pub fn convert_block(src: &[f32], dst: &mut [i16]) {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("sse2") {
            unsafe {
                convert_block_sse2(src, dst);
            }
            return;
        }
    }

    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            unsafe {
                convert_block_neon(src, dst);
            }
            return;
        }
    }

    convert_block_scalar(src, dst);
}

/// Scalar reference conversion.
pub fn convert_block_scalar(src: &[f32], dst: &mut [i16]) {
    for (out, sample) in dst.iter_mut().zip(src) {
        *out = ((*sample as i32) >> 16) as i16;
    }
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
#[target_feature(enable = "sse2")]
unsafe fn convert_block_sse2(src: &[f32], dst: &mut [i16]) {
    const SIMD_WIDTH: usize = 8;
    // Largest f32 below 2^31.
    const I32_MAX_F32: f32 = 2147483520.0;
    const I32_MIN_F32: f32 = -2147483648.0;

    let len = std::cmp::min(dst.len(), src.len());
    let max_vec = _mm_set1_ps(I32_MAX_F32);
    let min_vec = _mm_set1_ps(I32_MIN_F32);
    let mut idx = 0;

    while idx + SIMD_WIDTH <= len {
        let lo = _mm_loadu_ps(src.as_ptr().add(idx));
        let hi = _mm_loadu_ps(src.as_ptr().add(idx + 4));

        // NaN lanes become 0, then saturate like `as i32`.
        let lo = _mm_and_ps(lo, _mm_cmpord_ps(lo, lo));
        let hi = _mm_and_ps(hi, _mm_cmpord_ps(hi, hi));
        let lo = _mm_min_ps(_mm_max_ps(lo, min_vec), max_vec);
        let hi = _mm_min_ps(_mm_max_ps(hi, min_vec), max_vec);

        let lo = _mm_srai_epi32(_mm_cvttps_epi32(lo), 16);
        let hi = _mm_srai_epi32(_mm_cvttps_epi32(hi), 16);
        let packed = _mm_packs_epi32(lo, hi);

        _mm_storeu_si128(dst.as_mut_ptr().add(idx) as *mut __m128i, packed);
        idx += SIMD_WIDTH;
    }

    convert_block_scalar(&src[idx..len], &mut dst[idx..len]);
}

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
#[target_feature(enable = "neon")]
unsafe fn convert_block_neon(src: &[f32], dst: &mut [i16]) {
    const SIMD_WIDTH: usize = 8;
    let len = std::cmp::min(dst.len(), src.len());
    let mut idx = 0;

    while idx + SIMD_WIDTH <= len {
        // vcvtq truncates, saturates and maps NaN to 0.
        let lo = vcvtq_s32_f32(vld1q_f32(src.as_ptr().add(idx)));
        let hi = vcvtq_s32_f32(vld1q_f32(src.as_ptr().add(idx + 4)));

        let lo = vmovn_s32(vshrq_n_s32::<16>(lo));
        let hi = vmovn_s32(vshrq_n_s32::<16>(hi));

        vst1q_s16(dst.as_mut_ptr().add(idx), vcombine_s16(lo, hi));
        idx += SIMD_WIDTH;
    }

    convert_block_scalar(&src[idx..len], &mut dst[idx..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_cases() -> Vec<f32> {
        vec![
            0.0,
            -0.0,
            1.0,
            -1.0,
            65535.9,
            65536.0,
            -65535.9,
            -65536.0,
            -65537.0,
            1073741824.0,
            -1073741824.0,
            2147483520.0,
            2147483648.0,
            -2147483648.0,
            -2147483904.0,
            1e12,
            -1e12,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
            f32::MAX,
            f32::MIN,
            123456.7,
        ]
    }

    #[test]
    fn test_scalar_formula() {
        let src = [65536.0, -65535.9, -65536.0, -65537.0, 1073741824.0, 1e12, -1e12, f32::NAN];
        let mut dst = [0i16; 8];
        convert_block_scalar(&src, &mut dst);
        // The shift floors, so small negative values land on -1.
        assert_eq!(dst, [1, -1, -1, -2, 16384, 32767, -32768, 0]);
    }

    #[test]
    fn test_convert_equivalence() {
        let mut src = edge_cases();
        // Odd length so the tail path runs too.
        src.extend((0..1000).map(|i| (i as f32 - 500.0) * 4_321_987.5));
        src.push(7.0);

        let mut vector = vec![0i16; src.len()];
        let mut scalar = vec![0i16; src.len()];
        convert_block(&src, &mut vector);
        convert_block_scalar(&src, &mut scalar);
        assert_eq!(vector, scalar);
    }

    #[test]
    fn test_convert_length_is_minimum() {
        let src = [65536.0f32; 16];
        let mut dst = [9i16; 10];
        convert_block(&src[..4], &mut dst);
        assert_eq!(&dst[..4], &[1, 1, 1, 1]);
        assert_eq!(&dst[4..], &[9; 6]);
    }
}
