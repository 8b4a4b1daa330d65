// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 pica-core contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reduced-exponent float formats
//!
//! The GPU stores most of its real-valued configuration (viewport scale,
//! depth range, shader float uniforms, fixed vertex attributes) as 24-bit
//! floats: a 1.7.16 sign/exponent/mantissa split with an exponent bias of
//! 63. Values are widened to `f32` on decode and all arithmetic inside the
//! core happens in `f32`. The layout is IEEE-like (implicit leading one,
//! all-ones exponent for inf/NaN), so conversion is a matter of re-biasing
//! the exponent and shifting the mantissa; the helpers take the mantissa
//! and exponent widths as parameters.

/// Decode a reduced float with the given mantissa/exponent widths to `f32`
///
/// `raw` holds the value right-aligned: sign bit at `mant_bits + exp_bits`,
/// then exponent, then mantissa in the low bits.
pub fn decode_float(raw: u32, mant_bits: u32, exp_bits: u32) -> f32 {
    let mant_mask = (1u32 << mant_bits) - 1;
    let exp_mask = (1u32 << exp_bits) - 1;
    let bias = (1u32 << (exp_bits - 1)) - 1;

    let sign = (raw >> (mant_bits + exp_bits)) & 1;
    let exp = (raw >> mant_bits) & exp_mask;
    let mant = raw & mant_mask;

    let f32_bits = if exp == 0 && mant == 0 {
        // Signed zero. Denormals are below the f32 denormal range once
        // re-biased and the hardware flushes them; treat them as zero too.
        sign << 31
    } else if exp == 0 {
        sign << 31
    } else if exp == exp_mask {
        // Inf / NaN
        (sign << 31) | (0xFF << 23) | (mant << (23 - mant_bits))
    } else {
        let exp32 = exp + 127 - bias;
        (sign << 31) | (exp32 << 23) | (mant << (23 - mant_bits))
    };
    f32::from_bits(f32_bits)
}

/// Encode an `f32` into a reduced float with the given widths
///
/// Out-of-range magnitudes saturate to infinity, sub-range magnitudes flush
/// to zero. Used by tests and by emulator frontends that build register
/// values; the core itself only decodes.
pub fn encode_float(value: f32, mant_bits: u32, exp_bits: u32) -> u32 {
    let exp_mask = (1u32 << exp_bits) - 1;
    let bias = (1u32 << (exp_bits - 1)) - 1;

    let bits = value.to_bits();
    let sign = bits >> 31;
    let exp32 = (bits >> 23) & 0xFF;
    let mant32 = bits & 0x7F_FFFF;

    if exp32 == 0xFF {
        // Inf / NaN
        let mant = mant32 >> (23 - mant_bits);
        let mant = if mant32 != 0 && mant == 0 { 1 } else { mant };
        return (sign << (mant_bits + exp_bits)) | (exp_mask << mant_bits) | mant;
    }
    if exp32 == 0 {
        return sign << (mant_bits + exp_bits);
    }

    let unbiased = exp32 as i32 - 127;
    let exp = unbiased + bias as i32;
    if exp >= exp_mask as i32 {
        // Overflow: saturate to infinity
        return (sign << (mant_bits + exp_bits)) | (exp_mask << mant_bits);
    }
    if exp <= 0 {
        // Underflow: flush to zero
        return sign << (mant_bits + exp_bits);
    }
    (sign << (mant_bits + exp_bits)) | ((exp as u32) << mant_bits) | (mant32 >> (23 - mant_bits))
}

/// Decode a 24-bit float (1.7.16)
#[inline]
pub fn float24_to_f32(raw: u32) -> f32 {
    decode_float(raw & 0xFF_FFFF, 16, 7)
}

/// Encode an `f32` as a 24-bit float (1.7.16)
#[inline]
pub fn f32_to_float24(value: f32) -> u32 {
    encode_float(value, 16, 7)
}
