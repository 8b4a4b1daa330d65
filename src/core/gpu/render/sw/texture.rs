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

//! Texture sampling
//!
//! Textures are stored swizzled in 8x8 tiles: tiles are laid out row-major
//! across the surface, and texels within a tile follow a Morton (Z-order)
//! curve. Compressed formats (ETC1/ETC1A4) instead store four 4x4 blocks per
//! tile in column-major block order.
//!
//! All decoders return RGBA with missing channels filled in (1.0 alpha for
//! opaque formats, luminance broadcast to RGB).

use crate::core::gpu::render::state::{TextureConfig, WrapMode};
use crate::core::memory::MemorySystem;

/// Interleave the low 3 bits of x and y into a 6-bit Morton index
#[inline]
pub fn morton_interleave(x: u32, y: u32) -> u32 {
    let mut out = 0;
    for bit in 0..3 {
        out |= ((x >> bit) & 1) << (2 * bit);
        out |= ((y >> bit) & 1) << (2 * bit + 1);
    }
    out
}

/// Texel index of (x, y) in a swizzled surface, in texels
///
/// `width` must be a multiple of 8. The mapping is a bijection over the
/// surface, so distinct coordinates never collide.
#[inline]
pub fn swizzled_offset(x: u32, y: u32, width: u32) -> u32 {
    let tile = (y / 8) * (width / 8) + (x / 8);
    tile * 64 + morton_interleave(x & 7, y & 7)
}

/// Resolve a texture coordinate against the wrap mode for one axis
///
/// Returns `None` when the coordinate falls outside a border-clamped range,
/// in which case the border color applies.
fn wrap_coord(coord: i32, size: u32, mode: WrapMode) -> Option<u32> {
    let size = size as i32;
    match mode {
        WrapMode::ClampToEdge => Some(coord.clamp(0, size - 1) as u32),
        WrapMode::ClampToBorder => {
            if (0..size).contains(&coord) {
                Some(coord as u32)
            } else {
                None
            }
        }
        WrapMode::Repeat => Some(coord.rem_euclid(size) as u32),
        WrapMode::MirroredRepeat => {
            let period = 2 * size;
            let m = coord.rem_euclid(period);
            let m = if m < size { m } else { period - 1 - m };
            Some(m as u32)
        }
    }
}

/// ETC1 intensity modifier tables, indexed by the per-subblock table codeword
const ETC1_MODIFIERS: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

#[inline]
fn extend_4(v: u32) -> i32 {
    ((v << 4) | v) as i32
}

#[inline]
fn extend_5(v: u32) -> i32 {
    ((v << 3) | (v >> 2)) as i32
}

/// Decode one texel from an 8-byte ETC1 block
///
/// `x`, `y` are coordinates within the 4x4 block. The block word splits into
/// two 2x4 (or 4x2) subblocks, each with a base color and a 2-bit modifier
/// index per texel.
fn decode_etc1_texel(block: u64, x: u32, y: u32) -> [u8; 4] {
    let lo = block as u32; // pixel index bits
    let hi = (block >> 32) as u32; // color / mode bits

    let flip = hi & 1 != 0;
    let differential = hi & 2 != 0;
    let table1 = (hi >> 5) & 0x7;
    let table0 = (hi >> 2) & 0x7;

    // Subblock 1 holds the right half (flip=0) or the bottom half (flip=1)
    let second = if flip { y >= 2 } else { x >= 2 };
    let table = if second { table0 } else { table1 };

    let (r, g, b) = if differential {
        let base_r = (hi >> 27) & 0x1F;
        let base_g = (hi >> 19) & 0x1F;
        let base_b = (hi >> 11) & 0x1F;
        if second {
            let delta = |base: u32, field: u32| {
                let d = ((field & 0x7) as i32) - if field & 0x4 != 0 { 8 } else { 0 };
                ((base as i32 + d) & 0x1F) as u32
            };
            let r = delta(base_r, (hi >> 24) & 0x7);
            let g = delta(base_g, (hi >> 16) & 0x7);
            let b = delta(base_b, (hi >> 8) & 0x7);
            (extend_5(r), extend_5(g), extend_5(b))
        } else {
            (extend_5(base_r), extend_5(base_g), extend_5(base_b))
        }
    } else if second {
        (
            extend_4((hi >> 24) & 0xF),
            extend_4((hi >> 16) & 0xF),
            extend_4((hi >> 8) & 0xF),
        )
    } else {
        (
            extend_4((hi >> 28) & 0xF),
            extend_4((hi >> 20) & 0xF),
            extend_4((hi >> 12) & 0xF),
        )
    };

    // Pixel indices are stored column-major: texel (x, y) is bit x*4 + y
    let texel = x * 4 + y;
    let msb = (lo >> (texel + 16)) & 1;
    let lsb = (lo >> texel) & 1;
    let modifier = ETC1_MODIFIERS[table as usize][lsb as usize];
    let modifier = if msb != 0 { -modifier } else { modifier };

    [
        (r + modifier).clamp(0, 255) as u8,
        (g + modifier).clamp(0, 255) as u8,
        (b + modifier).clamp(0, 255) as u8,
        255,
    ]
}

/// Fetch and decode one texel from a swizzled surface
///
/// `x`, `y` are unsigned texel coordinates already wrapped into range.
pub fn decode_texel(mem: &dyn MemorySystem, cfg: &TextureConfig, x: u32, y: u32) -> [u8; 4] {
    use crate::core::gpu::render::state::TextureFormat as F;

    let base = cfg.address;
    let offset = swizzled_offset(x, y, cfg.width.max(8));

    match cfg.format {
        F::Rgba8 => {
            let w = mem.read_u32(base + offset * 4);
            let [a, b, g, r] = w.to_le_bytes();
            [r, g, b, a]
        }
        F::Rgb8 => {
            let addr = base + offset * 3;
            [
                mem.read_u8(addr + 2),
                mem.read_u8(addr + 1),
                mem.read_u8(addr),
                255,
            ]
        }
        F::Rgba5551 => {
            let w = mem.read_u16(base + offset * 2) as u32;
            let r = (w >> 11) & 0x1F;
            let g = (w >> 6) & 0x1F;
            let b = (w >> 1) & 0x1F;
            [
                extend_5(r) as u8,
                extend_5(g) as u8,
                extend_5(b) as u8,
                if w & 1 != 0 { 255 } else { 0 },
            ]
        }
        F::Rgb565 => {
            let w = mem.read_u16(base + offset * 2) as u32;
            let r = (w >> 11) & 0x1F;
            let g = (w >> 5) & 0x3F;
            let b = w & 0x1F;
            [
                extend_5(r) as u8,
                (((g << 2) | (g >> 4)) & 0xFF) as u8,
                extend_5(b) as u8,
                255,
            ]
        }
        F::Rgba4 => {
            let w = mem.read_u16(base + offset * 2) as u32;
            [
                extend_4((w >> 12) & 0xF) as u8,
                extend_4((w >> 8) & 0xF) as u8,
                extend_4((w >> 4) & 0xF) as u8,
                extend_4(w & 0xF) as u8,
            ]
        }
        F::La8 => {
            let addr = base + offset * 2;
            let a = mem.read_u8(addr);
            let l = mem.read_u8(addr + 1);
            [l, l, l, a]
        }
        F::Rg8 => {
            let addr = base + offset * 2;
            let g = mem.read_u8(addr);
            let r = mem.read_u8(addr + 1);
            [r, g, 0, 255]
        }
        F::L8 => {
            let l = mem.read_u8(base + offset);
            [l, l, l, 255]
        }
        F::A8 => {
            let a = mem.read_u8(base + offset);
            [0, 0, 0, a]
        }
        F::La4 => {
            let v = mem.read_u8(base + offset) as u32;
            let l = extend_4(v >> 4) as u8;
            let a = extend_4(v & 0xF) as u8;
            [l, l, l, a]
        }
        F::L4 => {
            // Two texels per byte, even offset in the low nibble
            let v = mem.read_u8(base + offset / 2) as u32;
            let nibble = if offset & 1 != 0 { v >> 4 } else { v & 0xF };
            let l = extend_4(nibble) as u8;
            [l, l, l, 255]
        }
        F::A4 => {
            let v = mem.read_u8(base + offset / 2) as u32;
            let nibble = if offset & 1 != 0 { v >> 4 } else { v & 0xF };
            [0, 0, 0, extend_4(nibble) as u8]
        }
        F::Etc1 | F::Etc1A4 => decode_etc1_surface(mem, cfg, x, y),
    }
}

/// ETC1 surfaces keep the 8x8 tiling of the other formats, but each tile
/// holds four 4x4 blocks in column-major order (top-left, bottom-left,
/// top-right, bottom-right).
fn decode_etc1_surface(
    mem: &dyn MemorySystem,
    cfg: &TextureConfig,
    x: u32,
    y: u32,
) -> [u8; 4] {
    use crate::core::gpu::render::state::TextureFormat as F;
    let has_alpha = cfg.format == F::Etc1A4;
    let block_bytes: u32 = if has_alpha { 16 } else { 8 };

    let width = cfg.width.max(8);
    let tile = (y / 8) * (width / 8) + (x / 8);
    let block_in_tile = (x % 8) / 4 * 2 + (y % 8) / 4;
    let addr = cfg.address + (tile * 4 + block_in_tile) * block_bytes;

    let (alpha, color_addr) = if has_alpha {
        let alpha_lo = mem.read_u32(addr) as u64;
        let alpha_hi = mem.read_u32(addr + 4) as u64;
        ((alpha_hi << 32) | alpha_lo, addr + 8)
    } else {
        (u64::MAX, addr)
    };

    let color_lo = mem.read_u32(color_addr) as u64;
    let color_hi = mem.read_u32(color_addr + 4) as u64;
    let block = (color_hi << 32) | color_lo;

    let bx = x % 4;
    let by = y % 4;
    let mut texel = decode_etc1_texel(block, bx, by);
    if has_alpha {
        // 4 bits per texel, column-major like the color indices
        let shift = (bx * 4 + by) * 4;
        let a = ((alpha >> shift) & 0xF) as u32;
        texel[3] = extend_4(a) as u8;
    }
    texel
}

/// Sample a texture with nearest filtering
///
/// Coordinates use the texture-space convention where t grows upward, so the
/// row index is flipped before the swizzled fetch.
pub fn sample(mem: &dyn MemorySystem, cfg: &TextureConfig, s: f32, t: f32) -> [u8; 4] {
    if cfg.width == 0 || cfg.height == 0 {
        return [0, 0, 0, 255];
    }
    let tx = (s * cfg.width as f32).floor() as i32;
    let ty = (t * cfg.height as f32).floor() as i32;

    let x = wrap_coord(tx, cfg.width, cfg.wrap_s);
    let y = wrap_coord(ty, cfg.height, cfg.wrap_t);
    match (x, y) {
        (Some(x), Some(y)) => decode_texel(mem, cfg, x, cfg.height - 1 - y),
        _ => cfg.border,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu::render::state::TextureFormat;
    use crate::core::memory::FlatMemory;

    #[test]
    fn test_morton_interleave() {
        assert_eq!(morton_interleave(0, 0), 0);
        assert_eq!(morton_interleave(1, 0), 1);
        assert_eq!(morton_interleave(0, 1), 2);
        assert_eq!(morton_interleave(7, 7), 63);
        assert_eq!(morton_interleave(2, 0), 4);
    }

    #[test]
    fn test_swizzled_offset_tiles() {
        // First texel of the second tile in a 16-wide surface
        assert_eq!(swizzled_offset(8, 0, 16), 64);
        // First texel of the second tile row
        assert_eq!(swizzled_offset(0, 8, 16), 128);
        assert_eq!(swizzled_offset(0, 0, 16), 0);
    }

    #[test]
    fn test_swizzle_is_bijective_in_tile() {
        let mut seen = [false; 64];
        for y in 0..8 {
            for x in 0..8 {
                let off = swizzled_offset(x, y, 8) as usize;
                assert!(!seen[off], "collision at ({x}, {y})");
                seen[off] = true;
            }
        }
    }

    #[test]
    fn test_wrap_modes() {
        assert_eq!(wrap_coord(-3, 8, WrapMode::ClampToEdge), Some(0));
        assert_eq!(wrap_coord(12, 8, WrapMode::ClampToEdge), Some(7));
        assert_eq!(wrap_coord(-3, 8, WrapMode::ClampToBorder), None);
        assert_eq!(wrap_coord(5, 8, WrapMode::ClampToBorder), Some(5));
        assert_eq!(wrap_coord(9, 8, WrapMode::Repeat), Some(1));
        assert_eq!(wrap_coord(-1, 8, WrapMode::Repeat), Some(7));
        assert_eq!(wrap_coord(8, 8, WrapMode::MirroredRepeat), Some(7));
        assert_eq!(wrap_coord(-1, 8, WrapMode::MirroredRepeat), Some(0));
        assert_eq!(wrap_coord(15, 8, WrapMode::MirroredRepeat), Some(0));
    }

    #[test]
    fn test_rgb565_decode() {
        let mem = FlatMemory::new(0, 0x1000);
        // Pure green: g field all ones
        mem.write_u16(0, 0x07E0);
        let cfg = TextureConfig {
            enabled: true,
            address: 0,
            width: 8,
            height: 8,
            format: TextureFormat::Rgb565,
            ..Default::default()
        };
        assert_eq!(decode_texel(&mem, &cfg, 0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn test_l4_nibble_order() {
        let mem = FlatMemory::new(0, 0x1000);
        // Texels 0 and 1 share a byte: 0xF in the low nibble, 0x0 high
        mem.write_u8(0, 0x0F);
        let cfg = TextureConfig {
            enabled: true,
            address: 0,
            width: 8,
            height: 8,
            format: TextureFormat::L4,
            ..Default::default()
        };
        assert_eq!(decode_texel(&mem, &cfg, 0, 0)[0], 255);
        assert_eq!(decode_texel(&mem, &cfg, 1, 0)[0], 0);
    }

    #[test]
    fn test_etc1_flat_block() {
        // Individual mode, both base colors 0x8, all pixel indices 0
        // (modifier table 0, +2)
        let mem = FlatMemory::new(0, 0x1000);
        let hi: u32 = 0x8888_8800; // base colors, tables 0, no diff, no flip
        mem.write_u32(0, 0); // pixel index word
        mem.write_u32(4, hi);
        let cfg = TextureConfig {
            enabled: true,
            address: 0,
            width: 8,
            height: 8,
            format: TextureFormat::Etc1,
            ..Default::default()
        };
        let expected = 0x88 + 2;
        assert_eq!(
            decode_texel(&mem, &cfg, 0, 0),
            [expected, expected, expected, 255]
        );
    }

    #[test]
    fn test_border_color() {
        let mem = FlatMemory::new(0, 0x1000);
        let cfg = TextureConfig {
            enabled: true,
            address: 0,
            width: 8,
            height: 8,
            format: TextureFormat::L8,
            wrap_s: WrapMode::ClampToBorder,
            wrap_t: WrapMode::ClampToBorder,
            border: [10, 20, 30, 40],
            ..Default::default()
        };
        assert_eq!(sample(&mem, &cfg, -0.5, 0.5), [10, 20, 30, 40]);
    }
}
