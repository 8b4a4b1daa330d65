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

//! Framebuffer access and blending
//!
//! Color and depth surfaces share the 8x8-tile Morton layout used by
//! textures. Depth values are normalized to [0, 1] at the access boundary;
//! the D24S8 format interleaves an 8-bit stencil plane in the high byte of
//! each 32-bit word.

use super::texture::swizzled_offset;
use crate::core::gpu::render::state::{
    BlendConfig, BlendEquation, BlendFactor, ColorFormat, DepthFormat, FramebufferConfig,
};
use crate::core::memory::MemorySystem;

fn color_addr(cfg: &FramebufferConfig, x: u32, y: u32) -> u32 {
    cfg.color_address
        + swizzled_offset(x, y, cfg.width) * cfg.color_format.bytes_per_pixel() as u32
}

fn depth_addr(cfg: &FramebufferConfig, x: u32, y: u32) -> u32 {
    cfg.depth_address
        + swizzled_offset(x, y, cfg.width) * cfg.depth_format.bytes_per_pixel() as u32
}

#[inline]
fn extend_5(v: u32) -> u8 {
    (((v << 3) | (v >> 2)) & 0xFF) as u8
}

#[inline]
fn extend_4(v: u32) -> u8 {
    (((v << 4) | v) & 0xFF) as u8
}

#[inline]
fn extend_6(v: u32) -> u8 {
    (((v << 2) | (v >> 4)) & 0xFF) as u8
}

pub fn read_color(mem: &dyn MemorySystem, cfg: &FramebufferConfig, x: u32, y: u32) -> [u8; 4] {
    let addr = color_addr(cfg, x, y);
    match cfg.color_format {
        ColorFormat::Rgba8 => {
            let [a, b, g, r] = mem.read_u32(addr).to_le_bytes();
            [r, g, b, a]
        }
        ColorFormat::Rgb8 => [
            mem.read_u8(addr + 2),
            mem.read_u8(addr + 1),
            mem.read_u8(addr),
            255,
        ],
        ColorFormat::Rgb565 => {
            let w = mem.read_u16(addr) as u32;
            [
                extend_5(w >> 11),
                extend_6((w >> 5) & 0x3F),
                extend_5(w & 0x1F),
                255,
            ]
        }
        ColorFormat::Rgba5551 => {
            let w = mem.read_u16(addr) as u32;
            [
                extend_5(w >> 11),
                extend_5((w >> 6) & 0x1F),
                extend_5((w >> 1) & 0x1F),
                if w & 1 != 0 { 255 } else { 0 },
            ]
        }
        ColorFormat::Rgba4 => {
            let w = mem.read_u16(addr) as u32;
            [
                extend_4(w >> 12),
                extend_4((w >> 8) & 0xF),
                extend_4((w >> 4) & 0xF),
                extend_4(w & 0xF),
            ]
        }
    }
}

pub fn write_color(
    mem: &dyn MemorySystem,
    cfg: &FramebufferConfig,
    x: u32,
    y: u32,
    color: [u8; 4],
) {
    let addr = color_addr(cfg, x, y);
    let [r, g, b, a] = color;
    match cfg.color_format {
        ColorFormat::Rgba8 => {
            mem.write_u32(addr, u32::from_le_bytes([a, b, g, r]));
        }
        ColorFormat::Rgb8 => {
            mem.write_u8(addr, b);
            mem.write_u8(addr + 1, g);
            mem.write_u8(addr + 2, r);
        }
        ColorFormat::Rgb565 => {
            let w = ((r as u32 >> 3) << 11) | ((g as u32 >> 2) << 5) | (b as u32 >> 3);
            mem.write_u16(addr, w as u16);
        }
        ColorFormat::Rgba5551 => {
            let w = ((r as u32 >> 3) << 11)
                | ((g as u32 >> 3) << 6)
                | ((b as u32 >> 3) << 1)
                | (a as u32 >> 7);
            mem.write_u16(addr, w as u16);
        }
        ColorFormat::Rgba4 => {
            let w = ((r as u32 >> 4) << 12)
                | ((g as u32 >> 4) << 8)
                | ((b as u32 >> 4) << 4)
                | (a as u32 >> 4);
            mem.write_u16(addr, w as u16);
        }
    }
}

/// Read the normalized depth value at (x, y)
pub fn read_depth(mem: &dyn MemorySystem, cfg: &FramebufferConfig, x: u32, y: u32) -> f32 {
    let addr = depth_addr(cfg, x, y);
    match cfg.depth_format {
        DepthFormat::D16 => mem.read_u16(addr) as f32 / 0xFFFF as f32,
        DepthFormat::D24 => {
            let v = mem.read_u8(addr) as u32
                | ((mem.read_u8(addr + 1) as u32) << 8)
                | ((mem.read_u8(addr + 2) as u32) << 16);
            v as f32 / 0x00FF_FFFF as f32
        }
        DepthFormat::D24S8 => {
            let v = mem.read_u32(addr) & 0x00FF_FFFF;
            v as f32 / 0x00FF_FFFF as f32
        }
    }
}

pub fn write_depth(mem: &dyn MemorySystem, cfg: &FramebufferConfig, x: u32, y: u32, depth: f32) {
    let addr = depth_addr(cfg, x, y);
    let depth = depth.clamp(0.0, 1.0);
    match cfg.depth_format {
        DepthFormat::D16 => {
            mem.write_u16(addr, (depth * 0xFFFF as f32) as u16);
        }
        DepthFormat::D24 => {
            let v = (depth * 0x00FF_FFFF as f32) as u32;
            mem.write_u8(addr, v as u8);
            mem.write_u8(addr + 1, (v >> 8) as u8);
            mem.write_u8(addr + 2, (v >> 16) as u8);
        }
        DepthFormat::D24S8 => {
            let v = (depth * 0x00FF_FFFF as f32) as u32;
            let old = mem.read_u32(addr);
            mem.write_u32(addr, (old & 0xFF00_0000) | v);
        }
    }
}

/// Stencil reads as zero on formats without a stencil plane
pub fn read_stencil(mem: &dyn MemorySystem, cfg: &FramebufferConfig, x: u32, y: u32) -> u8 {
    if cfg.depth_format != DepthFormat::D24S8 {
        return 0;
    }
    mem.read_u8(depth_addr(cfg, x, y) + 3)
}

pub fn write_stencil(mem: &dyn MemorySystem, cfg: &FramebufferConfig, x: u32, y: u32, value: u8) {
    if cfg.depth_format != DepthFormat::D24S8 {
        return;
    }
    mem.write_u8(depth_addr(cfg, x, y) + 3, value);
}

fn factor_rgb(factor: BlendFactor, src: [f32; 4], dst: [f32; 4], constant: [f32; 4]) -> [f32; 3] {
    match factor {
        BlendFactor::Zero => [0.0; 3],
        BlendFactor::One => [1.0; 3],
        BlendFactor::SourceColor => [src[0], src[1], src[2]],
        BlendFactor::OneMinusSourceColor => [1.0 - src[0], 1.0 - src[1], 1.0 - src[2]],
        BlendFactor::DestColor => [dst[0], dst[1], dst[2]],
        BlendFactor::OneMinusDestColor => [1.0 - dst[0], 1.0 - dst[1], 1.0 - dst[2]],
        BlendFactor::SourceAlpha => [src[3]; 3],
        BlendFactor::OneMinusSourceAlpha => [1.0 - src[3]; 3],
        BlendFactor::DestAlpha => [dst[3]; 3],
        BlendFactor::OneMinusDestAlpha => [1.0 - dst[3]; 3],
        BlendFactor::ConstantColor => [constant[0], constant[1], constant[2]],
        BlendFactor::OneMinusConstantColor => {
            [1.0 - constant[0], 1.0 - constant[1], 1.0 - constant[2]]
        }
        BlendFactor::ConstantAlpha => [constant[3]; 3],
        BlendFactor::OneMinusConstantAlpha => [1.0 - constant[3]; 3],
        BlendFactor::SourceAlphaSaturate => [src[3].min(1.0 - dst[3]); 3],
    }
}

fn factor_alpha(factor: BlendFactor, src: [f32; 4], dst: [f32; 4], constant: [f32; 4]) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One | BlendFactor::SourceAlphaSaturate => 1.0,
        BlendFactor::SourceColor | BlendFactor::SourceAlpha => src[3],
        BlendFactor::OneMinusSourceColor | BlendFactor::OneMinusSourceAlpha => 1.0 - src[3],
        BlendFactor::DestColor | BlendFactor::DestAlpha => dst[3],
        BlendFactor::OneMinusDestColor | BlendFactor::OneMinusDestAlpha => 1.0 - dst[3],
        BlendFactor::ConstantColor | BlendFactor::ConstantAlpha => constant[3],
        BlendFactor::OneMinusConstantColor | BlendFactor::OneMinusConstantAlpha => {
            1.0 - constant[3]
        }
    }
}

fn combine(eq: BlendEquation, s: f32, sf: f32, d: f32, df: f32) -> f32 {
    match eq {
        BlendEquation::Add => s * sf + d * df,
        BlendEquation::Subtract => s * sf - d * df,
        BlendEquation::ReverseSubtract => d * df - s * sf,
        BlendEquation::Min => s.min(d),
        BlendEquation::Max => s.max(d),
    }
}

/// Blend an incoming fragment against the destination pixel
///
/// Both colors are normalized RGBA; the result is clamped to [0, 1].
pub fn blend(cfg: &BlendConfig, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let constant = [
        cfg.constant[0] as f32 / 255.0,
        cfg.constant[1] as f32 / 255.0,
        cfg.constant[2] as f32 / 255.0,
        cfg.constant[3] as f32 / 255.0,
    ];
    let sf = factor_rgb(cfg.color_src, src, dst, constant);
    let df = factor_rgb(cfg.color_dst, src, dst, constant);
    let sa = factor_alpha(cfg.alpha_src, src, dst, constant);
    let da = factor_alpha(cfg.alpha_dst, src, dst, constant);
    [
        combine(cfg.color_eq, src[0], sf[0], dst[0], df[0]).clamp(0.0, 1.0),
        combine(cfg.color_eq, src[1], sf[1], dst[1], df[1]).clamp(0.0, 1.0),
        combine(cfg.color_eq, src[2], sf[2], dst[2], df[2]).clamp(0.0, 1.0),
        combine(cfg.alpha_eq, src[3], sa, dst[3], da).clamp(0.0, 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::FlatMemory;

    fn fb(color_format: ColorFormat, depth_format: DepthFormat) -> FramebufferConfig {
        FramebufferConfig {
            color_address: 0x1000,
            depth_address: 0x8000,
            width: 16,
            height: 16,
            color_format,
            depth_format,
        }
    }

    #[test]
    fn test_rgba8_round_trip() {
        let mem = FlatMemory::new(0, 0x10000);
        let cfg = fb(ColorFormat::Rgba8, DepthFormat::D16);
        write_color(&mem, &cfg, 3, 5, [1, 2, 3, 4]);
        assert_eq!(read_color(&mem, &cfg, 3, 5), [1, 2, 3, 4]);
        // Neighboring pixel untouched
        assert_eq!(read_color(&mem, &cfg, 4, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn test_rgb565_write_drops_alpha() {
        let mem = FlatMemory::new(0, 0x10000);
        let cfg = fb(ColorFormat::Rgb565, DepthFormat::D16);
        write_color(&mem, &cfg, 0, 0, [255, 128, 0, 7]);
        let c = read_color(&mem, &cfg, 0, 0);
        assert_eq!(c[0], 255);
        assert_eq!(c[3], 255);
        assert_eq!(c[2], 0);
    }

    #[test]
    fn test_d24s8_depth_preserves_stencil() {
        let mem = FlatMemory::new(0, 0x10000);
        let cfg = fb(ColorFormat::Rgba8, DepthFormat::D24S8);
        write_stencil(&mem, &cfg, 2, 2, 0xAB);
        write_depth(&mem, &cfg, 2, 2, 0.5);
        assert_eq!(read_stencil(&mem, &cfg, 2, 2), 0xAB);
        assert!((read_depth(&mem, &cfg, 2, 2) - 0.5).abs() < 1e-6);
        // Writing stencil leaves depth alone
        write_stencil(&mem, &cfg, 2, 2, 0x01);
        assert!((read_depth(&mem, &cfg, 2, 2) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stencil_absent_without_plane() {
        let mem = FlatMemory::new(0, 0x10000);
        let cfg = fb(ColorFormat::Rgba8, DepthFormat::D24);
        write_stencil(&mem, &cfg, 0, 0, 0xFF);
        assert_eq!(read_stencil(&mem, &cfg, 0, 0), 0);
    }

    #[test]
    fn test_alpha_blend() {
        let cfg = BlendConfig {
            enabled: true,
            color_eq: BlendEquation::Add,
            alpha_eq: BlendEquation::Add,
            color_src: BlendFactor::SourceAlpha,
            color_dst: BlendFactor::OneMinusSourceAlpha,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::Zero,
            constant: [0; 4],
        };
        let out = blend(&cfg, [1.0, 0.0, 0.0, 0.5], [0.0, 1.0, 0.0, 1.0]);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[3], 0.5);
    }

    #[test]
    fn test_blend_min_ignores_factors() {
        let cfg = BlendConfig {
            enabled: true,
            color_eq: BlendEquation::Min,
            alpha_eq: BlendEquation::Max,
            color_src: BlendFactor::Zero,
            color_dst: BlendFactor::Zero,
            alpha_src: BlendFactor::Zero,
            alpha_dst: BlendFactor::Zero,
            constant: [0; 4],
        };
        let out = blend(&cfg, [0.25, 0.75, 0.5, 0.1], [0.5, 0.5, 0.5, 0.9]);
        assert_eq!(out[0], 0.25);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[3], 0.9);
    }
}
