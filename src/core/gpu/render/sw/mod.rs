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

//! Software rasterization backend
//!
//! For each submitted triangle: clip against the view volume, perspective
//! divide, viewport transform, face culling, then rasterize. Every covered
//! pixel runs the fragment pipeline in order: stencil test, depth test,
//! stencil write-back, texture combiner, alpha test, depth write, blending,
//! and the masked color write.

pub mod clipper;
pub mod combiner;
pub mod framebuffer;
pub mod rasterizer;
pub mod texture;

use super::state::{CullMode, OutputVertex};
use super::{PipelineState, RenderBackend};
use crate::core::memory::MemorySystem;
use combiner::FragmentInputs;
use rasterizer::Fragment;

/// CPU rasterizer writing directly to emulated memory
#[derive(Default)]
pub struct SoftwareRenderer {
    state: PipelineState,
    /// Clip output scratch, reused across triangles
    clipped: Vec<OutputVertex>,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Divide by w and map to window coordinates
    fn to_screen(&self, v: &OutputVertex) -> OutputVertex {
        let vp = &self.state.viewport;
        let mut out = *v;
        let w = v.position[3];
        let inv_w = 1.0 / w;
        let ndc = [
            v.position[0] * inv_w,
            v.position[1] * inv_w,
            v.position[2] * inv_w,
        ];
        out.screen = [
            vp.x as f32 + (ndc[0] + 1.0) * vp.half_width,
            vp.y as f32 + (ndc[1] + 1.0) * vp.half_height,
            (vp.depth_offset + vp.depth_scale * ndc[2]).clamp(0.0, 1.0),
        ];
        out.inv_w = inv_w;
        out
    }

    fn draw_screen_triangle(&self, tri: &[OutputVertex; 3], mem: &dyn MemorySystem) {
        let area = rasterizer::signed_area(tri);
        let front_facing = area > 0.0;
        match self.state.cull_mode {
            CullMode::None => {}
            CullMode::FrontFacing if front_facing => return,
            CullMode::BackFacing if !front_facing => return,
            _ => {}
        }

        let fb = &self.state.framebuffer;
        if fb.width == 0 || fb.height == 0 {
            return;
        }

        let state = &self.state;
        rasterizer::rasterize(
            tri,
            fb.width,
            fb.height,
            state.raster_step,
            &mut |frag: Fragment| {
                self.shade_fragment(&frag, mem);
            },
        );
    }

    fn shade_fragment(&self, frag: &Fragment, mem: &dyn MemorySystem) {
        let state = &self.state;
        let fb = &state.framebuffer;
        let (x, y) = (frag.x, frag.y);

        // Stencil test runs before depth and only with a stencil plane
        let stencil_active = state.stencil.enabled && fb.depth_format.has_stencil();
        let old_stencil = if stencil_active {
            framebuffer::read_stencil(mem, fb, x, y)
        } else {
            0
        };
        if stencil_active {
            let masked = old_stencil as u32 & state.stencil.input_mask as u32;
            let reference = state.stencil.reference as u32 & state.stencil.input_mask as u32;
            if !state.stencil.func.passes_int(masked, reference) {
                self.update_stencil(state.stencil.fail_op, old_stencil, mem, x, y);
                return;
            }
        }

        // Depth test
        let depth_passes = if state.depth_color.depth_test_enabled {
            let stored = framebuffer::read_depth(mem, fb, x, y);
            state.depth_color.depth_func.passes(frag.depth, stored)
        } else {
            true
        };
        if stencil_active {
            let op = if depth_passes {
                state.stencil.zpass_op
            } else {
                state.stencil.zfail_op
            };
            self.update_stencil(op, old_stencil, mem, x, y);
        }
        if !depth_passes {
            return;
        }

        // Sample enabled texture units
        let mut textures = [[0.0f32; 4]; 3];
        for (unit, slot) in textures.iter_mut().enumerate() {
            let cfg = &state.textures[unit];
            if cfg.enabled {
                let [s, t] = frag.texcoord[unit];
                let rgba = texture::sample(mem, cfg, s, t);
                *slot = [
                    rgba[0] as f32 / 255.0,
                    rgba[1] as f32 / 255.0,
                    rgba[2] as f32 / 255.0,
                    rgba[3] as f32 / 255.0,
                ];
            }
        }

        let inputs = FragmentInputs {
            primary: frag.color,
            textures,
        };
        let shaded = combiner::run_combiner(state, &inputs);

        // Alpha test compares the 8-bit quantized alpha
        if state.alpha_test.enabled {
            let alpha = (shaded[3] * 255.0) as u8;
            if !state
                .alpha_test
                .func
                .passes_int(alpha as u32, state.alpha_test.reference as u32)
            {
                return;
            }
        }

        if state.depth_color.depth_write_enabled && state.depth_color.depth_test_enabled {
            framebuffer::write_depth(mem, fb, x, y, frag.depth);
        }

        let final_color = if state.blend.enabled {
            let dst = framebuffer::read_color(mem, fb, x, y);
            let dst = [
                dst[0] as f32 / 255.0,
                dst[1] as f32 / 255.0,
                dst[2] as f32 / 255.0,
                dst[3] as f32 / 255.0,
            ];
            framebuffer::blend(&state.blend, shaded, dst)
        } else {
            shaded
        };

        let mut out = [
            (final_color[0] * 255.0).round() as u8,
            (final_color[1] * 255.0).round() as u8,
            (final_color[2] * 255.0).round() as u8,
            (final_color[3] * 255.0).round() as u8,
        ];
        let mask = state.depth_color.color_write;
        if mask.is_all() {
            framebuffer::write_color(mem, fb, x, y, out);
        } else if !mask.is_empty() {
            use super::state::ColorWriteMask as M;
            let old = framebuffer::read_color(mem, fb, x, y);
            if !mask.contains(M::RED) {
                out[0] = old[0];
            }
            if !mask.contains(M::GREEN) {
                out[1] = old[1];
            }
            if !mask.contains(M::BLUE) {
                out[2] = old[2];
            }
            if !mask.contains(M::ALPHA) {
                out[3] = old[3];
            }
            framebuffer::write_color(mem, fb, x, y, out);
        }
    }

    fn update_stencil(
        &self,
        op: super::state::StencilOp,
        old: u8,
        mem: &dyn MemorySystem,
        x: u32,
        y: u32,
    ) {
        let st = &self.state.stencil;
        let new = op.apply(old, st.reference);
        // Only write-mask bits change; the rest keep their old value
        let merged = (new & st.write_mask) | (old & !st.write_mask);
        framebuffer::write_stencil(mem, &self.state.framebuffer, x, y, merged);
    }
}

impl RenderBackend for SoftwareRenderer {
    fn sync_state(&mut self, state: &PipelineState) {
        self.state = state.clone();
    }

    fn submit_triangle(&mut self, vertices: &[OutputVertex; 3], mem: &dyn MemorySystem) {
        let mut clipped = std::mem::take(&mut self.clipped);
        clipper::clip_triangle(vertices, &mut clipped);

        if clipped.len() >= 3 {
            let projected: Vec<OutputVertex> =
                clipped.iter().map(|v| self.to_screen(v)).collect();
            // Fan triangulation of the clipped polygon
            for i in 1..projected.len() - 1 {
                let tri = [projected[0], projected[i], projected[i + 1]];
                self.draw_screen_triangle(&tri, mem);
            }
        }
        self.clipped = clipped;
    }

    fn flush(&mut self, _mem: &dyn MemorySystem) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu::render::state::{
        ColorFormat, ColorWriteMask, CompareFunc, DepthFormat, FramebufferConfig, TevStage,
        Viewport,
    };
    use crate::core::memory::FlatMemory;

    fn test_state(width: u32, height: u32) -> PipelineState {
        let mut state = PipelineState {
            viewport: Viewport {
                x: 0,
                y: 0,
                half_width: width as f32 / 2.0,
                half_height: height as f32 / 2.0,
                depth_scale: -1.0,
                depth_offset: 0.0,
            },
            tev_stages: [TevStage::passthrough(); 6],
            framebuffer: FramebufferConfig {
                color_address: 0x0000,
                depth_address: 0x8000,
                width,
                height,
                color_format: ColorFormat::Rgba8,
                depth_format: DepthFormat::D24S8,
            },
            ..Default::default()
        };
        state.depth_color.color_write = ColorWriteMask::all();
        state
    }

    fn clip_vert(x: f32, y: f32, z: f32, color: [f32; 4]) -> OutputVertex {
        OutputVertex {
            position: [x, y, z, 1.0],
            color,
            ..Default::default()
        }
    }

    fn full_screen_tris(color: [f32; 4]) -> [[OutputVertex; 3]; 2] {
        let bl = clip_vert(-1.0, -1.0, -0.5, color);
        let br = clip_vert(1.0, -1.0, -0.5, color);
        let tl = clip_vert(-1.0, 1.0, -0.5, color);
        let tr = clip_vert(1.0, 1.0, -0.5, color);
        [[bl, br, tr], [bl, tr, tl]]
    }

    #[test]
    fn test_flat_triangle_writes_color() {
        let mem = FlatMemory::new(0, 0x20000);
        let mut r = SoftwareRenderer::new();
        r.sync_state(&test_state(16, 16));
        for tri in full_screen_tris([1.0, 0.0, 0.0, 1.0]) {
            r.submit_triangle(&tri, &mem);
        }
        let c = framebuffer::read_color(&mem, &r.state.framebuffer, 8, 8);
        assert_eq!(c, [255, 0, 0, 255]);
    }

    #[test]
    fn test_depth_test_rejects_behind() {
        let mem = FlatMemory::new(0, 0x20000);
        let mut state = test_state(16, 16);
        state.depth_color.depth_test_enabled = true;
        state.depth_color.depth_write_enabled = true;
        state.depth_color.depth_func = CompareFunc::Less;
        let mut r = SoftwareRenderer::new();
        r.sync_state(&state);

        // Depth buffer starts at zero, so nothing at z > 0 can pass Less
        for tri in full_screen_tris([0.0, 1.0, 0.0, 1.0]) {
            r.submit_triangle(&tri, &mem);
        }
        let c = framebuffer::read_color(&mem, &state.framebuffer, 8, 8);
        assert_eq!(c, [0, 0, 0, 0]);
    }

    #[test]
    fn test_color_write_mask() {
        let mem = FlatMemory::new(0, 0x20000);
        let mut state = test_state(16, 16);
        state.depth_color.color_write = ColorWriteMask::RED | ColorWriteMask::ALPHA;
        let mut r = SoftwareRenderer::new();
        r.sync_state(&state);
        for tri in full_screen_tris([1.0, 1.0, 1.0, 1.0]) {
            r.submit_triangle(&tri, &mem);
        }
        let c = framebuffer::read_color(&mem, &state.framebuffer, 4, 4);
        assert_eq!(c, [255, 0, 0, 255]);
    }

    #[test]
    fn test_cull_back_face() {
        let mem = FlatMemory::new(0, 0x20000);
        let mut state = test_state(16, 16);
        state.cull_mode = CullMode::BackFacing;
        let mut r = SoftwareRenderer::new();
        r.sync_state(&state);
        // Reverse one triangle's winding; only the other half fills
        let [t0, t1] = full_screen_tris([1.0, 1.0, 1.0, 1.0]);
        r.submit_triangle(&[t0[0], t0[2], t0[1]], &mem);
        r.submit_triangle(&t1, &mem);
        let lower = framebuffer::read_color(&mem, &state.framebuffer, 12, 2);
        let upper = framebuffer::read_color(&mem, &state.framebuffer, 2, 12);
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_alpha_test_discards() {
        let mem = FlatMemory::new(0, 0x20000);
        let mut state = test_state(16, 16);
        state.alpha_test.enabled = true;
        state.alpha_test.func = CompareFunc::Greater;
        state.alpha_test.reference = 128;
        let mut r = SoftwareRenderer::new();
        r.sync_state(&state);
        for tri in full_screen_tris([1.0, 1.0, 1.0, 0.25]) {
            r.submit_triangle(&tri, &mem);
        }
        let c = framebuffer::read_color(&mem, &state.framebuffer, 8, 8);
        assert_eq!(c, [0, 0, 0, 0]);
    }
}
