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

use proptest::prelude::*;

use crate::core::gpu::render::state::{
    ColorFormat, ColorWriteMask, DepthFormat, FramebufferConfig, OutputVertex, TevStage, Viewport,
};
use crate::core::gpu::render::sw::texture::swizzled_offset;
use crate::core::gpu::render::sw::{framebuffer, SoftwareRenderer};
use crate::core::gpu::render::{PipelineState, RenderBackend};
use crate::core::memory::FlatMemory;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Over a whole surface, tile swizzling maps pixel coordinates onto
    /// texel indices one-to-one, so it can be inverted by a linear scan.
    #[test]
    fn swizzled_offsets_form_a_permutation(w_tiles in 1u32..6, h_tiles in 1u32..6) {
        let (w, h) = (w_tiles * 8, h_tiles * 8);
        let mut seen = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                let off = swizzled_offset(x, y, w) as usize;
                prop_assert!(off < seen.len(), "offset {} escapes {}x{}", off, w, h);
                prop_assert!(!seen[off], "offset {} hit twice", off);
                seen[off] = true;
            }
        }
    }
}

fn pipeline_state(width: u32, height: u32) -> PipelineState {
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

fn vert(x: f32, y: f32, z: f32, w: f32) -> OutputVertex {
    OutputVertex {
        position: [x, y, z, w],
        color: [1.0, 1.0, 1.0, 1.0],
        ..Default::default()
    }
}

#[test]
fn test_triangle_outside_view_volume_touches_nothing() {
    let mem = FlatMemory::new(0, 0x20000);
    let mut r = SoftwareRenderer::new();
    r.sync_state(&pipeline_state(16, 16));

    // Entirely beyond the x = +w plane
    let tri = [
        vert(5.0, -1.0, 0.0, 1.0),
        vert(5.0, 1.0, 0.0, 1.0),
        vert(6.0, 0.0, 0.0, 1.0),
    ];
    r.submit_triangle(&tri, &mem);

    assert!(mem.dump(0, 16 * 16 * 4).iter().all(|&b| b == 0));
}

#[test]
fn test_triangle_behind_camera_touches_nothing() {
    let mem = FlatMemory::new(0, 0x20000);
    let mut r = SoftwareRenderer::new();
    r.sync_state(&pipeline_state(16, 16));

    let tri = [
        vert(-1.0, -1.0, 0.0, -1.0),
        vert(1.0, -1.0, 0.0, -1.0),
        vert(0.0, 1.0, 0.0, -1.0),
    ];
    r.submit_triangle(&tri, &mem);

    assert!(mem.dump(0, 16 * 16 * 4).iter().all(|&b| b == 0));
}

#[test]
fn test_straddling_triangle_keeps_inside_part() {
    let mem = FlatMemory::new(0, 0x20000);
    let mut r = SoftwareRenderer::new();
    let state = pipeline_state(16, 16);
    r.sync_state(&state);

    // Left half inside, right half past x = +w
    let tri = [
        vert(-1.0, -1.0, 0.0, 1.0),
        vert(3.0, -1.0, 0.0, 1.0),
        vert(-1.0, 3.0, 0.0, 1.0),
    ];
    r.submit_triangle(&tri, &mem);

    let covered = framebuffer::read_color(&mem, &state.framebuffer, 2, 2);
    assert_eq!(covered, [255, 255, 255, 255]);
}

#[test]
fn test_triangle_at_positive_z_still_renders() {
    let mem = FlatMemory::new(0, 0x20000);
    let mut r = SoftwareRenderer::new();
    let state = pipeline_state(16, 16);
    r.sync_state(&state);

    // Inside the near half of the volume, 0 < z <= w
    let tri = [
        vert(-1.0, -1.0, 0.5, 1.0),
        vert(3.0, -1.0, 0.5, 1.0),
        vert(-1.0, 3.0, 0.5, 1.0),
    ];
    r.submit_triangle(&tri, &mem);

    let covered = framebuffer::read_color(&mem, &state.framebuffer, 2, 2);
    assert_eq!(covered, [255, 255, 255, 255]);
}
