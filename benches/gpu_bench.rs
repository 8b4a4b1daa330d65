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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use pica_core::core::gpu::render::state::{
    ColorFormat, ColorWriteMask, DepthFormat, FramebufferConfig, OutputVertex, TevStage,
    TextureConfig, TextureFormat, Viewport, WrapMode,
};
use pica_core::core::gpu::render::sw::texture::{decode_texel, swizzled_offset};
use pica_core::core::gpu::render::sw::SoftwareRenderer;
use pica_core::core::gpu::render::{PipelineState, RenderBackend};
use pica_core::core::memory::{FlatMemory, MemorySystem};

fn swizzle_benchmark(c: &mut Criterion) {
    c.bench_function("swizzled_offset_256x256", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for y in 0..256 {
                for x in 0..256 {
                    acc = acc.wrapping_add(swizzled_offset(black_box(x), black_box(y), 256));
                }
            }
            acc
        });
    });
}

fn etc1_benchmark(c: &mut Criterion) {
    let mem = FlatMemory::new(0, 0x10000);
    // Fill the surface with a varied bit pattern
    for i in 0..0x4000 {
        mem.write_u32(i * 4, 0x9E37_79B9u32.wrapping_mul(i + 1));
    }
    let cfg = TextureConfig {
        enabled: true,
        address: 0,
        width: 64,
        height: 64,
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Repeat,
        format: TextureFormat::Etc1,
        border: [0; 4],
    };

    c.bench_function("etc1_decode_64x64", |b| {
        b.iter(|| {
            for y in 0..64 {
                for x in 0..64 {
                    black_box(decode_texel(&mem, &cfg, x, y));
                }
            }
        });
    });
}

fn triangle_fill_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangle_fill");
    for size in [64u32, 128, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mem = FlatMemory::new(0, (size * size * 8) as usize + 0x1000);
            let mut state = PipelineState {
                viewport: Viewport {
                    x: 0,
                    y: 0,
                    half_width: size as f32 / 2.0,
                    half_height: size as f32 / 2.0,
                    depth_scale: -1.0,
                    depth_offset: 0.0,
                },
                tev_stages: [TevStage::passthrough(); 6],
                framebuffer: FramebufferConfig {
                    color_address: 0,
                    depth_address: size * size * 4,
                    width: size,
                    height: size,
                    color_format: ColorFormat::Rgba8,
                    depth_format: DepthFormat::D24S8,
                },
                ..Default::default()
            };
            state.depth_color.color_write = ColorWriteMask::all();

            let mut renderer = SoftwareRenderer::new();
            renderer.sync_state(&state);

            let vert = |x: f32, y: f32| OutputVertex {
                position: [x, y, 0.0, 1.0],
                color: [1.0, 0.5, 0.25, 1.0],
                ..Default::default()
            };
            let tri = [vert(-1.0, -1.0), vert(3.0, -1.0), vert(-1.0, 3.0)];

            b.iter(|| {
                renderer.submit_triangle(black_box(&tri), &mem);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    swizzle_benchmark,
    etc1_benchmark,
    triangle_fill_benchmark
);
criterion_main!(benches);
