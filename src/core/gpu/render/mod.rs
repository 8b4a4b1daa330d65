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

//! Rasterization backends
//!
//! The drawing engine hands assembled clip-space triangles to a
//! [`RenderBackend`]. The software backend in [`sw`] implements the full
//! fixed-function pipeline; [`NullBackend`] discards geometry and is useful
//! for headless command-list processing and tests.

pub mod state;
pub mod sw;

use crate::core::memory::MemorySystem;
use state::{
    AlphaTest, BlendConfig, CullMode, DepthColorMask, FramebufferConfig, OutputVertex,
    PrimitiveTopology, StencilConfig, TevStage, TextureConfig, Viewport,
};

/// Snapshot of all fixed-function state a backend needs for one triangle
///
/// Rebuilt from the register file whenever a draw is kicked off, so backends
/// never read registers directly.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub viewport: Viewport,
    pub cull_mode: CullMode,
    pub depth_color: DepthColorMask,
    pub alpha_test: AlphaTest,
    pub stencil: StencilConfig,
    pub blend: BlendConfig,
    pub textures: [TextureConfig; 3],
    pub tev_stages: [TevStage; 6],
    /// Initial combiner-buffer color, RGBA
    pub tev_buffer_color: [u8; 4],
    /// Bits 0-3: stages 1-4 update the buffer RGB after running
    pub tev_buffer_rgb_mask: u8,
    /// Bits 0-3: stages 1-4 update the buffer alpha after running
    pub tev_buffer_alpha_mask: u8,
    pub framebuffer: FramebufferConfig,
    /// Scanline step in pixels; 0 behaves as 1
    pub raster_step: u32,
}

/// Consumes clip-space triangles and fixed-function state
pub trait RenderBackend: Send {
    /// Replace the backend's pipeline state snapshot
    fn sync_state(&mut self, state: &PipelineState);

    /// Draw one clip-space triangle
    fn submit_triangle(&mut self, vertices: &[OutputVertex; 3], mem: &dyn MemorySystem);

    /// Finish any batched work for the current draw
    fn flush(&mut self, mem: &dyn MemorySystem);
}

/// Backend that draws nothing
///
/// Triangles are counted so tests can assert that geometry made it through
/// the front end.
#[derive(Debug, Default)]
pub struct NullBackend {
    pub triangles: u64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for NullBackend {
    fn sync_state(&mut self, _state: &PipelineState) {}

    fn submit_triangle(&mut self, _vertices: &[OutputVertex; 3], _mem: &dyn MemorySystem) {
        self.triangles += 1;
    }

    fn flush(&mut self, _mem: &dyn MemorySystem) {}
}

/// Groups a vertex stream into triangles according to the active topology
///
/// Strips alternate the winding of every other triangle so that face
/// orientation stays consistent; fans pivot around the first vertex.
#[derive(Debug)]
pub struct PrimitiveAssembler {
    topology: PrimitiveTopology,
    buffer: [OutputVertex; 2],
    buffered: usize,
    emitted: u64,
}

impl PrimitiveAssembler {
    pub fn new(topology: PrimitiveTopology) -> Self {
        Self {
            topology,
            buffer: [OutputVertex::default(); 2],
            buffered: 0,
            emitted: 0,
        }
    }

    pub fn reset(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
        self.buffered = 0;
        self.emitted = 0;
    }

    /// Feed one vertex; invokes `out` whenever a full triangle is available
    pub fn submit<F: FnMut([OutputVertex; 3])>(&mut self, vertex: OutputVertex, out: &mut F) {
        match self.topology {
            PrimitiveTopology::List | PrimitiveTopology::GeometryPrimitive => {
                if self.buffered < 2 {
                    self.buffer[self.buffered] = vertex;
                    self.buffered += 1;
                } else {
                    out([self.buffer[0], self.buffer[1], vertex]);
                    self.emitted += 1;
                    self.buffered = 0;
                }
            }
            PrimitiveTopology::Strip => {
                if self.buffered < 2 {
                    self.buffer[self.buffered] = vertex;
                    self.buffered += 1;
                } else {
                    // Even triangles keep order, odd triangles swap the
                    // leading pair to preserve winding.
                    if self.emitted % 2 == 0 {
                        out([self.buffer[0], self.buffer[1], vertex]);
                    } else {
                        out([self.buffer[1], self.buffer[0], vertex]);
                    }
                    self.emitted += 1;
                    self.buffer[0] = self.buffer[1];
                    self.buffer[1] = vertex;
                }
            }
            PrimitiveTopology::Fan => {
                if self.buffered < 2 {
                    self.buffer[self.buffered] = vertex;
                    self.buffered += 1;
                } else {
                    out([self.buffer[0], self.buffer[1], vertex]);
                    self.emitted += 1;
                    self.buffer[1] = vertex;
                }
            }
        }
    }
}

const VERTEX_CACHE_SIZE: usize = 256;

/// Post-transform vertex cache for indexed draws
///
/// Directly mapped on the low bits of the vertex index with a per-draw
/// generation tag, so invalidation is a counter bump rather than a sweep.
pub struct VertexCache {
    entries: Vec<OutputVertex>,
    keys: Vec<u32>,
    tags: Vec<u32>,
    generation: u32,
}

impl Default for VertexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexCache {
    pub fn new() -> Self {
        Self {
            entries: vec![OutputVertex::default(); VERTEX_CACHE_SIZE],
            keys: vec![u32::MAX; VERTEX_CACHE_SIZE],
            tags: vec![0; VERTEX_CACHE_SIZE],
            generation: 0,
        }
    }

    /// Invalidate all entries at the start of a draw
    pub fn begin_draw(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn lookup(&self, index: u32) -> Option<&OutputVertex> {
        let slot = index as usize % VERTEX_CACHE_SIZE;
        if self.tags[slot] == self.generation && self.keys[slot] == index {
            Some(&self.entries[slot])
        } else {
            None
        }
    }

    pub fn insert(&mut self, index: u32, vertex: OutputVertex) {
        let slot = index as usize % VERTEX_CACHE_SIZE;
        self.entries[slot] = vertex;
        self.keys[slot] = index;
        self.tags[slot] = self.generation;
    }
}
