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

//! Draw-call execution
//!
//! A draw trigger walks the configured vertex range: attributes are gathered
//! from the interleaved arrays (or the fixed-attribute bank), mapped into
//! shader input registers, run through the vertex program, and the outputs
//! mapped to clip-space vertices by the output semantic map. Vertices then
//! either feed primitive assembly directly or are batched as inputs to
//! geometry shader invocations, which emit triangles themselves.

use crate::core::gpu::registers::{reg, Registers};
use crate::core::gpu::render::state::OutputVertex;
use crate::core::gpu::render::RenderBackend;
use crate::core::gpu::shader::{run_shader, EmitSink, NoEmit, Vec4};
use crate::core::gpu::GpuCore;
use crate::core::interrupt::GpuInterrupt;
use crate::core::memory::MemorySystem;

pub fn draw_arrays(core: &mut GpuCore) {
    core.run_draw(false);
}

pub fn draw_elements(core: &mut GpuCore) {
    core.run_draw(true);
}

/// Where one attribute's data comes from during a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrSource {
    /// Interleaved array element: loader start, byte offset inside one
    /// vertex, stride, component type (0 = i8, 1 = u8, 2 = i16, 3 = f32),
    /// component count
    Array {
        loader_offset: u32,
        byte_offset: u32,
        stride: u32,
        ty: u8,
        components: u8,
    },
    /// Falls back to the fixed-attribute bank
    Fixed,
}

/// Decoded vertex attribute configuration
#[derive(Debug)]
struct VertexLayout {
    /// Physical base of the attribute arrays
    base: u32,
    sources: [AttrSource; 12],
    /// Number of active attributes
    count: usize,
    /// Input-register map: nibble per attribute
    input_map: u64,
}

impl VertexLayout {
    fn decode(regs: &Registers) -> Self {
        let base = regs.read(reg::ATTR_BASE) << 3;
        let format_low = regs.read(reg::ATTR_FORMAT_LOW) as u64;
        let format_high = regs.read(reg::ATTR_FORMAT_HIGH) as u64;
        let format = format_low | (format_high << 32);
        let fixed_mask = ((format >> 48) & 0xFFF) as u32;
        let count = (((format >> 60) & 0xF) + 1) as usize;

        let mut sources = [AttrSource::Fixed; 12];

        for loader in 0..12 {
            let loader_base = reg::ATTR_LOADER_BASE + loader * 3;
            let offset = regs.read(loader_base);
            let map_low = regs.read(loader_base + 1) as u64;
            let map_high = regs.read(loader_base + 2);
            let component_map = map_low | (((map_high & 0xFFFF) as u64) << 32);
            let stride = (map_high >> 16) & 0xFF;
            let components = (map_high >> 28) & 0xF;

            let mut cursor = 0u32;
            for c in 0..components {
                let sel = ((component_map >> (4 * c)) & 0xF) as usize;
                if sel < 12 {
                    let attr_format = (format >> (4 * sel)) & 0xF;
                    let ty = (attr_format & 0x3) as u8;
                    let n = (((attr_format >> 2) & 0x3) + 1) as u8;
                    if fixed_mask & (1 << sel) == 0 {
                        sources[sel] = AttrSource::Array {
                            loader_offset: offset,
                            byte_offset: cursor,
                            stride,
                            ty,
                            components: n,
                        };
                    }
                    cursor += component_bytes(ty) * n as u32;
                } else {
                    // Selectors 12-15 are alignment padding of 4-16 bytes
                    cursor += 4 * (sel as u32 - 11);
                }
            }
        }

        let input_map = regs.read(reg::VS_INPUT_MAP_LOW) as u64
            | ((regs.read(reg::VS_INPUT_MAP_HIGH) as u64) << 32);

        Self {
            base,
            sources,
            count: count.min(12),
            input_map,
        }
    }

    /// Gather all attributes of one vertex into shader input registers
    fn load(
        &self,
        mem: &dyn MemorySystem,
        fixed_attrs: &[Vec4; 16],
        vertex: u32,
    ) -> [Vec4; 16] {
        let mut inputs = [[0.0f32; 4]; 16];
        for attr in 0..self.count {
            let value = match self.sources[attr] {
                AttrSource::Fixed => fixed_attrs[attr],
                AttrSource::Array {
                    loader_offset,
                    byte_offset,
                    stride,
                    ty,
                    components,
                } => {
                    let addr = self.base + loader_offset + vertex * stride + byte_offset;
                    read_element(mem, addr, ty, components)
                }
            };
            let register = ((self.input_map >> (4 * attr)) & 0xF) as usize;
            inputs[register] = value;
        }
        inputs
    }
}

fn component_bytes(ty: u8) -> u32 {
    match ty {
        0 | 1 => 1,
        2 => 2,
        _ => 4,
    }
}

/// Read one attribute element, padding missing components with (0, 0, 0, 1)
fn read_element(mem: &dyn MemorySystem, addr: u32, ty: u8, components: u8) -> Vec4 {
    let mut out = [0.0, 0.0, 0.0, 1.0];
    for c in 0..components.min(4) as u32 {
        out[c as usize] = match ty {
            0 => mem.read_u8(addr + c) as i8 as f32,
            1 => mem.read_u8(addr + c) as f32,
            2 => mem.read_u16(addr + c * 2) as i16 as f32,
            _ => f32::from_bits(mem.read_u32(addr + c * 4)),
        };
    }
    out
}

/// Output semantic map: routes shader output components to vertex attributes
#[derive(Debug)]
struct OutputMap {
    total: usize,
    /// 5-bit semantic selector per output component
    semantics: [[u8; 4]; 7],
}

impl OutputMap {
    fn decode(regs: &Registers) -> Self {
        let total = ((regs.read(reg::OUTPUT_MAP_TOTAL) & 0x7) as usize + 1).min(7);
        let mut semantics = [[0x1F; 4]; 7];
        for (i, row) in semantics.iter_mut().enumerate() {
            let word = regs.read(reg::OUTPUT_MAP_BASE + i as u16);
            for (c, sem) in row.iter_mut().enumerate() {
                *sem = ((word >> (8 * c)) & 0x1F) as u8;
            }
        }
        Self { total, semantics }
    }

    /// Build a clip-space vertex from an output register file
    fn apply(&self, outputs: &[Vec4; 16]) -> OutputVertex {
        let mut v = OutputVertex::default();
        for (i, row) in self.semantics.iter().enumerate().take(self.total) {
            for (c, &sem) in row.iter().enumerate() {
                let value = outputs[i][c];
                match sem {
                    0..=3 => v.position[sem as usize] = value,
                    8..=11 => v.color[(sem - 8) as usize] = value,
                    12 | 13 => v.texcoord[0][(sem - 12) as usize] = value,
                    14 | 15 => v.texcoord[1][(sem - 14) as usize] = value,
                    22 | 23 => v.texcoord[2][(sem - 22) as usize] = value,
                    // 0x1F and the unimplemented semantics (quaternion,
                    // view vector, tc0.w) are dropped
                    _ => {}
                }
            }
        }
        v
    }
}

/// Emit sink routing geometry-shader triangles straight to the backend
struct BackendEmit<'a> {
    backend: &'a mut dyn RenderBackend,
    mem: &'a dyn MemorySystem,
    outmap: &'a OutputMap,
    triangles: u64,
}

impl EmitSink for BackendEmit<'_> {
    fn triangle(&mut self, vertices: &[[Vec4; 16]; 3], winding: bool) {
        let v0 = self.outmap.apply(&vertices[0]);
        let v1 = self.outmap.apply(&vertices[1]);
        let v2 = self.outmap.apply(&vertices[2]);
        let tri = if winding { [v0, v2, v1] } else { [v0, v1, v2] };
        self.backend.submit_triangle(&tri, self.mem);
        self.triangles += 1;
    }
}

/// Index buffer configuration for draw-elements
struct IndexConfig {
    addr: u32,
    wide: bool,
}

impl IndexConfig {
    fn decode(regs: &Registers, base: u32) -> Self {
        let raw = regs.read(reg::INDEX_ARRAY);
        Self {
            addr: base + (raw & 0x0FFF_FFFF),
            wide: raw & 0x8000_0000 != 0,
        }
    }

    fn fetch(&self, mem: &dyn MemorySystem, i: u32) -> u32 {
        if self.wide {
            mem.read_u16(self.addr + i * 2) as u32
        } else {
            mem.read_u8(self.addr + i) as u32
        }
    }
}

impl GpuCore {
    /// Execute one draw batch
    fn run_draw(&mut self, indexed: bool) {
        self.sync_backend_state();
        let layout = VertexLayout::decode(&self.regs);
        let outmap = OutputMap::decode(&self.regs);
        let index_cfg = IndexConfig::decode(&self.regs, layout.base);
        let vertex_count = self.regs.read(reg::NUM_VERTICES);
        let vertex_offset = self.regs.read(reg::VERTEX_OFFSET);
        let use_gs = self.regs.read(reg::USE_GS) & 1 != 0;
        let gs_batch_size = ((self.regs.read(reg::GS_CONFIG) & 0xF) + 1) as usize;

        self.vertex_cache.begin_draw();
        let mem = self.ctx.memory.clone();

        // Geometry invocations consume raw output register files
        let mut gs_batch: Vec<[Vec4; 16]> = Vec::new();

        for i in 0..vertex_count {
            let index = if indexed {
                index_cfg.fetch(mem.as_ref(), i)
            } else {
                vertex_offset.wrapping_add(i)
            };

            // The post-transform cache only applies to indexed, non-GS draws
            let cacheable = indexed && !use_gs;
            if cacheable {
                if let Some(v) = self.vertex_cache.lookup(index) {
                    let v = *v;
                    self.submit_assembled(v);
                    continue;
                }
            }

            let inputs = layout.load(mem.as_ref(), &self.fixed_attrs, index);
            self.unit.input = inputs;
            run_shader(&mut self.unit, &self.vs, &mut NoEmit);
            let outputs = self.unit.output;

            if use_gs {
                gs_batch.push(outputs);
                if gs_batch.len() == gs_batch_size {
                    self.run_geometry(&gs_batch, &outmap);
                    gs_batch.clear();
                }
            } else {
                let vertex = outmap.apply(&outputs);
                if cacheable {
                    self.vertex_cache.insert(index, vertex);
                }
                self.submit_assembled(vertex);
            }
        }

        if !gs_batch.is_empty() {
            log::warn!(
                "draw ended with {} of {} geometry input vertices pending",
                gs_batch.len(),
                gs_batch_size
            );
        }

        self.backend.flush(mem.as_ref());
        self.ctx.interrupts.raise(GpuInterrupt::DrawComplete);
    }

    /// Feed one vertex to primitive assembly and the backend
    fn submit_assembled(&mut self, vertex: OutputVertex) {
        let GpuCore {
            assembler,
            backend,
            ctx,
            ..
        } = self;
        let mem = ctx.memory.as_ref();
        assembler.submit(vertex, &mut |tri| {
            backend.submit_triangle(&tri, mem);
        });
    }

    /// Run one geometry invocation over a batch of vertex-shader outputs
    ///
    /// Vertex `j`'s mapped output registers occupy input registers starting
    /// at `j * per_vertex`, where `per_vertex` is the mapped output count.
    fn run_geometry(&mut self, batch: &[[Vec4; 16]], outmap: &OutputMap) {
        let per_vertex = outmap.total;
        let mut inputs = [[0.0f32; 4]; 16];
        for (j, outputs) in batch.iter().enumerate() {
            for k in 0..per_vertex {
                let slot = j * per_vertex + k;
                if slot < 16 {
                    inputs[slot] = outputs[k];
                } else {
                    log::warn!("geometry input registers exhausted at vertex {j}");
                }
            }
        }

        let GpuCore {
            unit,
            gs,
            backend,
            ctx,
            ..
        } = self;
        unit.input = inputs;
        let mut sink = BackendEmit {
            backend: backend.as_mut(),
            mem: ctx.memory.as_ref(),
            outmap,
            triangles: 0,
        };
        run_shader(unit, gs, &mut sink);
        if sink.triangles == 0 {
            log::debug!("geometry invocation emitted no primitives");
        }
    }
}

/// Handle one vector arriving through the immediate-mode port
///
/// Vectors accumulate until every active attribute has a value, at which
/// point the vertex runs the full pipeline immediately.
pub fn submit_immediate(core: &mut GpuCore, vector: Vec4) {
    core.immediate.push(vector);
    let layout = VertexLayout::decode(&core.regs);
    if core.immediate.len() < layout.count {
        return;
    }

    let mut inputs = [[0.0f32; 4]; 16];
    for (attr, value) in core.immediate.iter().enumerate() {
        let register = ((layout.input_map >> (4 * attr)) & 0xF) as usize;
        inputs[register] = *value;
    }
    core.immediate.clear();

    core.sync_backend_state();
    core.unit.input = inputs;
    run_shader(&mut core.unit, &core.vs, &mut NoEmit);
    let outmap = OutputMap::decode(&core.regs);
    let vertex = outmap.apply(&core.unit.output);
    core.submit_assembled(vertex);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_map_semantics() {
        let mut regs = Registers::new();
        regs.write_masked(reg::OUTPUT_MAP_TOTAL, 1, 0xFFFF_FFFF); // two registers
        // o0 = position xyzw
        regs.write_masked(
            reg::OUTPUT_MAP_BASE,
            0x03_02_01_00,
            0xFFFF_FFFF,
        );
        // o1 = color rgba
        regs.write_masked(
            reg::OUTPUT_MAP_BASE + 1,
            0x0B_0A_09_08,
            0xFFFF_FFFF,
        );
        let map = OutputMap::decode(&regs);
        let mut outputs = [[0.0f32; 4]; 16];
        outputs[0] = [1.0, 2.0, 3.0, 4.0];
        outputs[1] = [0.1, 0.2, 0.3, 0.4];
        let v = map.apply(&outputs);
        assert_eq!(v.position, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.color, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_output_map_ignores_unused() {
        let mut regs = Registers::new();
        regs.write_masked(reg::OUTPUT_MAP_TOTAL, 0, 0xFFFF_FFFF);
        regs.write_masked(reg::OUTPUT_MAP_BASE, 0x1F_1F_1F_1F, 0xFFFF_FFFF);
        let map = OutputMap::decode(&regs);
        let outputs = [[9.0f32; 4]; 16];
        let v = map.apply(&outputs);
        assert_eq!(v.position, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_layout_decode_interleaved() {
        let mut regs = Registers::new();
        // Two attributes: attr 0 = 3 x f32, attr 1 = 4 x u8
        regs.write_masked(reg::ATTR_FORMAT_LOW, 0x0000_00DB, 0xFFFF_FFFF);
        // count - 1 = 1 in the top nibble
        regs.write_masked(reg::ATTR_FORMAT_HIGH, 0x1000_0000, 0xFFFF_FFFF);
        // Loader 0: both attributes interleaved, stride 16, 2 components
        regs.write_masked(reg::ATTR_LOADER_BASE, 0x0000_0100, 0xFFFF_FFFF);
        regs.write_masked(reg::ATTR_LOADER_BASE + 1, 0x0000_0010, 0xFFFF_FFFF);
        regs.write_masked(reg::ATTR_LOADER_BASE + 2, 0x2010_0000, 0xFFFF_FFFF);
        let layout = VertexLayout::decode(&regs);
        assert_eq!(layout.count, 2);
        assert_eq!(
            layout.sources[0],
            AttrSource::Array {
                loader_offset: 0x100,
                byte_offset: 0,
                stride: 16,
                ty: 3,
                components: 3,
            }
        );
        assert_eq!(
            layout.sources[1],
            AttrSource::Array {
                loader_offset: 0x100,
                byte_offset: 12,
                stride: 16,
                ty: 1,
                components: 4,
            }
        );
    }

    #[test]
    fn test_fixed_mask_overrides_loader() {
        let mut regs = Registers::new();
        regs.write_masked(reg::ATTR_FORMAT_LOW, 0x0000_000B, 0xFFFF_FFFF);
        // Attribute 0 fixed (bit 16 of the high word), one attribute
        regs.write_masked(reg::ATTR_FORMAT_HIGH, 0x0001_0000, 0xFFFF_FFFF);
        regs.write_masked(reg::ATTR_LOADER_BASE + 2, 0x1004_0000, 0xFFFF_FFFF);
        let layout = VertexLayout::decode(&regs);
        assert_eq!(layout.sources[0], AttrSource::Fixed);
    }
}
