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

//! 3D GPU core
//!
//! The GPU is driven entirely through its register file: direct MMIO-style
//! writes via [`Gpu::write_register`], or batched command lists fetched from
//! guest memory via [`Gpu::submit_command_list`]. A handful of registers have
//! side effects (draw triggers, shader upload ports, IRQ request); everything
//! else is passive configuration consumed when a draw is kicked off.
//!
//! Execution can run inline on the caller's thread or on a dedicated worker
//! ([`Gpu::new_threaded`]); both modes produce byte-identical framebuffer
//! contents because all register state lives with the execution side and
//! commands are applied in FIFO order.

pub mod cmd;
pub mod float;
pub mod registers;
pub mod render;
pub mod shader;

#[cfg(test)]
mod tests;

use crate::core::context::HwContext;
use crate::core::error::GpuError;
use crate::core::interrupt::GpuInterrupt;
use cmd::decode::{CommandCursor, CommandPacket};
use cmd::threading::{ThreadedCore, WorkItem};
use float::float24_to_f32;
use registers::{reg, Registers};
use render::state::{
    AlphaTest, BlendConfig, ColorFormat, CullMode, DepthColorMask, DepthFormat,
    FramebufferConfig, PrimitiveTopology, StencilConfig, TevStage, TextureConfig, TextureFormat,
    Viewport, WrapMode,
};
use render::sw::SoftwareRenderer;
use render::{PipelineState, PrimitiveAssembler, RenderBackend, VertexCache};
use shader::{unpack_float24_vector, ShaderSetup, ShaderUnit, Vec4};

/// Register state and execution engine
///
/// Owns everything a draw needs: the register file, both shader setup banks,
/// fixed attributes, primitive assembly state, and the render backend. Lives
/// either inline inside [`Gpu`] or on a worker thread.
pub struct GpuCore {
    pub(in crate::core::gpu) regs: Registers,
    pub(in crate::core::gpu) vs: ShaderSetup,
    pub(in crate::core::gpu) gs: ShaderSetup,
    /// Fixed attribute bank; slots not covered by loaders read from here
    pub(in crate::core::gpu) fixed_attrs: [Vec4; 16],
    fixed_select: u32,
    fixed_buffer: [u32; 3],
    fixed_buffered: usize,
    /// Accumulated immediate-mode attribute vectors
    pub(in crate::core::gpu) immediate: Vec<Vec4>,
    pub(in crate::core::gpu) assembler: PrimitiveAssembler,
    pub(in crate::core::gpu) vertex_cache: VertexCache,
    pub(in crate::core::gpu) unit: ShaderUnit,
    pub(in crate::core::gpu) backend: Box<dyn RenderBackend>,
    pub(in crate::core::gpu) ctx: HwContext,
}

impl GpuCore {
    pub fn new(ctx: HwContext, backend: Box<dyn RenderBackend>) -> Self {
        Self {
            regs: Registers::new(),
            vs: ShaderSetup::new(),
            gs: ShaderSetup::new(),
            fixed_attrs: [[0.0; 4]; 16],
            fixed_select: 0,
            fixed_buffer: [0; 3],
            fixed_buffered: 0,
            immediate: Vec::new(),
            assembler: PrimitiveAssembler::new(PrimitiveTopology::List),
            vertex_cache: VertexCache::new(),
            unit: ShaderUnit::new(),
            backend,
            ctx,
        }
    }

    #[inline]
    pub fn read_reg(&self, id: u16) -> u32 {
        self.regs.read(id)
    }

    /// Apply one decoded command packet
    pub fn apply_packet(&mut self, packet: &CommandPacket) {
        let mut id = packet.id;
        for &value in &packet.values {
            self.write_reg(id, value, packet.mask);
            if packet.consecutive {
                // Register IDs wrap within the 10-bit file
                id = id.wrapping_add(1) & 0x3FF;
            }
        }
    }

    /// Write a register through a byte-enable mask and run its side effect
    pub fn write_reg(&mut self, id: u16, value: u32, byte_enable: u32) {
        if !registers::is_defined(id) {
            log::warn!("write to undefined GPU register {:#05X}", id & 0x3FF);
        }
        let merged = self.regs.write_masked(id, value, byte_enable);

        match id {
            reg::TRIGGER_IRQ => {
                self.ctx.interrupts.raise(GpuInterrupt::CommandList);
            }
            reg::PRIMITIVE_CONFIG | reg::RESTART_PRIMITIVE => {
                let topology =
                    PrimitiveTopology::from_raw(self.regs.read(reg::PRIMITIVE_CONFIG) >> 8);
                self.assembler.reset(topology);
                self.immediate.clear();
            }
            reg::TRIGGER_DRAW => {
                cmd::draw::draw_arrays(self);
            }
            reg::TRIGGER_DRAW_INDEXED => {
                cmd::draw::draw_elements(self);
            }
            reg::FIXED_ATTR_INDEX => {
                self.fixed_select = merged & 0xF;
                self.fixed_buffered = 0;
            }
            reg::FIXED_ATTR_DATA0 | reg::FIXED_ATTR_DATA1 | reg::FIXED_ATTR_DATA2 => {
                self.push_fixed_word(merged);
            }
            _ => {
                if (reg::VS_BOOL_UNIFORMS..=reg::VS_SWIZZLE_DATA + 7).contains(&id) {
                    shader_port_write(&mut self.vs, id - reg::VS_BOOL_UNIFORMS, merged);
                } else if (reg::GS_BOOL_UNIFORMS..=reg::GS_SWIZZLE_DATA + 7).contains(&id) {
                    shader_port_write(&mut self.gs, id - reg::GS_BOOL_UNIFORMS, merged);
                }
            }
        }
    }

    /// Accumulate one word of a fixed-attribute vector
    ///
    /// Three words carry a packed float24 4-vector. A full vector lands in
    /// the selected fixed attribute slot, or, with the immediate sentinel
    /// selected, becomes the next immediate-mode vertex attribute.
    fn push_fixed_word(&mut self, word: u32) {
        self.fixed_buffer[self.fixed_buffered] = word;
        self.fixed_buffered += 1;
        if self.fixed_buffered < 3 {
            return;
        }
        self.fixed_buffered = 0;

        let [w0, w1, w2] = self.fixed_buffer;
        let vector = unpack_float24_vector(&[w0, w1, w2, 0]);

        if self.fixed_select == 0xF {
            cmd::draw::submit_immediate(self, vector);
        } else {
            self.fixed_attrs[self.fixed_select as usize] = vector;
            self.fixed_select = (self.fixed_select + 1) & 0xF;
        }
    }

    /// Rebuild the backend's pipeline state from the register file
    pub(in crate::core::gpu) fn sync_backend_state(&mut self) {
        let r = &self.regs;
        let mut state = PipelineState {
            cull_mode: CullMode::from_raw(r.read(reg::CULL_FACE)),
            viewport: Viewport {
                x: (r.read(reg::VIEWPORT_CORNER) & 0x3FF) as i32,
                y: ((r.read(reg::VIEWPORT_CORNER) >> 16) & 0x3FF) as i32,
                half_width: float24_to_f32(r.read(reg::VIEWPORT_WIDTH)),
                half_height: float24_to_f32(r.read(reg::VIEWPORT_HEIGHT)),
                depth_scale: float24_to_f32(r.read(reg::DEPTH_SCALE)),
                depth_offset: float24_to_f32(r.read(reg::DEPTH_OFFSET)),
            },
            depth_color: DepthColorMask::from_raw(r.read(reg::DEPTH_COLOR_MASK)),
            alpha_test: AlphaTest::from_raw(r.read(reg::ALPHA_TEST)),
            stencil: StencilConfig::from_raw(
                r.read(reg::STENCIL_TEST),
                r.read(reg::STENCIL_OP),
            ),
            blend: BlendConfig::from_raw(
                r.read(reg::BLEND_FUNC),
                r.read(reg::BLEND_COLOR),
                r.read(reg::COLOR_OPERATION) & 0x100 != 0,
            ),
            framebuffer: FramebufferConfig {
                color_address: r.read(reg::COLOR_ADDR) << 3,
                depth_address: r.read(reg::DEPTH_ADDR) << 3,
                width: r.read(reg::FB_DIM) & 0x7FF,
                height: ((r.read(reg::FB_DIM) >> 12) & 0x3FF) + 1,
                color_format: ColorFormat::from_raw(r.read(reg::COLOR_FORMAT) >> 16),
                depth_format: DepthFormat::from_raw(r.read(reg::DEPTH_FORMAT)),
            },
            tev_buffer_color: r.read(reg::TEV_BUFFER_COLOR).to_le_bytes(),
            tev_buffer_rgb_mask: ((r.read(reg::TEV_BUFFER_INPUT) >> 8) & 0xF) as u8,
            tev_buffer_alpha_mask: ((r.read(reg::TEV_BUFFER_INPUT) >> 12) & 0xF) as u8,
            raster_step: float24_to_f32(r.read(reg::RASTER_STEP)).max(0.0) as u32,
            ..Default::default()
        };

        let enable = r.read(reg::TEX_ENABLE);
        let units = [
            (reg::TEX0_BORDER, reg::TEX0_DIM, reg::TEX0_PARAM, reg::TEX0_ADDR, reg::TEX0_FORMAT),
            (reg::TEX1_BORDER, reg::TEX1_DIM, reg::TEX1_PARAM, reg::TEX1_ADDR, reg::TEX1_FORMAT),
            (reg::TEX2_BORDER, reg::TEX2_DIM, reg::TEX2_PARAM, reg::TEX2_ADDR, reg::TEX2_FORMAT),
        ];
        for (unit, (border, dim, param, addr, format)) in units.iter().enumerate() {
            let dim = r.read(*dim);
            let param = r.read(*param);
            state.textures[unit] = TextureConfig {
                enabled: enable & (1 << unit) != 0,
                address: r.read(*addr) << 3,
                height: dim & 0x7FF,
                width: (dim >> 16) & 0x7FF,
                wrap_t: WrapMode::from_raw((param >> 8) & 0x7),
                wrap_s: WrapMode::from_raw((param >> 12) & 0x7),
                format: TextureFormat::from_raw(r.read(*format)),
                border: r.read(*border).to_le_bytes(),
            };
        }

        for (stage, base) in reg::TEV_STAGE_BASE.iter().enumerate() {
            let words = [
                r.read(*base),
                r.read(base + 1),
                r.read(base + 2),
                r.read(base + 3),
                r.read(base + 4),
            ];
            state.tev_stages[stage] = TevStage::from_regs(&words);
        }

        self.backend.sync_state(&state);
    }
}

/// Dispatch a write inside a shader register block to the setup ports
///
/// Both shader stages use the same internal layout, so `offset` is the id
/// relative to the block's boolean-uniform register.
fn shader_port_write(setup: &mut ShaderSetup, offset: u16, value: u32) {
    match offset {
        0x00 => setup.bool_uniforms = value as u16,
        0x01..=0x04 => setup.int_uniforms[(offset - 1) as usize] = value.to_le_bytes(),
        0x0A => setup.entry_point = (value & 0x1FF) as u16,
        0x10 => setup.set_float_index(value),
        0x11..=0x18 => setup.write_float_word(value),
        0x1B => setup.set_code_offset(value),
        0x1C..=0x23 => setup.write_code_word(value),
        0x25 => setup.set_swizzle_offset(value),
        0x26..=0x2D => setup.write_swizzle_word(value),
        _ => {}
    }
}

/// Where the core executes
enum Exec {
    Inline(Box<GpuCore>),
    Threaded(ThreadedCore),
}

impl Exec {
    fn apply(&mut self, packet: CommandPacket) {
        match self {
            Exec::Inline(core) => core.apply_packet(&packet),
            Exec::Threaded(tc) => tc.push(WorkItem::Apply(packet)),
        }
    }

    fn call<R, F>(&mut self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut GpuCore) -> R + Send + 'static,
    {
        match self {
            Exec::Inline(core) => f(core),
            Exec::Threaded(tc) => tc.call(f),
        }
    }

    fn sync(&self) {
        if let Exec::Threaded(tc) = self {
            tc.sync();
        }
    }
}

/// Public GPU handle
///
/// Command decoding always happens on the caller's thread; register state
/// and drawing run wherever the core lives.
pub struct Gpu {
    exec: Exec,
    ctx: HwContext,
    cursor: CommandCursor,
}

impl Gpu {
    /// A GPU executing inline, drawing with the software rasterizer
    pub fn new(ctx: HwContext) -> Self {
        Self::with_backend(ctx, Box::new(SoftwareRenderer::new()))
    }

    /// A GPU executing inline with a caller-provided backend
    pub fn with_backend(ctx: HwContext, backend: Box<dyn RenderBackend>) -> Self {
        Self {
            exec: Exec::Inline(Box::new(GpuCore::new(ctx.clone(), backend))),
            ctx,
            cursor: CommandCursor::stopped(),
        }
    }

    /// A GPU whose core runs on a dedicated worker thread
    pub fn new_threaded(ctx: HwContext) -> Result<Self, GpuError> {
        Self::new_threaded_with_backend(ctx, Box::new(SoftwareRenderer::new()))
    }

    pub fn new_threaded_with_backend(
        ctx: HwContext,
        backend: Box<dyn RenderBackend>,
    ) -> Result<Self, GpuError> {
        let core = GpuCore::new(ctx.clone(), backend);
        Ok(Self {
            exec: Exec::Threaded(ThreadedCore::spawn(core)?),
            ctx,
            cursor: CommandCursor::stopped(),
        })
    }

    /// Write one register with all bytes enabled
    pub fn write_register(&mut self, id: u16, value: u32) {
        self.exec.apply(CommandPacket {
            id,
            mask: 0xFFFF_FFFF,
            values: vec![value],
            consecutive: false,
        });
    }

    /// Read a register's current value
    ///
    /// Ordered after all previously submitted writes.
    pub fn read_register(&mut self, id: u16) -> u32 {
        self.exec.call(move |core| core.read_reg(id))
    }

    /// Process a command list of `size_words` words at `addr`
    ///
    /// Returns when the whole list (including any chained jumps) has been
    /// decoded and dispatched; with a worker thread, execution may still be
    /// in flight until [`Gpu::sync`].
    pub fn submit_command_list(&mut self, addr: u32, size_words: u32) {
        self.cursor.aim(addr, size_words);
        self.process_commands();
    }

    /// Block until all dispatched work has executed
    pub fn sync(&self) {
        self.exec.sync();
    }

    /// Run a closure against the core, after all pending work
    pub fn with_core<R, F>(&mut self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut GpuCore) -> R + Send + 'static,
    {
        self.exec.call(f)
    }

    fn process_commands(&mut self) {
        let mem = self.ctx.memory.clone();
        while let Some(packet) = self.cursor.next(mem.as_ref()) {
            let irq_value = packet_value_for(&packet, reg::TRIGGER_IRQ);
            let jump0 = packet_value_for(&packet, reg::CMD_BUF_JUMP0).is_some();
            let jump1 = packet_value_for(&packet, reg::CMD_BUF_JUMP1).is_some();

            self.exec.apply(packet);

            // Control-transfer registers act on the decode side, so the
            // queue must drain before their outcome can be observed.
            if irq_value.is_some() || jump0 || jump1 {
                self.exec.sync();

                if let Some(value) = irq_value {
                    if self.autostop_matches(value) {
                        log::debug!("command list autostop on IRQ value {value:#010X}");
                        self.cursor.stop();
                        return;
                    }
                }
                if jump0 || jump1 {
                    let (addr_reg, size_reg) = if jump0 {
                        (reg::CMD_BUF_ADDR0, reg::CMD_BUF_SIZE0)
                    } else {
                        (reg::CMD_BUF_ADDR1, reg::CMD_BUF_SIZE1)
                    };
                    let addr = self.read_register(addr_reg) << 3;
                    let size = self.read_register(size_reg);
                    log::debug!("command list jump to {addr:#010X} ({size} words)");
                    self.cursor.aim(addr, size);
                }
            }
        }
    }

    fn autostop_matches(&mut self, written: u32) -> bool {
        let mask = self.read_register(reg::IRQ_AUTOSTOP_MASK);
        if mask & 0x8000_0000 == 0 {
            return false;
        }
        let compare = self.read_register(reg::IRQ_AUTOSTOP_CMP);
        let mask = mask & 0x7FFF_FFFF;
        written & mask == compare & mask
    }
}

/// The value a packet writes to `target`, if it touches it
fn packet_value_for(packet: &CommandPacket, target: u16) -> Option<u32> {
    if packet.consecutive {
        // Consecutive ids wrap within the 10-bit file
        let offset = (target.wrapping_sub(packet.id) & 0x3FF) as usize;
        packet.values.get(offset).copied()
    } else if packet.id == target {
        packet.values.last().copied()
    } else {
        None
    }
}
