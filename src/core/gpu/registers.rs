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

//! GPU internal register file
//!
//! The GPU is programmed through ~1024 addressable 32-bit registers. Most of
//! them are plain configuration latches; a few have side effects (draw
//! triggers, shader program upload ports, IRQ request) which are dispatched
//! by the command processor, not here.
//!
//! Every write carries a byte-enable mask from the command header and is
//! additionally clamped to the register's architecturally defined bit width:
//! bits outside a register's declared mask never change, so a partial write
//! to a packed register cannot disturb neighbouring sub-fields.

/// Number of addressable registers
pub const NUM_REGS: usize = 0x400;

/// Register index constants
///
/// Indices follow the console's documented internal register map, grouped by
/// functional block. Only registers the core implements are named; writes to
/// unnamed indices are stored but have no effect.
pub mod reg {
    /// Request a command-list IRQ; the written value feeds the autostop comparator
    pub const TRIGGER_IRQ: u16 = 0x010;
    /// Autostop comparator reference value
    pub const IRQ_AUTOSTOP_CMP: u16 = 0x011;
    /// Autostop comparator mask, bit 31 enables the comparator
    pub const IRQ_AUTOSTOP_MASK: u16 = 0x012;

    // Rasterizer configuration
    /// Face culling mode (2 bits)
    pub const CULL_FACE: u16 = 0x040;
    /// Viewport half-width, float24
    pub const VIEWPORT_WIDTH: u16 = 0x041;
    /// Viewport half-height, float24
    pub const VIEWPORT_HEIGHT: u16 = 0x043;
    /// Scanline step size, float24; raw 0 means 1.0
    pub const RASTER_STEP: u16 = 0x045;
    /// Depth range scale, float24
    pub const DEPTH_SCALE: u16 = 0x04D;
    /// Depth range offset, float24
    pub const DEPTH_OFFSET: u16 = 0x04E;
    /// Number of mapped shader output registers minus one (3 bits)
    pub const OUTPUT_MAP_TOTAL: u16 = 0x04F;
    /// Output register semantic map, one word per output register (7 words)
    pub const OUTPUT_MAP_BASE: u16 = 0x050;
    /// Viewport corner: x in bits 0-9, y in bits 16-25
    pub const VIEWPORT_CORNER: u16 = 0x068;

    // Texturing
    /// Texture unit enable bits: 0 = unit 0, 1 = unit 1, 2 = unit 2
    pub const TEX_ENABLE: u16 = 0x080;
    /// Unit 0: border color (RGBA8, ABGR word order)
    pub const TEX0_BORDER: u16 = 0x081;
    /// Unit 0: height in bits 0-10, width in bits 16-26
    pub const TEX0_DIM: u16 = 0x082;
    /// Unit 0: wrap T bits 8-10, wrap S bits 12-14
    pub const TEX0_PARAM: u16 = 0x083;
    /// Unit 0: physical address >> 3
    pub const TEX0_ADDR: u16 = 0x085;
    /// Unit 0: pixel format (4 bits)
    pub const TEX0_FORMAT: u16 = 0x08E;
    pub const TEX1_BORDER: u16 = 0x091;
    pub const TEX1_DIM: u16 = 0x092;
    pub const TEX1_PARAM: u16 = 0x093;
    pub const TEX1_ADDR: u16 = 0x095;
    pub const TEX1_FORMAT: u16 = 0x096;
    pub const TEX2_BORDER: u16 = 0x099;
    pub const TEX2_DIM: u16 = 0x09A;
    pub const TEX2_PARAM: u16 = 0x09B;
    pub const TEX2_ADDR: u16 = 0x09D;
    pub const TEX2_FORMAT: u16 = 0x09E;

    // Texture combiner (6 stages of 5 words each, with a gap after stage 3)
    /// Stage bases; each stage occupies SOURCES/OPERANDS/MODES/CONST/SCALE
    pub const TEV_STAGE_BASE: [u16; 6] = [0x0C0, 0x0C8, 0x0D0, 0x0D8, 0x0F0, 0x0F8];
    /// Combiner-buffer update mask: RGB bits 8-11, alpha bits 12-15
    /// (stages 1-4; the remaining bits are reserved)
    pub const TEV_BUFFER_INPUT: u16 = 0x0E0;
    /// Combiner-buffer initial color (RGBA8)
    pub const TEV_BUFFER_COLOR: u16 = 0x0FD;

    // Output merger
    /// Bit 8: 1 = blend, 0 = logic op (logic ops are decoded but unsupported)
    pub const COLOR_OPERATION: u16 = 0x100;
    /// Blend equations and factors
    pub const BLEND_FUNC: u16 = 0x101;
    pub const LOGIC_OP: u16 = 0x102;
    /// Constant blend color (RGBA8)
    pub const BLEND_COLOR: u16 = 0x103;
    /// Alpha test: enable bit 0, function bits 4-6, reference bits 8-15
    pub const ALPHA_TEST: u16 = 0x104;
    /// Stencil test: enable, function, write mask, reference, input mask
    pub const STENCIL_TEST: u16 = 0x105;
    /// Stencil operations: fail, depth-fail, depth-pass
    pub const STENCIL_OP: u16 = 0x106;
    /// Depth test enable/function, color write mask, depth write enable
    pub const DEPTH_COLOR_MASK: u16 = 0x107;

    // Framebuffer
    /// Depth/stencil buffer pixel format
    pub const DEPTH_FORMAT: u16 = 0x116;
    /// Color buffer pixel format (bits 16-18)
    pub const COLOR_FORMAT: u16 = 0x117;
    /// Depth/stencil buffer physical address >> 3
    pub const DEPTH_ADDR: u16 = 0x11C;
    /// Color buffer physical address >> 3
    pub const COLOR_ADDR: u16 = 0x11D;
    /// Width in bits 0-10, height-1 in bits 12-21
    pub const FB_DIM: u16 = 0x11E;

    // Geometry pipeline: attribute arrays and draw triggers
    /// Attribute array base physical address >> 3
    pub const ATTR_BASE: u16 = 0x200;
    /// Attribute formats, low word: 4 bits per attribute
    pub const ATTR_FORMAT_LOW: u16 = 0x201;
    /// Attribute formats high word, fixed-attribute mask (16-27),
    /// attribute count minus one (28-31)
    pub const ATTR_FORMAT_HIGH: u16 = 0x202;
    /// 12 loaders of 3 words each: offset, component map low, component map
    /// high + bytes-per-vertex (16-23) + component count (28-31)
    pub const ATTR_LOADER_BASE: u16 = 0x203;
    /// Index buffer: offset from ATTR_BASE in bits 0-27, format in bit 31
    /// (0 = u8, 1 = u16)
    pub const INDEX_ARRAY: u16 = 0x227;
    /// Vertex count for the next draw
    pub const NUM_VERTICES: u16 = 0x228;
    /// Geometry shader stage enable (bit 0)
    pub const USE_GS: u16 = 0x229;
    /// First vertex index for draw-arrays
    pub const VERTEX_OFFSET: u16 = 0x22A;
    /// Writing any value triggers a draw-arrays batch
    pub const TRIGGER_DRAW: u16 = 0x22E;
    /// Writing any value triggers a draw-elements batch
    pub const TRIGGER_DRAW_INDEXED: u16 = 0x22F;
    /// Fixed attribute select: 0-15 = slot, 0xF = immediate vertex submission
    pub const FIXED_ATTR_INDEX: u16 = 0x232;
    /// Fixed attribute data port, three words per vector
    pub const FIXED_ATTR_DATA0: u16 = 0x233;
    pub const FIXED_ATTR_DATA1: u16 = 0x234;
    pub const FIXED_ATTR_DATA2: u16 = 0x235;
    /// Command buffer sizes in words (two channels)
    pub const CMD_BUF_SIZE0: u16 = 0x238;
    pub const CMD_BUF_SIZE1: u16 = 0x239;
    /// Command buffer physical addresses >> 3
    pub const CMD_BUF_ADDR0: u16 = 0x23A;
    pub const CMD_BUF_ADDR1: u16 = 0x23B;
    /// Writing jumps the command cursor to the corresponding buffer
    pub const CMD_BUF_JUMP0: u16 = 0x23C;
    pub const CMD_BUF_JUMP1: u16 = 0x23D;
    /// Primitive topology in bits 8-9
    pub const PRIMITIVE_CONFIG: u16 = 0x25E;
    /// Writing resets the primitive reassembly window
    pub const RESTART_PRIMITIVE: u16 = 0x25F;

    // Geometry shader uniforms and program (block at 0x280)
    pub const GS_BOOL_UNIFORMS: u16 = 0x280;
    pub const GS_INT_UNIFORMS: u16 = 0x281; // 4 words
    /// Geometry input count minus one (bits 0-3)
    pub const GS_CONFIG: u16 = 0x289;
    pub const GS_ENTRY_POINT: u16 = 0x28A;
    pub const GS_INPUT_MAP_LOW: u16 = 0x28B;
    pub const GS_INPUT_MAP_HIGH: u16 = 0x28C;
    pub const GS_FLOAT_INDEX: u16 = 0x290;
    pub const GS_FLOAT_DATA: u16 = 0x291; // 8 words
    pub const GS_CODE_OFFSET: u16 = 0x29B;
    pub const GS_CODE_DATA: u16 = 0x29C; // 8 words
    pub const GS_SWIZZLE_OFFSET: u16 = 0x2A5;
    pub const GS_SWIZZLE_DATA: u16 = 0x2A6; // 8 words

    // Vertex shader uniforms and program (block at 0x2B0, same layout)
    pub const VS_BOOL_UNIFORMS: u16 = 0x2B0;
    pub const VS_INT_UNIFORMS: u16 = 0x2B1; // 4 words
    pub const VS_ENTRY_POINT: u16 = 0x2BA;
    pub const VS_INPUT_MAP_LOW: u16 = 0x2BB;
    pub const VS_INPUT_MAP_HIGH: u16 = 0x2BC;
    pub const VS_FLOAT_INDEX: u16 = 0x2C0;
    pub const VS_FLOAT_DATA: u16 = 0x2C1; // 8 words
    pub const VS_CODE_OFFSET: u16 = 0x2CB;
    pub const VS_CODE_DATA: u16 = 0x2CC; // 8 words
    pub const VS_SWIZZLE_OFFSET: u16 = 0x2D5;
    pub const VS_SWIZZLE_DATA: u16 = 0x2D6; // 8 words
}

/// Whether an index falls inside one of the documented register blocks
///
/// Writes outside these ranges are still latched (the slot exists) but have
/// no architectural meaning; the command processor logs them.
pub fn is_defined(id: u16) -> bool {
    matches!(
        id & 0x3FF,
        0x010..=0x012
            | 0x040..=0x068
            | 0x080..=0x09E
            | 0x0C0..=0x0FF
            | 0x100..=0x107
            | 0x110..=0x11E
            | 0x200..=0x23D
            | 0x25E..=0x25F
            | 0x280..=0x2DD
    )
}

/// Byte-enable lookup table indexed by the 4-bit selector in a command header
///
/// Selector bit *n* enables byte *n* of the 32-bit write.
pub const BYTE_ENABLE: [u32; 16] = build_byte_enable();

const fn build_byte_enable() -> [u32; 16] {
    let mut table = [0u32; 16];
    let mut sel = 0;
    while sel < 16 {
        let mut mask = 0u32;
        let mut byte = 0;
        while byte < 4 {
            if sel & (1 << byte) != 0 {
                mask |= 0xFF << (byte * 8);
            }
            byte += 1;
        }
        table[sel] = mask;
        sel += 1;
    }
    table
}

/// Architecturally defined write mask per register slot
///
/// Defaults to all 32 bits; registers with documented narrower widths get
/// their specific mask so partial writes cannot spill into reserved bits.
/// Several registers carry bits labelled "unused" in the reference behavior;
/// those stay out of the mask rather than being guessed at.
static SLOT_MASKS: [u32; NUM_REGS] = build_slot_masks();

const fn build_slot_masks() -> [u32; NUM_REGS] {
    let mut m = [0xFFFF_FFFFu32; NUM_REGS];
    m[reg::CULL_FACE as usize] = 0x0000_0003;
    m[reg::VIEWPORT_WIDTH as usize] = 0x00FF_FFFF;
    m[reg::VIEWPORT_HEIGHT as usize] = 0x00FF_FFFF;
    m[reg::RASTER_STEP as usize] = 0x00FF_FFFF;
    m[reg::DEPTH_SCALE as usize] = 0x00FF_FFFF;
    m[reg::DEPTH_OFFSET as usize] = 0x00FF_FFFF;
    m[reg::OUTPUT_MAP_TOTAL as usize] = 0x0000_0007;
    m[reg::VIEWPORT_CORNER as usize] = 0x03FF_03FF;
    m[reg::TEX_ENABLE as usize] = 0x0000_0007;
    m[reg::TEX0_DIM as usize] = 0x07FF_07FF;
    m[reg::TEX1_DIM as usize] = 0x07FF_07FF;
    m[reg::TEX2_DIM as usize] = 0x07FF_07FF;
    m[reg::TEX0_FORMAT as usize] = 0x0000_000F;
    m[reg::TEX1_FORMAT as usize] = 0x0000_000F;
    m[reg::TEX2_FORMAT as usize] = 0x0000_000F;
    m[reg::COLOR_FORMAT as usize] = 0x0007_0003;
    m[reg::DEPTH_FORMAT as usize] = 0x0000_0003;
    m[reg::FB_DIM as usize] = 0x003F_FFFF;
    m[reg::NUM_VERTICES as usize] = 0x00FF_FFFF;
    m[reg::USE_GS as usize] = 0x0000_0003;
    m[reg::FIXED_ATTR_INDEX as usize] = 0x0000_000F;
    m[reg::PRIMITIVE_CONFIG as usize] = 0x0000_0300;
    m[reg::GS_CONFIG as usize] = 0x0000_000F;
    m[reg::GS_BOOL_UNIFORMS as usize] = 0x0000_FFFF;
    m[reg::VS_BOOL_UNIFORMS as usize] = 0x0000_FFFF;
    m[reg::GS_ENTRY_POINT as usize] = 0x0000_01FF;
    m[reg::VS_ENTRY_POINT as usize] = 0x0000_01FF;
    m
}

/// The GPU register file: 1024 x 32-bit latches plus per-slot write masks
pub struct Registers {
    raw: [u32; NUM_REGS],
}

impl Registers {
    pub fn new() -> Self {
        Self {
            raw: [0; NUM_REGS],
        }
    }

    /// Read a register value
    ///
    /// Undefined IDs read as zero (the slot exists, it just has no meaning).
    #[inline]
    pub fn read(&self, id: u16) -> u32 {
        self.raw[(id as usize) & (NUM_REGS - 1)]
    }

    /// Write a register through a byte-enable mask
    ///
    /// The effective change is `value & byte_enable & slot_mask`; bits
    /// outside either mask keep their previous contents. Returns the new
    /// register value so side-effect handlers can act on the merged result.
    #[inline]
    pub fn write_masked(&mut self, id: u16, value: u32, byte_enable: u32) -> u32 {
        let idx = (id as usize) & (NUM_REGS - 1);
        let mask = byte_enable & SLOT_MASKS[idx];
        let merged = (self.raw[idx] & !mask) | (value & mask);
        self.raw[idx] = merged;
        merged
    }

    /// The architecturally defined write mask for a slot
    #[inline]
    pub fn slot_mask(id: u16) -> u32 {
        SLOT_MASKS[(id as usize) & (NUM_REGS - 1)]
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_enable_table() {
        assert_eq!(BYTE_ENABLE[0x0], 0x0000_0000);
        assert_eq!(BYTE_ENABLE[0x1], 0x0000_00FF);
        assert_eq!(BYTE_ENABLE[0x2], 0x0000_FF00);
        assert_eq!(BYTE_ENABLE[0x8], 0xFF00_0000);
        assert_eq!(BYTE_ENABLE[0xF], 0xFFFF_FFFF);
        assert_eq!(BYTE_ENABLE[0x5], 0x00FF_00FF);
    }

    #[test]
    fn test_masked_write_preserves_other_bytes() {
        let mut regs = Registers::new();
        regs.write_masked(0x300, 0xAABB_CCDD, 0xFFFF_FFFF);
        regs.write_masked(0x300, 0x1122_3344, 0x0000_FF00);
        assert_eq!(regs.read(0x300), 0xAABB_33DD);
    }

    #[test]
    fn test_slot_mask_clamps_write() {
        let mut regs = Registers::new();
        // CULL_FACE only implements 2 bits
        regs.write_masked(reg::CULL_FACE, 0xFFFF_FFFF, 0xFFFF_FFFF);
        assert_eq!(regs.read(reg::CULL_FACE), 0x3);
    }

    #[test]
    fn test_defined_ranges() {
        assert!(is_defined(reg::TRIGGER_IRQ));
        assert!(is_defined(reg::VS_SWIZZLE_DATA + 7));
        assert!(!is_defined(0x000));
        assert!(!is_defined(0x300));
        assert!(!is_defined(0x3FF));
    }

    #[test]
    fn test_id_wraps_at_1024() {
        let mut regs = Registers::new();
        regs.write_masked(0x400, 0x1234, 0xFFFF_FFFF);
        assert_eq!(regs.read(0x000), 0x1234);
    }
}
