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

//! Shader processor state
//!
//! The GPU runs vertex and geometry programs on a unified shader processor: a
//! SIMD-like vector machine over 16 input, 16 temporary, and 16 output
//! 4-component float registers. Programs, operand descriptors, and the
//! uniform banks are persistent ([`ShaderSetup`], one instance per shader
//! stage, uploaded through register ports); everything else
//! ([`ShaderUnit`]) is reset at the start of every invocation.
//!
//! Instruction execution lives in [`interpreter`].

pub mod interpreter;

pub use interpreter::{run_shader, EmitSink, NoEmit};

/// A 4-component shader vector
pub type Vec4 = [f32; 4];

/// Program memory size in instruction words
pub const PROGRAM_WORDS: usize = 512;

/// Number of operand descriptor slots
pub const SWIZZLE_WORDS: usize = 128;

/// Number of float constant vectors
pub const FLOAT_UNIFORMS: usize = 96;

/// Call stack depth
pub const CALL_STACK_DEPTH: usize = 4;

/// If stack depth
pub const IF_STACK_DEPTH: usize = 8;

/// Loop stack depth
pub const LOOP_STACK_DEPTH: usize = 4;

use crate::core::gpu::float::float24_to_f32;

/// Persistent per-stage shader configuration
///
/// One instance exists for the vertex stage and one for the geometry stage;
/// geometry invocations run against the geometry bank and never alias the
/// vertex bank. Contents survive across invocations until rewritten through
/// the upload ports.
pub struct ShaderSetup {
    /// Program memory
    pub program: [u32; PROGRAM_WORDS],
    /// Operand descriptors (swizzle + negate + write mask)
    pub swizzle: [u32; SWIZZLE_WORDS],
    /// Float constant registers c0-c95
    pub float_uniforms: [Vec4; FLOAT_UNIFORMS],
    /// Integer uniforms i0-i3: x, y, z used by LOOP, w reserved
    pub int_uniforms: [[u8; 4]; 4],
    /// Boolean uniforms b0-b15, one bit each
    pub bool_uniforms: u16,
    /// First instruction of an invocation
    pub entry_point: u16,
    /// Execution stops when the program counter reaches this address
    pub end_point: u16,

    // Upload cursors for the register ports
    pub(crate) code_cursor: usize,
    pub(crate) swizzle_cursor: usize,
    pub(crate) float_cursor: usize,
    pub(crate) float_f32_mode: bool,
    pub(crate) float_buffer: [u32; 4],
    pub(crate) float_buffered: usize,
}

impl ShaderSetup {
    pub fn new() -> Self {
        Self {
            program: [0; PROGRAM_WORDS],
            swizzle: [0; SWIZZLE_WORDS],
            float_uniforms: [[0.0; 4]; FLOAT_UNIFORMS],
            int_uniforms: [[0; 4]; 4],
            bool_uniforms: 0,
            entry_point: 0,
            end_point: PROGRAM_WORDS as u16,
            code_cursor: 0,
            swizzle_cursor: 0,
            float_cursor: 0,
            float_f32_mode: false,
            float_buffer: [0; 4],
            float_buffered: 0,
        }
    }

    /// Set the program upload cursor
    pub fn set_code_offset(&mut self, offset: u32) {
        self.code_cursor = (offset as usize) % PROGRAM_WORDS;
    }

    /// Append one instruction word at the upload cursor
    pub fn write_code_word(&mut self, word: u32) {
        self.program[self.code_cursor] = word;
        self.code_cursor = (self.code_cursor + 1) % PROGRAM_WORDS;
    }

    /// Set the operand-descriptor upload cursor
    pub fn set_swizzle_offset(&mut self, offset: u32) {
        self.swizzle_cursor = (offset as usize) % SWIZZLE_WORDS;
    }

    /// Append one operand descriptor at the upload cursor
    pub fn write_swizzle_word(&mut self, word: u32) {
        self.swizzle[self.swizzle_cursor] = word;
        self.swizzle_cursor = (self.swizzle_cursor + 1) % SWIZZLE_WORDS;
    }

    /// Configure the float uniform port: target index in bits 0-6, bit 31
    /// selects IEEE-754 single mode over packed 24-bit floats
    pub fn set_float_index(&mut self, value: u32) {
        self.float_cursor = (value & 0x7F) as usize;
        self.float_f32_mode = value & 0x8000_0000 != 0;
        self.float_buffered = 0;
    }

    /// Feed one word to the float uniform port
    ///
    /// Words accumulate until a full vector is available: four words in f32
    /// mode, three words carrying four packed 24-bit floats otherwise. The
    /// committed vector advances the target index.
    pub fn write_float_word(&mut self, word: u32) {
        self.float_buffer[self.float_buffered] = word;
        self.float_buffered += 1;
        let needed = if self.float_f32_mode { 4 } else { 3 };
        if self.float_buffered < needed {
            return;
        }
        self.float_buffered = 0;

        let value = if self.float_f32_mode {
            // Components arrive in w, z, y, x order
            [
                f32::from_bits(self.float_buffer[3]),
                f32::from_bits(self.float_buffer[2]),
                f32::from_bits(self.float_buffer[1]),
                f32::from_bits(self.float_buffer[0]),
            ]
        } else {
            unpack_float24_vector(&self.float_buffer)
        };

        if self.float_cursor < FLOAT_UNIFORMS {
            self.float_uniforms[self.float_cursor] = value;
        } else {
            log::warn!(
                "float uniform write out of range: c{}",
                self.float_cursor
            );
        }
        self.float_cursor = (self.float_cursor + 1) % 0x80;
    }
}

impl Default for ShaderSetup {
    fn default() -> Self {
        Self::new()
    }
}

/// Unpack three 32-bit words holding four packed 24-bit floats
///
/// The hardware packs the vector most-significant-component first, so the
/// destination component order is backwards: w sits in the top bits of the
/// first word, x in the low bits of the last.
pub fn unpack_float24_vector(words: &[u32; 4]) -> Vec4 {
    let w = words[0] >> 8;
    let z = ((words[0] & 0xFF) << 16) | (words[1] >> 16);
    let y = ((words[1] & 0xFFFF) << 8) | (words[2] >> 24);
    let x = words[2] & 0xFF_FFFF;
    [
        float24_to_f32(x),
        float24_to_f32(y),
        float24_to_f32(z),
        float24_to_f32(w),
    ]
}

#[derive(Clone, Copy, Default)]
pub(crate) struct CallFrame {
    /// Return fires after executing the instruction at this address
    pub trigger: u16,
    pub return_pc: u16,
}

#[derive(Clone, Copy, Default)]
pub(crate) struct IfFrame {
    pub trigger: u16,
    pub skip_to: u16,
}

#[derive(Clone, Copy, Default)]
pub(crate) struct LoopFrame {
    /// Last instruction of the loop body
    pub trigger: u16,
    /// First instruction of the loop body
    pub body: u16,
    /// Remaining back-edges to take
    pub remaining: u32,
    /// Added to the loop counter on every back-edge
    pub step: u32,
}

/// Geometry emission state (SETEMIT / EMIT)
pub struct EmitState {
    /// Buffer slot the next EMIT writes (0-2)
    pub vertex_slot: usize,
    /// Whether the next EMIT also submits the 3-vertex buffer
    pub prim_emit: bool,
    /// Submission winding: false = as stored, true = reversed
    pub winding: bool,
    /// Three collected output register files
    pub buffer: [[Vec4; 16]; 3],
}

impl Default for EmitState {
    fn default() -> Self {
        Self {
            vertex_slot: 0,
            prim_emit: false,
            winding: false,
            buffer: [[[0.0; 4]; 16]; 3],
        }
    }
}

/// Transient execution state, reset for every shader invocation
pub struct ShaderUnit {
    /// Program counter
    pub pc: usize,
    /// Condition flags cc.x / cc.y, set by CMP
    pub cond: [bool; 2],
    /// Address registers a0.x / a0.y, set by MOVA
    pub addr: [i32; 2],
    /// Loop counter aL
    pub loop_counter: u32,
    /// Input registers v0-v15
    pub input: [Vec4; 16],
    /// Temporary registers r0-r15
    pub temp: [Vec4; 16],
    /// Output registers o0-o15
    pub output: [Vec4; 16],

    pub(crate) call_stack: [CallFrame; CALL_STACK_DEPTH],
    pub(crate) call_depth: usize,
    pub(crate) if_stack: [IfFrame; IF_STACK_DEPTH],
    pub(crate) if_depth: usize,
    pub(crate) loop_stack: [LoopFrame; LOOP_STACK_DEPTH],
    pub(crate) loop_depth: usize,

    /// Geometry emission state; unused on the vertex path
    pub emit: EmitState,
}

impl ShaderUnit {
    pub fn new() -> Self {
        Self {
            pc: 0,
            cond: [false; 2],
            addr: [0; 2],
            loop_counter: 0,
            input: [[0.0; 4]; 16],
            temp: [[0.0; 4]; 16],
            output: [[0.0; 4]; 16],
            call_stack: [CallFrame::default(); CALL_STACK_DEPTH],
            call_depth: 0,
            if_stack: [IfFrame::default(); IF_STACK_DEPTH],
            if_depth: 0,
            loop_stack: [LoopFrame::default(); LOOP_STACK_DEPTH],
            loop_depth: 0,
            emit: EmitState::default(),
        }
    }

    /// Reset the transient state, keeping the input registers
    ///
    /// Everything except the persistent [`ShaderSetup`] banks starts from
    /// scratch on each invocation.
    pub fn reset_for_run(&mut self) {
        self.pc = 0;
        self.cond = [false; 2];
        self.addr = [0; 2];
        self.loop_counter = 0;
        self.temp = [[0.0; 4]; 16];
        self.output = [[0.0; 4]; 16];
        self.call_depth = 0;
        self.if_depth = 0;
        self.loop_depth = 0;
    }
}

impl Default for ShaderUnit {
    fn default() -> Self {
        Self::new()
    }
}
