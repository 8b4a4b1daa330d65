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

//! Shader instruction interpreter
//!
//! Executes one shader invocation to completion. Instructions are 32-bit
//! words dispatched through a 64-entry table on the top 6 bits. Operands are
//! selected from inputs, temporaries, or float constants with per-component
//! swizzle, negation, and optional relative addressing; results are written
//! through a per-instruction component mask.
//!
//! # Control flow
//!
//! CALL/IF/LOOP do not store an explicit "return" instruction in the program.
//! Instead each construct pushes an end address onto its stack, and after
//! *every* executed instruction the pre-increment program counter is compared
//! against the top of all three stacks: a call-stack match pops and returns,
//! an if-stack match pops and skips, a loop-stack match either takes the back
//! edge (decrementing the iteration count) or pops. All three checks run
//! every cycle because differently-typed constructs may end on the same
//! address.
//!
//! # Numeric rules
//!
//! The multiply primitive returns exact zero whenever either factor is zero,
//! even if the other factor is an infinity or NaN. This deviates from
//! IEEE-754 and is relied upon by real shader programs.

use super::{
    CallFrame, IfFrame, LoopFrame, ShaderSetup, ShaderUnit, Vec4, IF_STACK_DEPTH,
    LOOP_STACK_DEPTH, PROGRAM_WORDS, SWIZZLE_WORDS,
};

/// Cycle budget per invocation; a program still running after this many
/// instructions is assumed to have locked up and is abandoned with a log
/// message (the hardware would simply hang).
const MAX_CYCLES: usize = 16384;

/// Receives triangles emitted by a geometry shader
pub trait EmitSink {
    /// Called on an EMIT with the primitive-emit flag set; `vertices` holds
    /// the three collected output register files, `winding` requests
    /// reversed submission order.
    fn triangle(&mut self, vertices: &[[Vec4; 16]; 3], winding: bool);
}

/// Sink for vertex-shader invocations, which must not emit
pub struct NoEmit;

impl EmitSink for NoEmit {
    fn triangle(&mut self, _vertices: &[[Vec4; 16]; 3], _winding: bool) {
        log::warn!("EMIT executed outside a geometry shader invocation");
    }
}

/// Operations reachable through the 64-entry opcode dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Dp3,
    Dp4,
    Dph,
    DphI,
    Ex2,
    Lg2,
    Mul,
    Sge,
    SgeI,
    Slt,
    SltI,
    Flr,
    Max,
    Min,
    Rcp,
    Rsq,
    MovA,
    Mov,
    Nop,
    End,
    Break,
    BreakC,
    Call,
    CallC,
    CallU,
    IfU,
    IfC,
    Loop,
    Emit,
    SetEmit,
    JmpC,
    JmpU,
    Cmp,
    Mad,
    MadI,
    Unknown,
}

/// Opcode dispatch table, indexed by instruction bits [31:26]
const OPCODE_TABLE: [Op; 64] = build_opcode_table();

const fn build_opcode_table() -> [Op; 64] {
    let mut t = [Op::Unknown; 64];
    t[0x00] = Op::Add;
    t[0x01] = Op::Dp3;
    t[0x02] = Op::Dp4;
    t[0x03] = Op::Dph;
    t[0x05] = Op::Ex2;
    t[0x06] = Op::Lg2;
    t[0x08] = Op::Mul;
    t[0x09] = Op::Sge;
    t[0x0A] = Op::Slt;
    t[0x0B] = Op::Flr;
    t[0x0C] = Op::Max;
    t[0x0D] = Op::Min;
    t[0x0E] = Op::Rcp;
    t[0x0F] = Op::Rsq;
    t[0x12] = Op::MovA;
    t[0x13] = Op::Mov;
    t[0x18] = Op::DphI;
    t[0x1A] = Op::SgeI;
    t[0x1B] = Op::SltI;
    t[0x20] = Op::Break;
    t[0x21] = Op::Nop;
    t[0x22] = Op::End;
    t[0x23] = Op::BreakC;
    t[0x24] = Op::Call;
    t[0x25] = Op::CallC;
    t[0x26] = Op::CallU;
    t[0x27] = Op::IfU;
    t[0x28] = Op::IfC;
    t[0x29] = Op::Loop;
    t[0x2A] = Op::Emit;
    t[0x2B] = Op::SetEmit;
    t[0x2C] = Op::JmpC;
    t[0x2D] = Op::JmpU;
    t[0x2E] = Op::Cmp;
    t[0x2F] = Op::Cmp;
    let mut i = 0x30;
    while i < 0x38 {
        t[i] = Op::MadI;
        i += 1;
    }
    while i < 0x40 {
        t[i] = Op::Mad;
        i += 1;
    }
    t
}

/// Console multiply: anything times exact zero is exact zero
///
/// `0.0 * inf` and `0.0 * NaN` both produce `0.0` on this hardware, unlike
/// IEEE-754 where they produce NaN.
#[inline]
pub fn pica_mul(a: f32, b: f32) -> f32 {
    if a == 0.0 || b == 0.0 {
        0.0
    } else {
        a * b
    }
}

// Instruction field accessors. Formats:
//   format1  (arithmetic):      desc[6:0] src2[11:7] src1[18:12] idx[20:19] dest[25:21]
//   format1i (inverted operand): desc[6:0] src2[13:7] src1[18:14] idx[20:19] dest[25:21]
//   format1c (CMP):             desc[6:0] src2[11:7] src1[18:12] idx[20:19] cmpy[23:21] cmpx[26:24]
//   format2  (conditional flow): num[7:0] dest[21:10] op[23:22] refy[24] refx[25]
//   format3  (uniform flow):     num[7:0] dest[21:10] id[25:22]
//   format4  (SETEMIT):          winding[22] primemit[23] vtxid[25:24]
//   format5  (MAD):              desc[4:0] src3[11:5] src2[16:12] src1[23:17] dest[28:24]
//   format5i (MADI):             desc[4:0] src3[9:5] src2[16:10] src1[23:17] dest[28:24]

#[inline]
fn f_desc(w: u32) -> usize {
    (w & 0x7F) as usize
}
#[inline]
fn f_src2(w: u32) -> u32 {
    (w >> 7) & 0x1F
}
#[inline]
fn f_src2_wide(w: u32) -> u32 {
    (w >> 7) & 0x7F
}
#[inline]
fn f_src1(w: u32) -> u32 {
    (w >> 12) & 0x7F
}
#[inline]
fn f_src1_narrow(w: u32) -> u32 {
    (w >> 14) & 0x1F
}
#[inline]
fn f_idx(w: u32) -> u32 {
    (w >> 19) & 0x3
}
#[inline]
fn f_dest(w: u32) -> u32 {
    (w >> 21) & 0x1F
}
#[inline]
fn f_num(w: u32) -> usize {
    (w & 0xFF) as usize
}
#[inline]
fn f_flow_dest(w: u32) -> usize {
    ((w >> 10) & 0xFFF) as usize
}
#[inline]
fn f_cond_op(w: u32) -> u32 {
    (w >> 22) & 0x3
}
#[inline]
fn f_refy(w: u32) -> bool {
    (w >> 24) & 1 != 0
}
#[inline]
fn f_refx(w: u32) -> bool {
    (w >> 25) & 1 != 0
}
#[inline]
fn f_uniform_id(w: u32) -> usize {
    ((w >> 22) & 0xF) as usize
}
#[inline]
fn f_mad_desc(w: u32) -> usize {
    (w & 0x1F) as usize
}
#[inline]
fn f_mad_src1(w: u32) -> u32 {
    (w >> 17) & 0x7F
}
#[inline]
fn f_mad_dest(w: u32) -> u32 {
    (w >> 24) & 0x1F
}

/// Read a source register (7-bit encoding) with optional relative addressing
///
/// 0x00-0x0F: input, 0x10-0x1F: temporary, 0x20-0x7F: float constant.
/// Relative addressing only applies to float constants; out-of-range
/// constant indices read as zero.
fn read_src(unit: &ShaderUnit, setup: &ShaderSetup, reg: u32, idx: u32) -> Vec4 {
    match reg {
        0x00..=0x0F => unit.input[reg as usize],
        0x10..=0x1F => unit.temp[(reg - 0x10) as usize],
        _ => {
            let base = (reg - 0x20) as i32;
            let offset = match idx {
                0 => 0,
                1 => unit.addr[0],
                2 => unit.addr[1],
                _ => unit.loop_counter as i32,
            };
            let index = base + offset;
            if (0..setup.float_uniforms.len() as i32).contains(&index) {
                setup.float_uniforms[index as usize]
            } else {
                log::trace!("constant register c{index} out of range");
                [0.0; 4]
            }
        }
    }
}

/// Apply an operand descriptor's swizzle and negate to a source value
///
/// `slot` selects which of the three operand lanes of the descriptor to use
/// (0 = src1, 1 = src2, 2 = src3).
fn apply_swizzle(value: Vec4, desc: u32, slot: u32) -> Vec4 {
    let negate = (desc >> (4 + slot * 9)) & 1 != 0;
    let pattern = (desc >> (5 + slot * 9)) & 0xFF;
    let mut out = [0.0f32; 4];
    for (comp, item) in out.iter_mut().enumerate() {
        let sel = (pattern >> (2 * (3 - comp))) & 0x3;
        *item = value[sel as usize];
    }
    if negate {
        for v in &mut out {
            *v = -*v;
        }
    }
    out
}

/// Write a result through the descriptor's component mask
fn write_dest(unit: &mut ShaderUnit, dest: u32, desc: u32, value: Vec4) {
    let mask = desc & 0xF;
    let target = match dest {
        0x00..=0x0F => &mut unit.output[dest as usize],
        _ => &mut unit.temp[(dest - 0x10) as usize],
    };
    for comp in 0..4 {
        if mask & (1 << (3 - comp)) != 0 {
            target[comp] = value[comp];
        }
    }
}

fn descriptor(setup: &ShaderSetup, id: usize) -> u32 {
    setup.swizzle[id % SWIZZLE_WORDS]
}

/// Evaluate a format2 condition against the unit's condition flags
fn evaluate_condition(unit: &ShaderUnit, word: u32) -> bool {
    let refx = f_refx(word);
    let refy = f_refy(word);
    match f_cond_op(word) {
        0 => unit.cond[0] == refx || unit.cond[1] == refy,
        1 => unit.cond[0] == refx && unit.cond[1] == refy,
        2 => unit.cond[0] == refx,
        _ => unit.cond[1] == refy,
    }
}

fn compare(lhs: f32, rhs: f32, op: u32) -> bool {
    match op {
        0 => lhs == rhs,
        1 => lhs != rhs,
        2 => lhs < rhs,
        3 => lhs <= rhs,
        4 => lhs > rhs,
        5 => lhs >= rhs,
        _ => {
            log::warn!("unknown CMP comparison op {op}, treated as always-true");
            true
        }
    }
}

/// Execute one shader invocation against the given setup bank
///
/// Inputs must already be loaded into `unit.input`; outputs are left in
/// `unit.output`. `sink` receives geometry emissions (pass [`NoEmit`] on the
/// vertex path).
pub fn run_shader(unit: &mut ShaderUnit, setup: &ShaderSetup, sink: &mut dyn EmitSink) {
    unit.reset_for_run();
    unit.pc = setup.entry_point as usize;

    for _cycle in 0..MAX_CYCLES {
        if unit.pc >= setup.end_point as usize || unit.pc >= PROGRAM_WORDS {
            return;
        }
        let pc = unit.pc;
        let word = setup.program[pc];
        let op = OPCODE_TABLE[(word >> 26) as usize];

        // An instruction may redirect control; otherwise execution falls
        // through to the stack checks below with pc + 1.
        let mut jump: Option<usize> = None;

        match op {
            Op::Add => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = a[i] + b[i];
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Mul => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = pica_mul(a[i], b[i]);
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Dp3 => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let dot = pica_mul(a[0], b[0]) + pica_mul(a[1], b[1]) + pica_mul(a[2], b[2]);
                write_dest(unit, f_dest(word), desc, [dot; 4]);
            }
            Op::Dp4 => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let dot = pica_mul(a[0], b[0])
                    + pica_mul(a[1], b[1])
                    + pica_mul(a[2], b[2])
                    + pica_mul(a[3], b[3]);
                write_dest(unit, f_dest(word), desc, [dot; 4]);
            }
            Op::Dph | Op::DphI => {
                let (a, b, desc) = if op == Op::Dph {
                    binary_operands(unit, setup, word)
                } else {
                    binary_operands_inverted(unit, setup, word)
                };
                // src1 is treated as a 3-vector with w = 1
                let dot = pica_mul(a[0], b[0])
                    + pica_mul(a[1], b[1])
                    + pica_mul(a[2], b[2])
                    + b[3];
                write_dest(unit, f_dest(word), desc, [dot; 4]);
            }
            Op::Sge | Op::SgeI => {
                let (a, b, desc) = if op == Op::Sge {
                    binary_operands(unit, setup, word)
                } else {
                    binary_operands_inverted(unit, setup, word)
                };
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = if a[i] >= b[i] { 1.0 } else { 0.0 };
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Slt | Op::SltI => {
                let (a, b, desc) = if op == Op::Slt {
                    binary_operands(unit, setup, word)
                } else {
                    binary_operands_inverted(unit, setup, word)
                };
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = if a[i] < b[i] { 1.0 } else { 0.0 };
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Max => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = if a[i] > b[i] { a[i] } else { b[i] };
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Min => {
                let (a, b, desc) = binary_operands(unit, setup, word);
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = if a[i] < b[i] { a[i] } else { b[i] };
                }
                write_dest(unit, f_dest(word), desc, r);
            }
            Op::Flr => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(
                    unit,
                    f_dest(word),
                    desc,
                    [a[0].floor(), a[1].floor(), a[2].floor(), a[3].floor()],
                );
            }
            Op::Rcp => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(unit, f_dest(word), desc, [1.0 / a[0]; 4]);
            }
            Op::Rsq => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(unit, f_dest(word), desc, [1.0 / a[0].sqrt(); 4]);
            }
            Op::Ex2 => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(unit, f_dest(word), desc, [a[0].exp2(); 4]);
            }
            Op::Lg2 => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(unit, f_dest(word), desc, [a[0].log2(); 4]);
            }
            Op::Mov => {
                let (a, desc) = unary_operand(unit, setup, word);
                write_dest(unit, f_dest(word), desc, a);
            }
            Op::MovA => {
                let (a, desc) = unary_operand(unit, setup, word);
                // Truncate toward zero; only x/y lanes of the mask apply
                let mask = desc & 0xF;
                if mask & 0x8 != 0 {
                    unit.addr[0] = a[0] as i32;
                }
                if mask & 0x4 != 0 {
                    unit.addr[1] = a[1] as i32;
                }
            }
            Op::Cmp => {
                let desc = descriptor(setup, f_desc(word));
                let a = apply_swizzle(read_src(unit, setup, f_src1(word), f_idx(word)), desc, 0);
                let b = apply_swizzle(read_src(unit, setup, f_src2(word), 0), desc, 1);
                let op_x = (word >> 24) & 0x7;
                let op_y = (word >> 21) & 0x7;
                unit.cond[0] = compare(a[0], b[0], op_x);
                unit.cond[1] = compare(a[1], b[1], op_y);
            }
            Op::Mad | Op::MadI => {
                let desc = descriptor(setup, f_mad_desc(word));
                let a = apply_swizzle(
                    read_src(unit, setup, f_mad_src1(word), 0),
                    desc,
                    0,
                );
                // MAD carries the wide (constant-capable) operand in src3,
                // MADI in src2; the 5-bit operands address inputs and
                // temporaries only.
                let (b_reg, c_reg) = if op == Op::Mad {
                    ((word >> 12) & 0x1F, (word >> 5) & 0x7F)
                } else {
                    ((word >> 10) & 0x7F, (word >> 5) & 0x1F)
                };
                let b = apply_swizzle(read_src(unit, setup, b_reg, 0), desc, 1);
                let c = apply_swizzle(read_src(unit, setup, c_reg, 0), desc, 2);
                let mut r = [0.0f32; 4];
                for i in 0..4 {
                    r[i] = pica_mul(a[i], b[i]) + c[i];
                }
                write_dest(unit, f_mad_dest(word), desc, r);
            }
            Op::Nop => {}
            Op::End => return,
            Op::Break => {
                if unit.loop_depth > 0 {
                    unit.loop_depth -= 1;
                    let frame = unit.loop_stack[unit.loop_depth];
                    jump = Some(frame.trigger as usize + 1);
                } else {
                    log::warn!("BREAK at pc {pc:#X} outside any loop");
                }
            }
            Op::BreakC => {
                if evaluate_condition(unit, word) {
                    if unit.loop_depth > 0 {
                        unit.loop_depth -= 1;
                        let frame = unit.loop_stack[unit.loop_depth];
                        jump = Some(frame.trigger as usize + 1);
                    } else {
                        log::warn!("BREAKC at pc {pc:#X} outside any loop");
                    }
                }
            }
            Op::Call => {
                jump = do_call(unit, word, pc);
            }
            Op::CallC => {
                if evaluate_condition(unit, word) {
                    jump = do_call(unit, word, pc);
                }
            }
            Op::CallU => {
                if setup.bool_uniforms & (1 << f_uniform_id(word)) != 0 {
                    jump = do_call(unit, word, pc);
                }
            }
            Op::IfU => {
                let taken = setup.bool_uniforms & (1 << f_uniform_id(word)) != 0;
                jump = do_if(unit, word, taken);
            }
            Op::IfC => {
                let taken = evaluate_condition(unit, word);
                jump = do_if(unit, word, taken);
            }
            Op::Loop => {
                let uniform = setup.int_uniforms[f_uniform_id(word)];
                let dest = f_flow_dest(word);
                unit.loop_counter = uniform[1] as u32;
                if unit.loop_depth < LOOP_STACK_DEPTH {
                    unit.loop_stack[unit.loop_depth] = LoopFrame {
                        trigger: dest as u16,
                        body: (pc + 1) as u16,
                        remaining: uniform[0] as u32,
                        step: uniform[2] as u32,
                    };
                    unit.loop_depth += 1;
                } else {
                    log::warn!("loop stack overflow at pc {pc:#X}");
                }
            }
            Op::JmpC => {
                if evaluate_condition(unit, word) {
                    jump = Some(f_flow_dest(word));
                }
            }
            Op::JmpU => {
                let set = setup.bool_uniforms & (1 << f_uniform_id(word)) != 0;
                // Bit 0 of the num field inverts the test
                let negate = word & 1 != 0;
                if set != negate {
                    jump = Some(f_flow_dest(word));
                }
            }
            Op::SetEmit => {
                unit.emit.vertex_slot = ((word >> 24) & 0x3) as usize % 3;
                unit.emit.prim_emit = (word >> 23) & 1 != 0;
                unit.emit.winding = (word >> 22) & 1 != 0;
            }
            Op::Emit => {
                let slot = unit.emit.vertex_slot;
                unit.emit.buffer[slot] = unit.output;
                if unit.emit.prim_emit {
                    let buffer = unit.emit.buffer;
                    sink.triangle(&buffer, unit.emit.winding);
                }
            }
            Op::Unknown => {
                log::error!(
                    "unmapped shader opcode {:#04X} at pc {pc:#X}, treated as NOP",
                    word >> 26
                );
            }
        }

        // Control-flow resolution against the pre-increment program counter.
        let mut next = jump.unwrap_or(pc + 1);
        if unit.call_depth > 0 && unit.call_stack[unit.call_depth - 1].trigger as usize == pc {
            unit.call_depth -= 1;
            next = unit.call_stack[unit.call_depth].return_pc as usize;
        }
        if unit.if_depth > 0 && unit.if_stack[unit.if_depth - 1].trigger as usize == pc {
            unit.if_depth -= 1;
            next = unit.if_stack[unit.if_depth].skip_to as usize;
        }
        if unit.loop_depth > 0 && unit.loop_stack[unit.loop_depth - 1].trigger as usize == pc {
            let frame = &mut unit.loop_stack[unit.loop_depth - 1];
            if frame.remaining > 0 {
                frame.remaining -= 1;
                unit.loop_counter = unit.loop_counter.wrapping_add(frame.step);
                next = frame.body as usize;
            } else {
                unit.loop_depth -= 1;
            }
        }
        unit.pc = next;
    }

    log::error!(
        "shader exceeded {MAX_CYCLES} cycles from entry {:#X}; abandoning invocation",
        setup.entry_point
    );
}

fn binary_operands(unit: &ShaderUnit, setup: &ShaderSetup, word: u32) -> (Vec4, Vec4, u32) {
    let desc = descriptor(setup, f_desc(word));
    let a = apply_swizzle(read_src(unit, setup, f_src1(word), f_idx(word)), desc, 0);
    let b = apply_swizzle(read_src(unit, setup, f_src2(word), 0), desc, 1);
    (a, b, desc)
}

/// Inverted-operand forms: the wide (uniform-capable) operand is src2
fn binary_operands_inverted(
    unit: &ShaderUnit,
    setup: &ShaderSetup,
    word: u32,
) -> (Vec4, Vec4, u32) {
    let desc = descriptor(setup, f_desc(word));
    let a = apply_swizzle(read_src(unit, setup, f_src1_narrow(word), 0), desc, 0);
    let b = apply_swizzle(
        read_src(unit, setup, f_src2_wide(word), f_idx(word)),
        desc,
        1,
    );
    (a, b, desc)
}

fn unary_operand(unit: &ShaderUnit, setup: &ShaderSetup, word: u32) -> (Vec4, u32) {
    let desc = descriptor(setup, f_desc(word));
    let a = apply_swizzle(read_src(unit, setup, f_src1(word), f_idx(word)), desc, 0);
    (a, desc)
}

fn do_call(unit: &mut ShaderUnit, word: u32, pc: usize) -> Option<usize> {
    let dest = f_flow_dest(word);
    let num = f_num(word);
    if num == 0 {
        return None;
    }
    if unit.call_depth < unit.call_stack.len() {
        unit.call_stack[unit.call_depth] = CallFrame {
            trigger: (dest + num - 1) as u16,
            return_pc: (pc + 1) as u16,
        };
        unit.call_depth += 1;
        Some(dest)
    } else {
        log::warn!("call stack overflow at pc {pc:#X}");
        None
    }
}

fn do_if(unit: &mut ShaderUnit, word: u32, taken: bool) -> Option<usize> {
    let dest = f_flow_dest(word);
    let num = f_num(word);
    if taken {
        // Run the if-body, then skip the else-body once dest is reached
        if dest == 0 {
            return None;
        }
        if unit.if_depth < IF_STACK_DEPTH {
            unit.if_stack[unit.if_depth] = IfFrame {
                trigger: (dest - 1) as u16,
                skip_to: (dest + num) as u16,
            };
            unit.if_depth += 1;
            None
        } else {
            log::warn!("if stack overflow");
            None
        }
    } else {
        Some(dest)
    }
}
