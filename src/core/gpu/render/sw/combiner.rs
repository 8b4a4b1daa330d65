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

//! Texture environment combiner
//!
//! Six stages run in sequence per fragment. Each stage picks up to three
//! RGBA sources, routes them through operand selectors, combines them with
//! the stage operation, scales, and clamps. The previous stage's result and
//! a persistent combiner buffer are both available as sources; stages 1-4
//! may write their input buffer forward, delayed by one stage.

use crate::core::gpu::render::state::{
    alpha_operand, color_operand, TevOp, TevSource, TevStage,
};
use crate::core::gpu::render::PipelineState;

/// Per-fragment inputs to the combiner
#[derive(Debug, Clone, Copy)]
pub struct FragmentInputs {
    /// Interpolated vertex color
    pub primary: [f32; 4],
    /// Sampled texel per texture unit; unit 3 is the procedural unit, which
    /// is not implemented, so it reads as unit 0.
    pub textures: [[f32; 4]; 3],
}

fn to_unit(c: [u8; 4]) -> [f32; 4] {
    [
        c[0] as f32 / 255.0,
        c[1] as f32 / 255.0,
        c[2] as f32 / 255.0,
        c[3] as f32 / 255.0,
    ]
}

fn select_source(
    source: TevSource,
    inputs: &FragmentInputs,
    previous: [f32; 4],
    buffer: [f32; 4],
    constant: [f32; 4],
) -> [f32; 4] {
    match source {
        TevSource::PrimaryColor => inputs.primary,
        TevSource::Texture0 => inputs.textures[0],
        TevSource::Texture1 => inputs.textures[1],
        TevSource::Texture2 => inputs.textures[2],
        TevSource::Texture3 => inputs.textures[0],
        TevSource::PreviousBuffer => buffer,
        TevSource::Constant => constant,
        TevSource::Previous => previous,
    }
}

fn combine_rgb(op: TevOp, a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    match op {
        TevOp::Replace => a,
        TevOp::Modulate => [a[0] * b[0], a[1] * b[1], a[2] * b[2]],
        TevOp::Add => [a[0] + b[0], a[1] + b[1], a[2] + b[2]],
        TevOp::AddSigned => [a[0] + b[0] - 0.5, a[1] + b[1] - 0.5, a[2] + b[2] - 0.5],
        TevOp::Interpolate => [
            a[0] * c[0] + b[0] * (1.0 - c[0]),
            a[1] * c[1] + b[1] * (1.0 - c[1]),
            a[2] * c[2] + b[2] * (1.0 - c[2]),
        ],
        TevOp::Subtract => [a[0] - b[0], a[1] - b[1], a[2] - b[2]],
        TevOp::Dot3Rgb | TevOp::Dot3Rgba => {
            let dot = 4.0
                * ((a[0] - 0.5) * (b[0] - 0.5)
                    + (a[1] - 0.5) * (b[1] - 0.5)
                    + (a[2] - 0.5) * (b[2] - 0.5));
            [dot; 3]
        }
        TevOp::MultiplyThenAdd => [
            a[0] * b[0] + c[0],
            a[1] * b[1] + c[1],
            a[2] * b[2] + c[2],
        ],
        TevOp::AddThenMultiply => [
            (a[0] + b[0]).min(1.0) * c[0],
            (a[1] + b[1]).min(1.0) * c[1],
            (a[2] + b[2]).min(1.0) * c[2],
        ],
    }
}

fn combine_alpha(op: TevOp, a: f32, b: f32, c: f32) -> f32 {
    match op {
        TevOp::Replace => a,
        TevOp::Modulate => a * b,
        TevOp::Add => a + b,
        TevOp::AddSigned => a + b - 0.5,
        TevOp::Interpolate => a * c + b * (1.0 - c),
        TevOp::Subtract => a - b,
        // The dot products operate on colors; the alpha channel reuses the
        // multiply-add family semantics when so configured.
        TevOp::Dot3Rgb | TevOp::Dot3Rgba => a,
        TevOp::MultiplyThenAdd => a * b + c,
        TevOp::AddThenMultiply => (a + b).min(1.0) * c,
    }
}

fn run_stage(
    stage: &TevStage,
    inputs: &FragmentInputs,
    previous: [f32; 4],
    buffer: [f32; 4],
) -> [f32; 4] {
    let constant = to_unit(stage.constant);

    let mut rgb_in = [[0.0f32; 3]; 3];
    let mut alpha_in = [0.0f32; 3];
    for slot in 0..3 {
        let c = select_source(stage.color_src[slot], inputs, previous, buffer, constant);
        rgb_in[slot] = color_operand(c, stage.color_operand[slot]);
        let a = select_source(stage.alpha_src[slot], inputs, previous, buffer, constant);
        alpha_in[slot] = alpha_operand(a, stage.alpha_operand[slot]);
    }

    let rgb = combine_rgb(stage.color_op, rgb_in[0], rgb_in[1], rgb_in[2]);
    let mut alpha = combine_alpha(stage.alpha_op, alpha_in[0], alpha_in[1], alpha_in[2]);
    if stage.color_op == TevOp::Dot3Rgba {
        alpha = rgb[0];
    }

    let cs = stage.color_scale as f32;
    let als = stage.alpha_scale as f32;
    [
        (rgb[0] * cs).clamp(0.0, 1.0),
        (rgb[1] * cs).clamp(0.0, 1.0),
        (rgb[2] * cs).clamp(0.0, 1.0),
        (alpha * als).clamp(0.0, 1.0),
    ]
}

/// Run all six combiner stages for one fragment, returning the final RGBA
pub fn run_combiner(state: &PipelineState, inputs: &FragmentInputs) -> [f32; 4] {
    let mut previous = inputs.primary;
    let mut buffer = to_unit(state.tev_buffer_color);
    let mut next_buffer = buffer;

    for (index, stage) in state.tev_stages.iter().enumerate() {
        let result = run_stage(stage, inputs, previous, buffer);

        // Latched updates become visible with a one-stage delay: the value
        // a stage reads includes writes from two or more stages back.
        buffer = next_buffer;

        // Stages 1-4 may latch their result into the buffer for later stages
        if (1..=4).contains(&index) {
            let bit = 1 << (index - 1);
            if state.tev_buffer_rgb_mask & bit != 0 {
                next_buffer[0] = result[0];
                next_buffer[1] = result[1];
                next_buffer[2] = result[2];
            }
            if state.tev_buffer_alpha_mask & bit != 0 {
                next_buffer[3] = result[3];
            }
        }
        previous = result;
    }
    previous
}
