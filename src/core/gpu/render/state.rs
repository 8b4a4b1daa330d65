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

//! Fixed-function pipeline state
//!
//! Plain-data decodings of the raster, texturing, combiner, and output-merger
//! register groups. Each enum decodes from the raw field value with a
//! fallback for encodings the hardware leaves undefined; out-of-range values
//! are logged once at the decode site and degrade to a safe default rather
//! than tearing down the frame.

use bitflags::bitflags;

/// A vertex after shader output mapping, in clip space
///
/// All attributes are interpolated perspective-correct during rasterization
/// except `screen`, which is filled in after the perspective divide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputVertex {
    /// Clip-space position (x, y, z, w)
    pub position: [f32; 4],
    /// Vertex color, RGBA in [0, 1]
    pub color: [f32; 4],
    /// Texture coordinates for units 0-2 (unit 1 shares u/v layout)
    pub texcoord: [[f32; 2]; 3],
    /// Window coordinates, valid after viewport transform
    pub screen: [f32; 3],
    /// Reciprocal of clip-space w, used for perspective-correct interpolation
    pub inv_w: f32,
}

impl Default for OutputVertex {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            color: [0.0; 4],
            texcoord: [[0.0; 2]; 3],
            screen: [0.0; 3],
            inv_w: 1.0,
        }
    }
}

impl OutputVertex {
    /// Component-wise linear interpolation of every clip-space attribute
    ///
    /// Used by the clipper when a triangle edge crosses a clip plane.
    pub fn lerp(&self, other: &OutputVertex, t: f32) -> OutputVertex {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        let mut v = OutputVertex::default();
        for i in 0..4 {
            v.position[i] = mix(self.position[i], other.position[i]);
            v.color[i] = mix(self.color[i], other.color[i]);
        }
        for unit in 0..3 {
            for i in 0..2 {
                v.texcoord[unit][i] = mix(self.texcoord[unit][i], other.texcoord[unit][i]);
            }
        }
        v
    }
}

/// How the vertex stream is grouped into triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    List,
    Strip,
    Fan,
    /// Raw list fed through the geometry shader
    GeometryPrimitive,
}

impl PrimitiveTopology {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::List,
            1 => Self::Strip,
            2 => Self::Fan,
            _ => Self::GeometryPrimitive,
        }
    }
}

/// Face culling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    FrontFacing,
    BackFacing,
}

impl CullMode {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::None,
            1 => Self::FrontFacing,
            2 => Self::BackFacing,
            other => {
                log::warn!("reserved cull mode {other}, culling disabled");
                Self::None
            }
        }
    }
}

/// Shared comparison function for depth, alpha, and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunc {
    Never,
    #[default]
    Always,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareFunc {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Never,
            1 => Self::Always,
            2 => Self::Equal,
            3 => Self::NotEqual,
            4 => Self::Less,
            5 => Self::LessOrEqual,
            6 => Self::Greater,
            _ => Self::GreaterOrEqual,
        }
    }

    /// Apply the comparison as `incoming OP reference`
    pub fn passes(self, incoming: f32, reference: f32) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::Equal => incoming == reference,
            Self::NotEqual => incoming != reference,
            Self::Less => incoming < reference,
            Self::LessOrEqual => incoming <= reference,
            Self::Greater => incoming > reference,
            Self::GreaterOrEqual => incoming >= reference,
        }
    }

    /// Integer form used by the stencil test
    pub fn passes_int(self, incoming: u32, reference: u32) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::Equal => incoming == reference,
            Self::NotEqual => incoming != reference,
            Self::Less => incoming < reference,
            Self::LessOrEqual => incoming <= reference,
            Self::Greater => incoming > reference,
            Self::GreaterOrEqual => incoming >= reference,
        }
    }
}

/// Stencil buffer update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    /// Increment, clamping at 0xFF
    Increment,
    /// Decrement, clamping at 0
    Decrement,
    Invert,
    /// Increment with wraparound
    IncrementWrap,
    /// Decrement with wraparound
    DecrementWrap,
}

impl StencilOp {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Keep,
            1 => Self::Zero,
            2 => Self::Replace,
            3 => Self::Increment,
            4 => Self::Decrement,
            5 => Self::Invert,
            6 => Self::IncrementWrap,
            _ => Self::DecrementWrap,
        }
    }

    /// Apply the operation to a stencil value
    pub fn apply(self, value: u8, reference: u8) -> u8 {
        match self {
            Self::Keep => value,
            Self::Zero => 0,
            Self::Replace => reference,
            Self::Increment => value.saturating_add(1),
            Self::Decrement => value.saturating_sub(1),
            Self::Invert => !value,
            Self::IncrementWrap => value.wrapping_add(1),
            Self::DecrementWrap => value.wrapping_sub(1),
        }
    }
}

/// Full stencil test configuration decoded from the two stencil registers
#[derive(Debug, Clone, Copy, Default)]
pub struct StencilConfig {
    pub enabled: bool,
    pub func: CompareFunc,
    pub reference: u8,
    pub input_mask: u8,
    pub write_mask: u8,
    pub fail_op: StencilOp,
    pub zfail_op: StencilOp,
    pub zpass_op: StencilOp,
}

impl StencilConfig {
    pub fn from_raw(test: u32, op: u32) -> Self {
        Self {
            enabled: test & 1 != 0,
            func: CompareFunc::from_raw(test >> 4),
            write_mask: ((test >> 8) & 0xFF) as u8,
            reference: ((test >> 16) & 0xFF) as u8,
            input_mask: ((test >> 24) & 0xFF) as u8,
            fail_op: StencilOp::from_raw(op),
            zfail_op: StencilOp::from_raw(op >> 4),
            zpass_op: StencilOp::from_raw(op >> 8),
        }
    }
}

/// Blend equation applied to source and destination terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Add,
            1 => Self::Subtract,
            2 => Self::ReverseSubtract,
            3 => Self::Min,
            4 => Self::Max,
            other => {
                log::warn!("reserved blend equation {other}, using Add");
                Self::Add
            }
        }
    }
}

/// Blend weight selection for either term of the blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SourceColor,
    OneMinusSourceColor,
    DestColor,
    OneMinusDestColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestAlpha,
    OneMinusDestAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SourceAlphaSaturate,
}

impl BlendFactor {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0xF {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::SourceColor,
            3 => Self::OneMinusSourceColor,
            4 => Self::DestColor,
            5 => Self::OneMinusDestColor,
            6 => Self::SourceAlpha,
            7 => Self::OneMinusSourceAlpha,
            8 => Self::DestAlpha,
            9 => Self::OneMinusDestAlpha,
            10 => Self::ConstantColor,
            11 => Self::OneMinusConstantColor,
            12 => Self::ConstantAlpha,
            13 => Self::OneMinusConstantAlpha,
            _ => Self::SourceAlphaSaturate,
        }
    }
}

/// Alpha blend configuration for both the color and alpha channels
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendConfig {
    pub enabled: bool,
    pub color_eq: BlendEquation,
    pub alpha_eq: BlendEquation,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    /// Constant blend color, RGBA
    pub constant: [u8; 4],
}

impl BlendConfig {
    pub fn from_raw(func: u32, constant: u32, enabled: bool) -> Self {
        Self {
            enabled,
            color_eq: BlendEquation::from_raw(func),
            alpha_eq: BlendEquation::from_raw(func >> 8),
            color_src: BlendFactor::from_raw(func >> 16),
            color_dst: BlendFactor::from_raw(func >> 20),
            alpha_src: BlendFactor::from_raw(func >> 24),
            alpha_dst: BlendFactor::from_raw(func >> 28),
            constant: constant.to_le_bytes(),
        }
    }
}

bitflags! {
    /// Per-channel framebuffer write enables
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ColorWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
    }
}

/// Depth, alpha-test, and color-mask bits from the output-merger register
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthColorMask {
    pub depth_test_enabled: bool,
    pub depth_func: CompareFunc,
    pub color_write: ColorWriteMask,
    pub depth_write_enabled: bool,
}

impl DepthColorMask {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            depth_test_enabled: raw & 1 != 0,
            depth_func: CompareFunc::from_raw(raw >> 4),
            color_write: ColorWriteMask::from_bits_truncate(((raw >> 8) & 0xF) as u8),
            depth_write_enabled: (raw >> 12) & 1 != 0,
        }
    }
}

/// Alpha test configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaTest {
    pub enabled: bool,
    pub func: CompareFunc,
    pub reference: u8,
}

impl AlphaTest {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            enabled: raw & 1 != 0,
            func: CompareFunc::from_raw(raw >> 4),
            reference: ((raw >> 8) & 0xFF) as u8,
        }
    }
}

/// Framebuffer color storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorFormat {
    #[default]
    Rgba8,
    Rgb8,
    Rgb565,
    Rgba5551,
    Rgba4,
}

impl ColorFormat {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::Rgba8,
            1 => Self::Rgb8,
            2 => Self::Rgb565,
            3 => Self::Rgba5551,
            4 => Self::Rgba4,
            other => {
                log::warn!("reserved framebuffer color format {other}, using RGBA8");
                Self::Rgba8
            }
        }
    }

    /// Bytes per pixel in memory
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Rgb565 | Self::Rgba5551 | Self::Rgba4 => 2,
        }
    }
}

/// Depth/stencil storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthFormat {
    #[default]
    D16,
    D24,
    /// 24-bit depth with an 8-bit stencil plane
    D24S8,
}

impl DepthFormat {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::D16,
            2 => Self::D24,
            3 => Self::D24S8,
            other => {
                log::warn!("reserved depth format {other}, using D16");
                Self::D16
            }
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::D16 => 2,
            Self::D24 => 3,
            Self::D24S8 => 4,
        }
    }

    pub fn has_stencil(self) -> bool {
        self == Self::D24S8
    }
}

/// Texture lookup behavior outside the [0, 1) coordinate range, per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    ClampToBorder,
    Repeat,
    MirroredRepeat,
}

impl WrapMode {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            0 => Self::ClampToEdge,
            1 => Self::ClampToBorder,
            2 => Self::Repeat,
            3 => Self::MirroredRepeat,
            other => {
                // Values 4-7 alias the low encodings on hardware
                log::debug!("out-of-range wrap mode {other}, aliasing to {}", other & 0x3);
                Self::from_raw(other & 0x3)
            }
        }
    }
}

/// In-memory texel layouts supported by the texture units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    Rgb8,
    Rgba5551,
    Rgb565,
    Rgba4,
    /// Luminance + alpha, 8 bits each
    La8,
    /// Luminance/alpha pair reused as a two-channel format
    Rg8,
    L8,
    A8,
    /// 4-bit luminance + 4-bit alpha
    La4,
    L4,
    A4,
    /// ETC1 compressed, 8 bytes per 4x4 block
    Etc1,
    /// ETC1 with a separate 4-bit alpha plane per block
    Etc1A4,
}

impl TextureFormat {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0xF {
            0 => Self::Rgba8,
            1 => Self::Rgb8,
            2 => Self::Rgba5551,
            3 => Self::Rgb565,
            4 => Self::Rgba4,
            5 => Self::La8,
            6 => Self::Rg8,
            7 => Self::L8,
            8 => Self::A8,
            9 => Self::La4,
            10 => Self::L4,
            11 => Self::A4,
            12 => Self::Etc1,
            13 => Self::Etc1A4,
            other => {
                log::warn!("reserved texture format {other}, using RGBA8");
                Self::Rgba8
            }
        }
    }

    /// Bits per texel; sub-byte and compressed formats return their
    /// effective density.
    pub fn bits_per_texel(self) -> usize {
        match self {
            Self::Rgba8 => 32,
            Self::Rgb8 => 24,
            Self::Rgba5551 | Self::Rgb565 | Self::Rgba4 | Self::La8 | Self::Rg8 => 16,
            Self::L8 | Self::A8 | Self::La4 | Self::Etc1A4 => 8,
            Self::L4 | Self::A4 | Self::Etc1 => 4,
        }
    }
}

/// One texture unit's sampling state
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureConfig {
    pub enabled: bool,
    /// Physical address of texel data
    pub address: u32,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    /// RGBA border color for [`WrapMode::ClampToBorder`]
    pub border: [u8; 4],
}

/// Combiner input sources, shared by color and alpha channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TevSource {
    #[default]
    PrimaryColor,
    Texture0,
    Texture1,
    Texture2,
    Texture3,
    PreviousBuffer,
    Constant,
    Previous,
}

impl TevSource {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0xF {
            0 => Self::PrimaryColor,
            3 => Self::Texture0,
            4 => Self::Texture1,
            5 => Self::Texture2,
            6 => Self::Texture3,
            13 => Self::PreviousBuffer,
            14 => Self::Constant,
            15 => Self::Previous,
            other => {
                log::warn!("unhandled combiner source {other}, using primary color");
                Self::PrimaryColor
            }
        }
    }
}

/// Combiner per-stage operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TevOp {
    #[default]
    Replace,
    Modulate,
    Add,
    AddSigned,
    Interpolate,
    Subtract,
    Dot3Rgb,
    Dot3Rgba,
    MultiplyThenAdd,
    AddThenMultiply,
}

impl TevOp {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0xF {
            0 => Self::Replace,
            1 => Self::Modulate,
            2 => Self::Add,
            3 => Self::AddSigned,
            4 => Self::Interpolate,
            5 => Self::Subtract,
            6 => Self::Dot3Rgb,
            7 => Self::Dot3Rgba,
            8 => Self::MultiplyThenAdd,
            9 => Self::AddThenMultiply,
            other => {
                log::warn!("unhandled combiner op {other}, using Replace");
                Self::Replace
            }
        }
    }
}

/// Decoded state for one of the six combiner stages
#[derive(Debug, Clone, Copy, Default)]
pub struct TevStage {
    pub color_src: [TevSource; 3],
    pub alpha_src: [TevSource; 3],
    /// Color operand selectors, see [`color_operand`]
    pub color_operand: [u32; 3],
    /// Alpha operand selectors, see [`alpha_operand`]
    pub alpha_operand: [u32; 3],
    pub color_op: TevOp,
    pub alpha_op: TevOp,
    pub constant: [u8; 4],
    /// Result multiplier: 1, 2, or 4
    pub color_scale: u32,
    pub alpha_scale: u32,
}

impl TevStage {
    /// Decode the five consecutive registers of one combiner stage
    pub fn from_regs(words: &[u32; 5]) -> Self {
        let [sources, operands, modes, constant, scale] = *words;
        Self {
            color_src: [
                TevSource::from_raw(sources),
                TevSource::from_raw(sources >> 4),
                TevSource::from_raw(sources >> 8),
            ],
            alpha_src: [
                TevSource::from_raw(sources >> 16),
                TevSource::from_raw(sources >> 20),
                TevSource::from_raw(sources >> 24),
            ],
            color_operand: [operands & 0xF, (operands >> 4) & 0xF, (operands >> 8) & 0xF],
            alpha_operand: [
                (operands >> 12) & 0x7,
                (operands >> 16) & 0x7,
                (operands >> 20) & 0x7,
            ],
            color_op: TevOp::from_raw(modes),
            alpha_op: TevOp::from_raw(modes >> 16),
            constant: constant.to_le_bytes(),
            color_scale: 1 << (scale & 0x3).min(2),
            alpha_scale: 1 << ((scale >> 16) & 0x3).min(2),
        }
    }

    /// A stage that passes its previous-stage input through unchanged
    pub fn passthrough() -> Self {
        Self {
            color_src: [TevSource::Previous; 3],
            alpha_src: [TevSource::Previous; 3],
            color_scale: 1,
            alpha_scale: 1,
            ..Default::default()
        }
    }
}

/// Apply a color operand selector to an RGBA input, yielding RGB
pub fn color_operand(rgba: [f32; 4], selector: u32) -> [f32; 3] {
    let [r, g, b, a] = rgba;
    match selector {
        0 => [r, g, b],
        1 => [1.0 - r, 1.0 - g, 1.0 - b],
        2 => [a; 3],
        3 => [1.0 - a; 3],
        4 => [r; 3],
        5 => [1.0 - r; 3],
        8 => [g; 3],
        9 => [1.0 - g; 3],
        12 => [b; 3],
        13 => [1.0 - b; 3],
        other => {
            log::warn!("unhandled color operand {other}, using source color");
            [r, g, b]
        }
    }
}

/// Apply an alpha operand selector to an RGBA input
pub fn alpha_operand(rgba: [f32; 4], selector: u32) -> f32 {
    let [r, g, b, a] = rgba;
    match selector {
        0 => a,
        1 => 1.0 - a,
        2 => r,
        3 => 1.0 - r,
        4 => g,
        5 => 1.0 - g,
        6 => b,
        _ => 1.0 - b,
    }
}

/// Viewport transform parameters
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    /// Half-width in window coordinates
    pub half_width: f32,
    /// Half-height in window coordinates
    pub half_height: f32,
    /// Depth range scale applied to NDC z
    pub depth_scale: f32,
    /// Depth range offset
    pub depth_offset: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            half_width: 160.0,
            half_height: 120.0,
            depth_scale: -1.0,
            depth_offset: 0.0,
        }
    }
}

/// Framebuffer location and layout
#[derive(Debug, Clone, Copy, Default)]
pub struct FramebufferConfig {
    pub color_address: u32,
    pub depth_address: u32,
    pub width: u32,
    pub height: u32,
    pub color_format: ColorFormat,
    pub depth_format: DepthFormat,
}
