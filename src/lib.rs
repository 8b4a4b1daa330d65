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

//! PICA-class handheld GPU core library
//!
//! This library emulates the 3D graphics processor of a handheld game console:
//! a fixed-function-plus-programmable-shader GPU driven by a register-addressed
//! command stream. It provides the command processor (register file, command
//! stream decode, draw triggers, optional worker-thread pipelining), the
//! unified vertex/geometry shader interpreter, and a software rasterization
//! pipeline (clipping, scanline rasterization, texture combiner, per-pixel
//! tests and blending).
//!
//! The surrounding emulator supplies memory and interrupt services through the
//! traits in [`core::memory`] and [`core::interrupt`]; this crate never owns
//! backing storage and never talks to a display.
//!
//! # Example
//!
//! ```
//! use pica_core::core::context::HwContext;
//! use pica_core::core::gpu::Gpu;
//!
//! let ctx = HwContext::with_flat_memory(0x1800_0000, 0x0060_0000);
//! let mut gpu = Gpu::new(ctx);
//!
//! // Registers are written either directly (MMIO path) or through a
//! // memory-resident command list.
//! gpu.write_register(0x040, 0x0000_0000); // face culling: keep all
//! assert_eq!(gpu.read_register(0x040), 0);
//! ```

pub mod core;
