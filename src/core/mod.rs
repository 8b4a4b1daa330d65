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

//! Core emulation components
//!
//! This module contains the GPU core and the service boundaries it depends on:
//! - GPU (command processor, shader interpreter, rasterization pipeline)
//! - Memory service interface (addressable memory consumed by the core)
//! - Interrupt service interface (completion signalling)
//! - Hardware context tying the services together

pub mod context;
pub mod error;
pub mod gpu;
pub mod interrupt;
pub mod memory;

// Re-export commonly used types
pub use context::HwContext;
pub use error::{EmulatorError, GpuError, Result};
pub use gpu::Gpu;
pub use interrupt::{GpuInterrupt, InterruptLine};
pub use memory::MemorySystem;
