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

//! Hardware context
//!
//! The emulated machine is a graph of devices that all need to reach the
//! memory bus and the interrupt controller. Rather than each sub-object
//! holding back-references to an owner, the service handles are gathered into
//! one [`HwContext`] that sub-objects clone. The clones are shared handles
//! (`Arc`), never duplicated state.

use std::sync::Arc;

use super::interrupt::{InterruptLine, NullInterrupts};
use super::memory::{FlatMemory, MemorySystem};

/// Shared handles to the services the GPU core consumes
///
/// Cloning a context clones the handles, not the services. The worker thread
/// keeps its own clone while threaded execution is enabled.
#[derive(Clone)]
pub struct HwContext {
    /// Addressable memory service
    pub memory: Arc<dyn MemorySystem>,
    /// Interrupt service
    pub interrupts: Arc<dyn InterruptLine>,
}

impl HwContext {
    /// Build a context from existing service handles
    pub fn new(memory: Arc<dyn MemorySystem>, interrupts: Arc<dyn InterruptLine>) -> Self {
        Self { memory, interrupts }
    }

    /// Build a self-contained context backed by a [`FlatMemory`] region and
    /// a null interrupt sink
    ///
    /// Intended for tests, benches, and doc examples.
    pub fn with_flat_memory(base: u32, size: usize) -> Self {
        Self {
            memory: Arc::new(FlatMemory::new(base, size)),
            interrupts: Arc::new(NullInterrupts),
        }
    }
}
