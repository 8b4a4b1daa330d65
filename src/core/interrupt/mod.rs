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

//! Interrupt service interface
//!
//! The GPU signals completion events to the rest of the machine through
//! [`InterruptLine`]. The interrupt controller and scheduler live in the
//! surrounding emulator; this core only raises lines, it never waits on them.
//!
//! The worker thread may raise interrupts, so implementations must be
//! `Send + Sync` like the memory service.

use std::sync::Mutex;

/// Interrupt lines raised by the GPU core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuInterrupt {
    /// Command-list IRQ, requested explicitly by a command-stream entry
    /// writing the IRQ-request register
    CommandList,
    /// A draw batch finished feeding the rasterization pipeline
    DrawComplete,
}

/// Interrupt service consumed by the GPU core
pub trait InterruptLine: Send + Sync {
    /// Raise an interrupt line
    ///
    /// Called from the register-write path or, when threading is enabled,
    /// from the worker thread. Must not block.
    fn raise(&self, int: GpuInterrupt);
}

/// Interrupt sink that drops everything
///
/// Useful when a test only cares about framebuffer output.
#[derive(Default)]
pub struct NullInterrupts;

impl InterruptLine for NullInterrupts {
    fn raise(&self, _int: GpuInterrupt) {}
}

/// Interrupt sink that records every raised line, in order
///
/// # Examples
///
/// ```
/// use pica_core::core::interrupt::{GpuInterrupt, InterruptLine, RecordingInterrupts};
///
/// let ints = RecordingInterrupts::default();
/// ints.raise(GpuInterrupt::CommandList);
/// assert_eq!(ints.count(GpuInterrupt::CommandList), 1);
/// assert_eq!(ints.take(), vec![GpuInterrupt::CommandList]);
/// ```
#[derive(Default)]
pub struct RecordingInterrupts {
    raised: Mutex<Vec<GpuInterrupt>>,
}

impl RecordingInterrupts {
    /// Number of times a given line has been raised
    pub fn count(&self, int: GpuInterrupt) -> usize {
        self.raised
            .lock()
            .expect("interrupt lock poisoned")
            .iter()
            .filter(|&&i| i == int)
            .count()
    }

    /// Drain and return the recorded lines in raise order
    pub fn take(&self) -> Vec<GpuInterrupt> {
        std::mem::take(&mut *self.raised.lock().expect("interrupt lock poisoned"))
    }
}

impl InterruptLine for RecordingInterrupts {
    fn raise(&self, int: GpuInterrupt) {
        self.raised
            .lock()
            .expect("interrupt lock poisoned")
            .push(int);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_order() {
        let ints = RecordingInterrupts::default();
        ints.raise(GpuInterrupt::DrawComplete);
        ints.raise(GpuInterrupt::CommandList);
        ints.raise(GpuInterrupt::DrawComplete);
        assert_eq!(ints.count(GpuInterrupt::DrawComplete), 2);
        assert_eq!(
            ints.take(),
            vec![
                GpuInterrupt::DrawComplete,
                GpuInterrupt::CommandList,
                GpuInterrupt::DrawComplete
            ]
        );
        assert!(ints.take().is_empty());
    }
}
