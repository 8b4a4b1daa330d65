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

//! GPU-level tests
//!
//! Everything here drives the GPU the way a guest driver would: MMIO
//! register writes and memory-resident command lists. Behavior local to one
//! module is tested next to that module; these tests cover the paths that
//! cross module boundaries.

mod command_stream;
mod register_file;
mod render_pipeline;

use crate::core::memory::{FlatMemory, MemorySystem};

/// Command-list builder producing the wire format the cursor decodes
///
/// Entries stay 8-byte aligned, so bursts with an even number of extra
/// parameters get one word of padding.
pub struct CmdList {
    words: Vec<u32>,
}

impl CmdList {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// One register write with all bytes enabled
    pub fn put(&mut self, id: u16, value: u32) {
        self.entry(id, 0xF, &[value], false);
    }

    /// One register write through a byte-enable selector
    pub fn put_masked(&mut self, id: u16, sel: u32, value: u32) {
        self.entry(id, sel, &[value], false);
    }

    /// Consecutive-ID burst: value *n* lands in register `id + n`
    pub fn burst(&mut self, id: u16, values: &[u32]) {
        self.entry(id, 0xF, values, true);
    }

    fn entry(&mut self, id: u16, sel: u32, values: &[u32], consecutive: bool) {
        let extra = values.len() as u32 - 1;
        self.words.push(values[0]);
        self.words
            .push(id as u32 | (sel << 16) | (extra << 20) | ((consecutive as u32) << 31));
        self.words.extend_from_slice(&values[1..]);
        if self.words.len() % 2 != 0 {
            self.words.push(0);
        }
    }

    pub fn len_words(&self) -> u32 {
        self.words.len() as u32
    }

    pub fn store(&self, mem: &FlatMemory, addr: u32) {
        for (i, &word) in self.words.iter().enumerate() {
            mem.write_u32(addr + 4 * i as u32, word);
        }
    }
}
