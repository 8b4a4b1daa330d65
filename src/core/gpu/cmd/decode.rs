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

//! Command stream decoding
//!
//! A command list is a sequence of 8-byte-aligned entries. Each entry starts
//! with a parameter word followed by a header word:
//!
//! ```text
//! header bits  0-15  register id (only the low 10 bits address a register)
//! header bits 16-19  byte-enable selector (bit n enables byte n)
//! header bits 20-27  number of extra parameter words
//! header bit     31  consecutive-write flag
//! ```
//!
//! Extra parameters follow the header; the cursor then advances to the next
//! 8-byte boundary. With the consecutive flag set, each parameter goes to the
//! next register id; without it, all parameters hit the same id in order.

use crate::core::gpu::registers::BYTE_ENABLE;
use crate::core::memory::MemorySystem;

/// One decoded register-write burst
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    /// Target register of the first write
    pub id: u16,
    /// Expanded byte-enable mask applied to every write of the burst
    pub mask: u32,
    /// Parameter words, first entry is the pre-header parameter
    pub values: Vec<u32>,
    /// Increment the target id after each write
    pub consecutive: bool,
}

/// Walks a command list in guest memory
///
/// The cursor is a plain address range; reaching the end of the range or an
/// autostop match parks it on a sentinel, after which further stepping is a
/// no-op until it is re-aimed at a new list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCursor {
    addr: u32,
    end: u32,
}

/// Parked-cursor sentinel address
const STOPPED: u32 = 0xFFFF_FFFF;

impl CommandCursor {
    /// A cursor that yields nothing
    pub fn stopped() -> Self {
        Self {
            addr: STOPPED,
            end: STOPPED,
        }
    }

    /// Aim the cursor at a list of `size_words` 32-bit words
    pub fn aim(&mut self, addr: u32, size_words: u32) {
        self.addr = addr & !0x7;
        self.end = self.addr + size_words * 4;
    }

    /// Park the cursor; subsequent [`Self::next`] calls return `None`
    pub fn stop(&mut self) {
        self.addr = STOPPED;
        self.end = STOPPED;
    }

    pub fn is_stopped(&self) -> bool {
        self.addr == STOPPED
    }

    /// Decode the next packet and advance
    pub fn next(&mut self, mem: &dyn MemorySystem) -> Option<CommandPacket> {
        if self.is_stopped() || self.addr + 8 > self.end {
            self.stop();
            return None;
        }

        let param0 = mem.read_u32(self.addr);
        let header = mem.read_u32(self.addr + 4);

        let id = (header & 0x3FF) as u16;
        let mask = BYTE_ENABLE[((header >> 16) & 0xF) as usize];
        let extra = ((header >> 20) & 0xFF) as usize;
        let consecutive = header & 0x8000_0000 != 0;

        let mut values = Vec::with_capacity(1 + extra);
        values.push(param0);
        for i in 0..extra {
            let addr = self.addr + 8 + 4 * i as u32;
            if addr + 4 > self.end {
                log::warn!(
                    "command at {:#010X} runs {} words past the list end, truncated",
                    self.addr,
                    extra - i
                );
                break;
            }
            values.push(mem.read_u32(addr));
        }

        // Entries stay 8-byte aligned: one extra parameter pads to two words
        self.addr += ((extra as u32 + 3) & !1) * 4;

        Some(CommandPacket {
            id,
            mask,
            values,
            consecutive,
        })
    }
}

impl Default for CommandCursor {
    fn default() -> Self {
        Self::stopped()
    }
}
