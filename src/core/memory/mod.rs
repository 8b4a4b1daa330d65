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

//! Addressable memory service
//!
//! The GPU core never owns backing storage. All command-stream reads, vertex
//! and texture fetches, and framebuffer accesses go through the
//! [`MemorySystem`] trait at byte/half/word granularity. The surrounding
//! emulator implements this trait on its memory bus; tests and benches use the
//! bundled [`FlatMemory`] region.
//!
//! # Design Goals
//!
//! - **Decoupling**: the GPU makes no assumptions about backing storage
//! - **Concurrency**: the optional worker thread and the register-write
//!   producer both need access, so methods take `&self` and implementations
//!   decide how to provide interior mutability
//! - **Testability**: `FlatMemory` gives tests a self-contained RAM region
//!
//! All multi-byte accesses are little-endian, matching the console.

use std::sync::RwLock;

/// Memory service consumed by the GPU core
///
/// Methods take `&self` so that one memory instance can be shared between the
/// command-stream producer and the optional worker thread. Implementations
/// provide interior mutability; accesses from this core are always
/// individually byte/half/word granular and never assume atomicity across
/// wider ranges.
///
/// Out-of-range accesses must not fault: reads return zero, writes are
/// dropped. The core logs anomalies on its side; returning zero keeps the
/// emulated machine running, matching the never-fatal failure policy.
pub trait MemorySystem: Send + Sync {
    /// Read one byte from physical memory
    fn read_u8(&self, addr: u32) -> u8;

    /// Write one byte to physical memory
    fn write_u8(&self, addr: u32, value: u8);

    /// Read a little-endian halfword
    fn read_u16(&self, addr: u32) -> u16 {
        (self.read_u8(addr) as u16) | ((self.read_u8(addr.wrapping_add(1)) as u16) << 8)
    }

    /// Write a little-endian halfword
    fn write_u16(&self, addr: u32, value: u16) {
        self.write_u8(addr, value as u8);
        self.write_u8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Read a little-endian word
    fn read_u32(&self, addr: u32) -> u32 {
        (self.read_u16(addr) as u32) | ((self.read_u16(addr.wrapping_add(2)) as u32) << 16)
    }

    /// Write a little-endian word
    fn write_u32(&self, addr: u32, value: u32) {
        self.write_u16(addr, value as u16);
        self.write_u16(addr.wrapping_add(2), (value >> 16) as u16);
    }
}

/// A flat RAM region implementing [`MemorySystem`]
///
/// Backs a single contiguous physical range starting at `base`. Used by the
/// test suite and benches as stand-in VRAM/FCRAM; an emulator would implement
/// [`MemorySystem`] on its real bus instead.
///
/// # Examples
///
/// ```
/// use pica_core::core::memory::{FlatMemory, MemorySystem};
///
/// let ram = FlatMemory::new(0x1800_0000, 0x1000);
/// ram.write_u32(0x1800_0004, 0xDEAD_BEEF);
/// assert_eq!(ram.read_u32(0x1800_0004), 0xDEAD_BEEF);
/// assert_eq!(ram.read_u16(0x1800_0006), 0xDEAD);
///
/// // Out-of-range accesses are absorbed
/// assert_eq!(ram.read_u8(0x1700_0000), 0);
/// ```
pub struct FlatMemory {
    base: u32,
    bytes: RwLock<Vec<u8>>,
}

impl FlatMemory {
    /// Create a zero-filled region of `size` bytes starting at `base`
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: RwLock::new(vec![0u8; size]),
        }
    }

    /// Base physical address of the region
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Size of the region in bytes
    pub fn size(&self) -> usize {
        self.bytes.read().expect("memory lock poisoned").len()
    }

    /// Copy a byte slice into the region at the given physical address
    ///
    /// Bytes falling outside the region are dropped.
    pub fn load(&self, addr: u32, data: &[u8]) {
        let mut bytes = self.bytes.write().expect("memory lock poisoned");
        for (i, &b) in data.iter().enumerate() {
            let a = addr.wrapping_add(i as u32).wrapping_sub(self.base) as usize;
            if let Some(slot) = bytes.get_mut(a) {
                *slot = b;
            }
        }
    }

    /// Copy `len` bytes out of the region starting at the given physical address
    ///
    /// Out-of-range bytes read as zero.
    pub fn dump(&self, addr: u32, len: usize) -> Vec<u8> {
        let bytes = self.bytes.read().expect("memory lock poisoned");
        (0..len)
            .map(|i| {
                let a = addr.wrapping_add(i as u32).wrapping_sub(self.base) as usize;
                bytes.get(a).copied().unwrap_or(0)
            })
            .collect()
    }

}

impl MemorySystem for FlatMemory {
    fn read_u8(&self, addr: u32) -> u8 {
        let bytes = self.bytes.read().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        bytes.get(off).copied().unwrap_or(0)
    }

    fn write_u8(&self, addr: u32, value: u8) {
        let mut bytes = self.bytes.write().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        if let Some(slot) = bytes.get_mut(off) {
            *slot = value;
        }
    }

    fn read_u16(&self, addr: u32) -> u16 {
        let bytes = self.bytes.read().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        match bytes.get(off..off + 2) {
            Some(s) => u16::from_le_bytes([s[0], s[1]]),
            None => {
                drop(bytes);
                (self.read_u8(addr) as u16) | ((self.read_u8(addr.wrapping_add(1)) as u16) << 8)
            }
        }
    }

    fn write_u16(&self, addr: u32, value: u16) {
        let mut bytes = self.bytes.write().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        if let Some(s) = bytes.get_mut(off..off + 2) {
            s.copy_from_slice(&value.to_le_bytes());
        } else {
            drop(bytes);
            self.write_u8(addr, value as u8);
            self.write_u8(addr.wrapping_add(1), (value >> 8) as u8);
        }
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let bytes = self.bytes.read().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        match bytes.get(off..off + 4) {
            Some(s) => u32::from_le_bytes([s[0], s[1], s[2], s[3]]),
            None => {
                drop(bytes);
                (self.read_u16(addr) as u32)
                    | ((self.read_u16(addr.wrapping_add(2)) as u32) << 16)
            }
        }
    }

    fn write_u32(&self, addr: u32, value: u32) {
        let mut bytes = self.bytes.write().expect("memory lock poisoned");
        let off = addr.wrapping_sub(self.base) as usize;
        if let Some(s) = bytes.get_mut(off..off + 4) {
            s.copy_from_slice(&value.to_le_bytes());
        } else {
            drop(bytes);
            self.write_u16(addr, value as u16);
            self.write_u16(addr.wrapping_add(2), (value >> 16) as u16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let ram = FlatMemory::new(0x1000, 0x100);
        assert_eq!(ram.base(), 0x1000);
        assert_eq!(ram.size(), 0x100);
        ram.write_u8(0x1000, 0xAB);
        ram.write_u16(0x1002, 0x1234);
        ram.write_u32(0x1004, 0xCAFE_BABE);
        assert_eq!(ram.read_u8(0x1000), 0xAB);
        assert_eq!(ram.read_u16(0x1002), 0x1234);
        assert_eq!(ram.read_u32(0x1004), 0xCAFE_BABE);
    }

    #[test]
    fn test_little_endian_layout() {
        let ram = FlatMemory::new(0, 16);
        ram.write_u32(0, 0x0403_0201);
        assert_eq!(ram.read_u8(0), 0x01);
        assert_eq!(ram.read_u8(3), 0x04);
        assert_eq!(ram.read_u16(1), 0x0302);
    }

    #[test]
    fn test_out_of_range_is_absorbed() {
        let ram = FlatMemory::new(0x2000, 8);
        ram.write_u32(0x1FFC, 0xFFFF_FFFF); // below base
        ram.write_u32(0x2006, 0xFFFF_FFFF); // straddles the end
        assert_eq!(ram.read_u32(0x1FFC), 0);
        assert_eq!(ram.read_u16(0x2006), 0xFFFF);
        assert_eq!(ram.read_u16(0x2008), 0);
    }

    #[test]
    fn test_load_dump() {
        let ram = FlatMemory::new(0x100, 16);
        ram.load(0x104, &[1, 2, 3, 4]);
        assert_eq!(ram.dump(0x104, 4), vec![1, 2, 3, 4]);
        assert_eq!(ram.read_u32(0x104), 0x0403_0201);
    }
}
