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

use proptest::prelude::*;

use crate::core::context::HwContext;
use crate::core::gpu::registers::{reg, Registers, BYTE_ENABLE};
use crate::core::gpu::Gpu;

proptest! {
    /// A masked write changes exactly the bits covered by both the
    /// byte-enable mask and the slot's architectural mask, regardless of the
    /// previous contents.
    #[test]
    fn masked_write_touches_only_enabled_bits(
        id in 0u16..0x400,
        old in any::<u32>(),
        new in any::<u32>(),
        sel in 0usize..16,
    ) {
        let mut regs = Registers::new();
        regs.write_masked(id, old, 0xFFFF_FFFF);
        let stored = regs.read(id);

        let effective = BYTE_ENABLE[sel] & Registers::slot_mask(id);
        let merged = regs.write_masked(id, new, BYTE_ENABLE[sel]);

        prop_assert_eq!(merged, regs.read(id));
        prop_assert_eq!(regs.read(id) & !effective, stored & !effective);
        prop_assert_eq!(regs.read(id) & effective, new & effective);
    }
}

#[test]
fn test_round_trip_through_gpu() {
    let ctx = HwContext::with_flat_memory(0, 0x1000);
    let mut gpu = Gpu::new(ctx);

    gpu.write_register(reg::BLEND_COLOR, 0xCAFE_F00D);
    assert_eq!(gpu.read_register(reg::BLEND_COLOR), 0xCAFE_F00D);

    // Narrow slots clamp to their architectural width
    gpu.write_register(reg::CULL_FACE, 0xFFFF_FFFF);
    assert_eq!(gpu.read_register(reg::CULL_FACE), 0x3);
}

#[test]
fn test_round_trip_through_threaded_gpu() {
    let ctx = HwContext::with_flat_memory(0, 0x1000);
    let mut gpu = Gpu::new_threaded(ctx).expect("worker thread");

    // Reads are FIFO-ordered behind writes, so no explicit sync is needed
    gpu.write_register(reg::BLEND_COLOR, 0x0102_0304);
    assert_eq!(gpu.read_register(reg::BLEND_COLOR), 0x0102_0304);
}
