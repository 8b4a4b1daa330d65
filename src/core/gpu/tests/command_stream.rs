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

use std::sync::Arc;

use super::CmdList;
use crate::core::context::HwContext;
use crate::core::gpu::registers::reg;
use crate::core::gpu::Gpu;
use crate::core::interrupt::{GpuInterrupt, NullInterrupts, RecordingInterrupts};
use crate::core::memory::FlatMemory;

fn gpu_with_list(list: &CmdList) -> (Gpu, Arc<RecordingInterrupts>) {
    let mem = Arc::new(FlatMemory::new(0, 0x1000));
    list.store(&mem, 0x100);
    let ints = Arc::new(RecordingInterrupts::default());
    let mut gpu = Gpu::new(HwContext::new(mem, ints.clone()));
    gpu.submit_command_list(0x100, list.len_words());
    gpu.sync();
    (gpu, ints)
}

#[test]
fn test_consecutive_burst_covers_id_range() {
    let mut list = CmdList::new();
    list.burst(0x300, &[1, 2, 3, 4, 5]);

    let (mut gpu, _) = gpu_with_list(&list);
    for n in 0..5u32 {
        assert_eq!(gpu.read_register(0x300 + n as u16), n + 1);
    }
}

#[test]
fn test_consecutive_burst_wraps_register_file() {
    // 0x3FE + 18 wraps the 10-bit id space onto 0x010 (TRIGGER_IRQ), so the
    // last value must land there and fire its side effect
    let values: Vec<u32> = (1..=19).collect();
    let mut list = CmdList::new();
    list.burst(0x3FE, &values);

    let (mut gpu, ints) = gpu_with_list(&list);
    assert_eq!(gpu.read_register(0x3FE), 1);
    assert_eq!(gpu.read_register(0x3FF), 2);
    assert_eq!(gpu.read_register(0x000), 3);
    assert_eq!(gpu.read_register(reg::TRIGGER_IRQ), 19);
    assert_eq!(ints.count(GpuInterrupt::CommandList), 1);
}

#[test]
fn test_non_consecutive_burst_overwrites_one_register() {
    let mut list = CmdList::new();
    list.entry(0x300, 0xF, &[1, 2, 3], false);

    let (mut gpu, _) = gpu_with_list(&list);
    assert_eq!(gpu.read_register(0x300), 3);
    assert_eq!(gpu.read_register(0x301), 0);
}

#[test]
fn test_byte_enable_selector_from_header() {
    let mut list = CmdList::new();
    list.put(0x300, 0xAABB_CCDD);
    list.put_masked(0x300, 0x2, 0x1122_3344);

    let (mut gpu, _) = gpu_with_list(&list);
    assert_eq!(gpu.read_register(0x300), 0xAABB_33DD);
}

#[test]
fn test_irq_autostop_abandons_list_tail() {
    let mut list = CmdList::new();
    list.put(reg::IRQ_AUTOSTOP_CMP, 0x1234);
    list.put(reg::IRQ_AUTOSTOP_MASK, 0x8000_FFFF);
    list.put(reg::TRIGGER_IRQ, 0x1234);
    list.put(0x301, 0xBAD);

    let (mut gpu, ints) = gpu_with_list(&list);
    assert_eq!(ints.count(GpuInterrupt::CommandList), 1);
    // The comparator matched, so the entry after TRIGGER_IRQ never ran
    assert_eq!(gpu.read_register(0x301), 0);
}

#[test]
fn test_irq_without_autostop_match_continues() {
    let mut list = CmdList::new();
    list.put(reg::IRQ_AUTOSTOP_CMP, 0x1234);
    list.put(reg::IRQ_AUTOSTOP_MASK, 0x8000_FFFF);
    list.put(reg::TRIGGER_IRQ, 0x9999);
    list.put(0x302, 7);

    let (mut gpu, ints) = gpu_with_list(&list);
    assert_eq!(ints.count(GpuInterrupt::CommandList), 1);
    assert_eq!(gpu.read_register(0x302), 7);
}

#[test]
fn test_autostop_disabled_without_mask_bit() {
    let mut list = CmdList::new();
    list.put(reg::IRQ_AUTOSTOP_CMP, 0x1234);
    list.put(reg::IRQ_AUTOSTOP_MASK, 0x0000_FFFF);
    list.put(reg::TRIGGER_IRQ, 0x1234);
    list.put(0x303, 9);

    let (mut gpu, _) = gpu_with_list(&list);
    assert_eq!(gpu.read_register(0x303), 9);
}

#[test]
fn test_empty_list_is_a_no_op() {
    let mem = Arc::new(FlatMemory::new(0, 0x1000));
    let mut gpu = Gpu::new(HwContext::new(mem, Arc::new(NullInterrupts)));
    gpu.submit_command_list(0x100, 0);
    gpu.sync();
    assert_eq!(gpu.read_register(0x300), 0);
}
