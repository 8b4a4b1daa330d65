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

use pica_core::core::context::HwContext;
use pica_core::core::gpu::Gpu;
use pica_core::core::interrupt::{GpuInterrupt, RecordingInterrupts};
use pica_core::core::memory::{FlatMemory, MemorySystem};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_basic_initialization() {
    init_logging();
    let ctx = HwContext::with_flat_memory(0x1800_0000, 0x1000);
    let mut gpu = Gpu::new(ctx);
    // Registers power up cleared
    assert_eq!(gpu.read_register(0x040), 0);
    assert_eq!(gpu.read_register(0x3FF), 0);
}

#[test]
fn test_register_write_read() {
    init_logging();
    let ctx = HwContext::with_flat_memory(0x1800_0000, 0x1000);
    let mut gpu = Gpu::new(ctx);
    gpu.write_register(0x103, 0x1122_3344);
    assert_eq!(gpu.read_register(0x103), 0x1122_3344);
}

#[test]
fn test_command_list_raises_irq() {
    init_logging();
    let mem = Arc::new(FlatMemory::new(0x1800_0000, 0x1000));
    let ints = Arc::new(RecordingInterrupts::default());
    let mut gpu = Gpu::new(HwContext::new(mem.clone(), ints.clone()));

    // One entry: write 1 to the IRQ-request register (0x010), all bytes on
    mem.write_u32(0x1800_0100, 1);
    mem.write_u32(0x1800_0104, 0x010 | (0xF << 16));
    gpu.submit_command_list(0x1800_0100, 2);
    gpu.sync();

    assert_eq!(ints.count(GpuInterrupt::CommandList), 1);
}

#[test]
fn test_threaded_gpu_shuts_down_cleanly() {
    init_logging();
    let ctx = HwContext::with_flat_memory(0x1800_0000, 0x1000);
    let mut gpu = Gpu::new_threaded(ctx).expect("worker thread");
    gpu.write_register(0x228, 3);
    gpu.sync();
    assert_eq!(gpu.read_register(0x228), 3);
    drop(gpu);
}
