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

//! Emulator error types

use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator core
///
/// Command-stream processing never raises errors to the caller: the GPU
/// absorbs malformed input and logs it. This type covers the construction
/// boundary, where failures are real and must be reported.
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
}

/// GPU-specific error types
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("worker thread could not be started: {reason}")]
    WorkerSpawn { reason: String },
}
