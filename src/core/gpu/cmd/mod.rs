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

//! Command list processing
//!
//! [`decode`] walks the in-memory command stream and yields register write
//! packets; [`threading`] optionally moves packet execution onto a worker
//! thread. Draw-call execution ([`draw`]) runs wherever the register file
//! lives.

pub mod decode;
pub mod draw;
pub mod threading;

pub use decode::{CommandCursor, CommandPacket};
pub use threading::ThreadedCore;
