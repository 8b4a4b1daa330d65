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

//! Worker-thread execution
//!
//! Register state and draw execution can run on a dedicated thread, with
//! command decoding staying on the caller's thread. The worker owns the
//! [`GpuCore`] outright; callers interact through a FIFO of work items, so
//! execution is serialized and byte-identical to the inline mode.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use super::decode::CommandPacket;
use crate::core::error::GpuError;
use crate::core::gpu::GpuCore;

pub(crate) enum WorkItem {
    /// Apply a decoded register-write burst
    Apply(CommandPacket),
    /// Run an arbitrary closure against the core
    Call(Box<dyn FnOnce(&mut GpuCore) + Send>),
    Shutdown,
}

struct QueueState {
    items: VecDeque<WorkItem>,
    /// True while the worker is executing an item it already popped
    busy: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    work_ready: Condvar,
    idle: Condvar,
}

/// Handle to a GPU core running on its own thread
pub struct ThreadedCore {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedCore {
    /// Move `core` onto a new worker thread
    pub fn spawn(mut core: GpuCore) -> Result<Self, GpuError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                busy: false,
            }),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("gpu-core".into())
            .spawn(move || loop {
                let item = {
                    let mut state = worker_shared.state.lock().expect("gpu queue lock poisoned");
                    loop {
                        if let Some(item) = state.items.pop_front() {
                            state.busy = true;
                            break item;
                        }
                        state = worker_shared
                            .work_ready
                            .wait(state)
                            .expect("gpu queue lock poisoned");
                    }
                };

                let shutdown = matches!(item, WorkItem::Shutdown);
                match item {
                    WorkItem::Apply(packet) => core.apply_packet(&packet),
                    WorkItem::Call(f) => f(&mut core),
                    WorkItem::Shutdown => {}
                }

                let mut state = worker_shared.state.lock().expect("gpu queue lock poisoned");
                state.busy = false;
                if state.items.is_empty() {
                    worker_shared.idle.notify_all();
                }
                if shutdown {
                    return;
                }
            })
            .map_err(|e| GpuError::WorkerSpawn {
                reason: e.to_string(),
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub(crate) fn push(&self, item: WorkItem) {
        let mut state = self.shared.state.lock().expect("gpu queue lock poisoned");
        state.items.push_back(item);
        self.shared.work_ready.notify_one();
    }

    /// Block until every queued item has finished executing
    pub fn sync(&self) {
        let mut state = self.shared.state.lock().expect("gpu queue lock poisoned");
        while !state.items.is_empty() || state.busy {
            state = self.shared.idle.wait(state).expect("gpu queue lock poisoned");
        }
    }

    /// Run `f` on the worker and return its result
    pub fn call<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut GpuCore) -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.push(WorkItem::Call(Box::new(move |core| {
            // The receiver only disappears if this thread panicked
            let _ = tx.send(f(core));
        })));
        rx.recv().expect("gpu worker dropped result channel")
    }
}

impl Drop for ThreadedCore {
    fn drop(&mut self) {
        self.push(WorkItem::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("gpu worker thread panicked");
            }
        }
    }
}
