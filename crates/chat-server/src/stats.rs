// Copyright 2026 the poll-reactor contributors. All rights reserved.
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

//! This module contains the session counters shared between the handlers and
//! the shutdown path. An explicit `Arc`-shared struct, handed to whoever
//! needs it, instead of file-scope globals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one server run. Incremented from the reactor's worker thread,
/// read from the main thread at shutdown.
#[derive(Debug, Default)]
pub struct SessionStats {
    accepted: AtomicU64,
    disconnected: AtomicU64,
    relayed: AtomicU64,
}

impl SessionStats {
    pub fn record_accept(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay(&self) {
        self.relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn disconnected(&self) -> u64 {
        self.disconnected.load(Ordering::Relaxed)
    }

    pub fn relayed(&self) -> u64 {
        self.relayed.load(Ordering::Relaxed)
    }
}
