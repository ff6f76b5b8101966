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

//! This module contains the per-descriptor handler contract of the reactor.
//!
//! A handler is invoked from the dispatch pass, on the reactor's worker
//! thread, whenever its descriptor reports readiness. Handlers come in two
//! capabilities: accept-style handlers that register new entries through the
//! [`Context`], and stream-style handlers that consume data and may request
//! their own removal through their [`Verdict`].

use crate::interest::Interest;
use crate::registry::{Entry, EntryId};
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};

/// The outcome of one handler invocation, and the sole removal signal the
/// reactor knows: `Remove` unlinks the entry and closes its descriptor before
/// the current pass ends. The verdict of the listener entry (position 0) is
/// ignored; the listener is only torn down with the reactor itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the entry registered.
    Keep,
    /// Unlink the entry and close its descriptor.
    Remove,
}

/// Per-descriptor readiness callback.
///
/// Handlers run sequentially on the worker thread, never in parallel with one
/// another, and are expected to be non-blocking: one bounded `recv`/`send` (or
/// an accept-until-`WouldBlock` drain) per invocation. A handler that blocks
/// stalls every other descriptor of the reactor.
pub trait EventHandler: Send {
    /// Called when `fd` reports readiness. `ctx` gives access to the rest of
    /// the registration list for the duration of this invocation.
    fn on_ready(&mut self, fd: BorrowedFd<'_>, ctx: &mut Context<'_>) -> Verdict;
}

/// The dispatch-scoped view of the reactor handed to a running handler.
///
/// Registrations made here are buffered and appended to the registration list
/// when the current pass finishes, so an entry registered during pass K is
/// first considered for dispatch in pass K+1. A freshly accepted connection
/// therefore never sees a spurious empty read in the round that accepted it.
pub struct Context<'a> {
    pub(crate) entries: &'a [Entry],
    pub(crate) next: &'a mut EntryId,
    pub(crate) pending: &'a mut Vec<Entry>,
    pub(crate) current: RawFd,
}

impl Context<'_> {
    /// Registers `fd` with the reactor, effective from the next pass. The
    /// reactor takes ownership of the descriptor and closes it on removal.
    pub fn register(
        &mut self,
        fd: impl Into<OwnedFd>,
        interest: Interest,
        handler: Box<dyn EventHandler>,
    ) -> EntryId {
        let id = self.next.advance();
        self.pending.push(Entry::new(id, fd.into(), interest, handler));
        id
    }

    /// Iterates over the descriptors of every other registered entry,
    /// excluding the listener (position 0) and the entry currently being
    /// dispatched. This is the relay surface: a chat handler writes to each
    /// peer returned here.
    pub fn peers(&self) -> impl Iterator<Item = BorrowedFd<'_>> {
        let current = self.current;
        self.entries
            .iter()
            .skip(1)
            .filter(move |entry| entry.fd().as_raw_fd() != current)
            .map(|entry| entry.fd())
    }
}
