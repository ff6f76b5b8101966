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

//! This module contains the ordered registration list of the reactor.
//!
//! Order is meaningful: dispatch follows registration order, and the entry at
//! position 0 is by convention the listening socket. Removal is always keyed
//! by descriptor value, never by position in a poll set, so a removal that
//! happens mid-pass can never shift the correspondence for the slots that
//! follow it.

use crate::handler::EventHandler;
use crate::interest::Interest;
use std::fmt;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

/// Identifies a registration for the lifetime of the reactor. Ids are handed
/// out from a monotonically increasing counter and never reused, unlike the
/// descriptor numbers they track.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    /// Returns the copy of the current `EntryId` and increments the internal
    /// counter.
    pub(crate) fn advance(&mut self) -> Self {
        let ret = Self(self.0);
        self.0 += 1;
        ret
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// One registered descriptor paired with its handler.
///
/// The entry owns the descriptor: dropping the entry closes it. The handler
/// slot is `None` only while that handler is executing, which lets the
/// dispatch pass hold a shared view of the list for peer iteration without
/// aliasing the handler's own mutable state.
pub(crate) struct Entry {
    id: EntryId,
    fd: OwnedFd,
    interest: Interest,
    handler: Option<Box<dyn EventHandler>>,
}

impl Entry {
    pub(crate) fn new(
        id: EntryId,
        fd: OwnedFd,
        interest: Interest,
        handler: Box<dyn EventHandler>,
    ) -> Self {
        Self {
            id,
            fd,
            interest,
            handler: Some(handler),
        }
    }

    pub(crate) fn id(&self) -> EntryId {
        self.id
    }

    pub(crate) fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub(crate) fn take_handler(&mut self) -> Option<Box<dyn EventHandler>> {
        self.handler.take()
    }

    pub(crate) fn put_handler(&mut self, handler: Box<dyn EventHandler>) {
        self.handler = Some(handler);
    }
}

/// The ordered registration list, owned by the reactor and mutated only by
/// the dispatch loop while it runs.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) entries: Vec<Entry>,
    pub(crate) next: EntryId,
}

impl Registry {
    /// Appends an entry at the tail and returns its id. No uniqueness check
    /// is made: descriptors are unique in practice because the OS does not
    /// reuse a number that is still open, and the stale-fd invariant is kept
    /// by closing descriptors only through entry removal.
    pub(crate) fn register(
        &mut self,
        fd: OwnedFd,
        interest: Interest,
        handler: Box<dyn EventHandler>,
    ) -> EntryId {
        let id = self.next.advance();
        self.entries.push(Entry::new(id, fd, interest, handler));
        id
    }

    /// Unlinks the first non-listener entry whose descriptor matches `fd` and
    /// closes the descriptor. Removing the listener (position 0) is refused.
    /// Returns `false` when no such entry exists, which a pass treats as an
    /// already-handled slot.
    pub(crate) fn remove(&mut self, fd: RawFd) -> bool {
        match self.position(fd) {
            Some(0) => {
                tracing::warn!(fd, "refusing to remove the listener entry");
                false
            }
            Some(index) => {
                let entry = self.entries.remove(index);
                tracing::debug!(fd, id = %entry.id(), "descriptor unregistered");
                true
            }
            None => false,
        }
    }

    /// Returns the position of the first entry matching `fd`, if any.
    pub(crate) fn position(&self, fd: RawFd) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.fd.as_raw_fd() == fd)
    }

    /// Produces the point-in-time `(descriptor, interest)` sequence one pass
    /// polls over, listener first. Decoupling the polled set from the live
    /// list is what makes mid-pass mutation safe.
    pub(crate) fn snapshot(&self) -> Vec<(RawFd, Interest)> {
        self.entries
            .iter()
            .map(|entry| (entry.fd.as_raw_fd(), entry.interest))
            .collect()
    }

    pub(crate) fn append(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.extend(entries);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every entry, closing all remaining descriptors. Teardown only;
    /// the caller must know the worker is quiesced.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Context, Verdict};
    use pretty_assertions::assert_eq;
    use std::os::fd::{AsRawFd, BorrowedFd};
    use std::os::unix::net::UnixStream;

    struct Noop;

    impl EventHandler for Noop {
        fn on_ready(&mut self, _fd: BorrowedFd<'_>, _ctx: &mut Context<'_>) -> Verdict {
            Verdict::Keep
        }
    }

    fn sockets(count: usize) -> Vec<UnixStream> {
        (0..count)
            .flat_map(|_| {
                let (left, right) = UnixStream::pair().unwrap();
                [left, right]
            })
            .take(count)
            .collect()
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let mut registry = Registry::default();
        let socks = sockets(3);
        let fds: Vec<RawFd> = socks.iter().map(|s| s.as_raw_fd()).collect();
        for sock in socks {
            registry.register(sock.into(), Interest::READABLE, Box::new(Noop));
        }

        let snapshot: Vec<RawFd> = registry.snapshot().iter().map(|(fd, _)| *fd).collect();
        assert_eq!(snapshot, fds);
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut registry = Registry::default();
        let socks = sockets(3);
        let fd1 = socks[1].as_raw_fd();
        let mut ids = Vec::new();
        for sock in socks {
            ids.push(registry.register(sock.into(), Interest::READABLE, Box::new(Noop)));
        }

        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
        assert!(registry.remove(fd1));
        let (left, _right) = UnixStream::pair().unwrap();
        let late = registry.register(left.into(), Interest::READABLE, Box::new(Noop));
        assert!(late > ids[2]);
    }

    #[test]
    fn remove_matches_by_descriptor_value() {
        let mut registry = Registry::default();
        let socks = sockets(4);
        let fds: Vec<RawFd> = socks.iter().map(|s| s.as_raw_fd()).collect();
        for sock in socks {
            registry.register(sock.into(), Interest::READABLE, Box::new(Noop));
        }

        // Removing a middle entry must not disturb the entries around it.
        assert!(registry.remove(fds[2]));
        let snapshot: Vec<RawFd> = registry.snapshot().iter().map(|(fd, _)| *fd).collect();
        assert_eq!(snapshot, vec![fds[0], fds[1], fds[3]]);
        assert!(!registry.remove(fds[2]));
    }

    #[test]
    fn listener_entry_cannot_be_removed() {
        let mut registry = Registry::default();
        let socks = sockets(2);
        let listener_fd = socks[0].as_raw_fd();
        for sock in socks {
            registry.register(sock.into(), Interest::READABLE, Box::new(Noop));
        }

        assert!(!registry.remove(listener_fd));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position(listener_fd), Some(0));
    }

    #[test]
    fn clear_closes_everything() {
        let mut registry = Registry::default();
        let socks = sockets(2);
        for sock in socks {
            registry.register(sock.into(), Interest::READABLE, Box::new(Noop));
        }

        registry.clear();
        assert!(registry.is_empty());
    }
}
