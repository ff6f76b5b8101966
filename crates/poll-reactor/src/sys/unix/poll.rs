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

//! This module contains the implementation of UNIX `poll(2)` bindings.

use crate::interest::Interest;
use std::ops::{Deref, DerefMut};
use std::os::fd::RawFd;
use std::time::Duration;
use std::{io, mem};

/// Represents the Rust wrapper around a libc `pollfd`. This wrapper is
/// essentially equivalent to `libc::pollfd` and exposes the `revents` bits as
/// predicate methods. It implements `Deref` and `DerefMut` to delegate the
/// underlying `libc::pollfd` fields.
///
/// # See also:
/// [poll(2)](https://man7.org/linux/man-pages/man2/poll.2.html)
#[repr(transparent)]
pub(crate) struct Event(libc::pollfd);

impl Event {
    /// Returns the file descriptor this slot was armed with.
    pub(crate) fn fd(&self) -> RawFd {
        self.0.fd
    }

    /// Returns `true` if the `pollfd` reports data available to read.
    pub(crate) fn is_readable(&self) -> bool {
        (self.0.revents & libc::POLLIN) != 0
    }

    /// Returns `true` if the peer hung up on the associated descriptor.
    pub(crate) fn is_hangup(&self) -> bool {
        (self.0.revents & libc::POLLHUP) != 0
    }

    /// Returns `true` if an error condition is pending on the associated
    /// descriptor, or if the descriptor number itself is not open.
    pub(crate) fn is_error(&self) -> bool {
        (self.0.revents & (libc::POLLERR | libc::POLLNVAL)) != 0
    }
}

impl Deref for Event {
    type Target = libc::pollfd;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Event {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Represents the Rust wrapper around a `pollfd` array, i.e. the set of
/// descriptors one `poll(2)` invocation watches. This wrapper consists of
/// `Event` elements and implements `Deref` and `DerefMut` to delegate the
/// underlying `Vec` methods.
///
/// # See also:
/// [poll(2)](https://man7.org/linux/man-pages/man2/poll.2.html)
#[derive(Default)]
pub(crate) struct Events(Vec<Event>);

impl Events {
    /// Creates `Events` with a given `capacity`.
    pub(crate) fn with_capacity(capacity: usize) -> Events {
        Events(Vec::with_capacity(capacity))
    }

    /// Arms a slot for the given `fd`, watching for the events specified by
    /// `interest`. Slot order is preserved; the caller relies on index
    /// correspondence between the armed set and the reported set.
    pub(crate) fn push(&mut self, fd: RawFd, interest: Interest) {
        let mut events: libc::c_short = 0;
        if interest.is_readable() {
            events |= libc::POLLIN;
        }
        if interest.is_writable() {
            events |= libc::POLLOUT;
        }
        self.0.push(Event(libc::pollfd {
            fd,
            events,
            revents: 0,
        }));
    }
}

impl Deref for Events {
    type Target = Vec<Event>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Events {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Represents the `nfds_t` count of watched descriptors.
///
/// # See also:
/// [poll(2)](https://man7.org/linux/man-pages/man2/poll.2.html)
type Count = libc::nfds_t;

/// Represents the millisecond timeout argument; `-1` blocks indefinitely.
///
/// # See also:
/// [poll(2)](https://man7.org/linux/man-pages/man2/poll.2.html)
type Timeout = libc::c_int;

/// Blocks until at least one armed slot in `events` reports activity, or the
/// given `timeout` elapses. A `timeout` of `None` blocks indefinitely, which
/// is the reactor's steady state. Returns the number of slots with non-zero
/// `revents`.
///
/// `EINTR` is retried here: a signal delivery is not an engine fault, and
/// according to `poll(2)` no `revents` have been reported when it occurs.
pub(crate) fn poll(events: &mut Events, timeout: Option<Duration>) -> io::Result<usize> {
    let timeout: Timeout = match timeout {
        Some(duration) => duration
            .as_millis()
            .try_into()
            .unwrap_or(Timeout::MAX),
        None => -1,
    };
    loop {
        // Safety:
        // `Event` is a `repr(transparent)` wrapper over `libc::pollfd`, so the
        // slice of events can be handed to the kernel as a `pollfd` array.
        let result = syscall!(poll(
            events.as_mut_ptr() as *mut libc::pollfd,
            events.len() as Count,
            timeout,
        ));
        match result {
            Ok(ready) => return Ok(ready as usize),
            Err(err) if err.raw_os_error() == Some(libc::EINTR) => continue,
            Err(err) => return Err(err),
        }
    }
}

// Keeps `Event` bit-compatible with `libc::pollfd` for the cast above.
const _: () = assert!(mem::size_of::<Event>() == mem::size_of::<libc::pollfd>());
