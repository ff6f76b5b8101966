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

//! This module contains the self-pipe waker that interrupts the blocking
//! `poll(2)` wait.
//!
//! The worker parks indefinitely inside the readiness wait and cannot observe
//! any flag until it returns, so the only safe way to stop it is to make one
//! of the polled descriptors ready on purpose. The read end of this pipe
//! rides along at the tail of every poll set; writing a byte to the other end
//! lets the loop exit through its normal dispatch path instead of being
//! cancelled at an arbitrary point.

use crate::sys::syscall;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// A nonblocking pipe pair used to wake a parked `poll(2)` call.
pub(crate) struct Waker {
    reader: OwnedFd,
    writer: OwnedFd,
}

impl Waker {
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds: [RawFd; 2] = [-1, -1];
        syscall!(pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC | libc::O_NONBLOCK))?;
        // Safety:
        // `pipe2` succeeded, so both descriptors are open and owned by us.
        let (reader, writer) = unsafe {
            (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))
        };
        Ok(Self { reader, writer })
    }

    /// The descriptor the poll set watches for wakeups.
    pub(crate) fn fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    /// Makes the read end ready. A full pipe means a wakeup is already
    /// pending, so `EAGAIN` is success here.
    pub(crate) fn wake(&self) -> io::Result<()> {
        let buf = [1u8];
        match syscall!(write(self.writer.as_raw_fd(), buf.as_ptr() as *const _, 1)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Consumes every pending wakeup byte so the next pass blocks again.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 64];
        loop {
            match syscall!(read(
                self.reader.as_raw_fd(),
                buf.as_mut_ptr() as *mut _,
                buf.len(),
            )) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
}
