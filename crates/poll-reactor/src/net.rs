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

//! This module contains non-blocking socket operations for handlers.
//!
//! Handlers are invoked with a borrowed descriptor and must never block, so
//! `WouldBlock` is a first-class outcome here rather than an error: `accept`
//! and `recv` return `None` when the kernel has nothing for us yet.

use crate::sys::syscall;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

/// Accepts one pending connection on the listening descriptor `fd`. The
/// accepted socket is created non-blocking and close-on-exec. Returns
/// `Ok(None)` when no connection is pending.
pub fn accept(fd: BorrowedFd<'_>) -> io::Result<Option<OwnedFd>> {
    let result = syscall!(accept4(
        fd.as_raw_fd(),
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
    ));
    match result {
        // Safety:
        // `accept4` succeeded, so the returned descriptor is open and ours.
        Ok(conn) => Ok(Some(unsafe { OwnedFd::from_raw_fd(conn) })),
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}

/// Performs one bounded read from `fd` into `buf`. Returns `Ok(None)` when
/// the socket has no data yet and `Ok(Some(0))` on orderly peer shutdown.
pub fn recv(fd: BorrowedFd<'_>, buf: &mut [u8]) -> io::Result<Option<usize>> {
    let result = syscall!(recv(
        fd.as_raw_fd(),
        buf.as_mut_ptr() as *mut libc::c_void,
        buf.len(),
        0,
    ));
    match result {
        Ok(count) => Ok(Some(count as usize)),
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}

/// Writes as much of `buf` to `fd` as the socket accepts right now and
/// returns the number of bytes taken. A full send buffer is not an error;
/// relayed chat traffic is fire-and-forget and the unsent tail is dropped
/// rather than queued.
pub fn send(fd: BorrowedFd<'_>, buf: &[u8]) -> io::Result<usize> {
    let mut sent = 0;
    while sent < buf.len() {
        let result = syscall!(send(
            fd.as_raw_fd(),
            buf[sent..].as_ptr() as *const libc::c_void,
            buf.len() - sent,
            libc::MSG_NOSIGNAL,
        ));
        match result {
            Ok(count) => sent += count as usize,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(sent)
}
