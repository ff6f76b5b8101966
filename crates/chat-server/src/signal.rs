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

//! This module contains the SIGINT shutdown trigger.
//!
//! A signal handler can do almost nothing safely, so it only writes one byte
//! into a process-wide self-pipe; the main thread parks in a blocking read on
//! the other end and runs the actual teardown (reactor stop, descriptor
//! drain) in ordinary code once the byte arrives.

use once_cell::sync::OnceCell;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

struct ShutdownPipe {
    reader: OwnedFd,
    _writer: OwnedFd,
}

static PIPE: OnceCell<ShutdownPipe> = OnceCell::new();

// The handler cannot capture state, so the write end is mirrored here.
static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_sigint(_signum: libc::c_int) {
    let fd = WRITE_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        // write(2) is async-signal-safe; anything else here is not.
        let byte = 0u8;
        unsafe {
            libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
        }
    }
}

/// Creates the self-pipe and installs the SIGINT handler. Idempotent; the
/// pipe survives for the life of the process.
pub fn install() -> io::Result<()> {
    if PIPE.get().is_some() {
        return Ok(());
    }

    let mut fds: [RawFd; 2] = [-1, -1];
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    // Safety:
    // `pipe2` succeeded, so both descriptors are open and owned by us.
    let (reader, writer) = unsafe {
        (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))
    };
    WRITE_FD.store(writer.as_raw_fd(), Ordering::Relaxed);
    if PIPE
        .set(ShutdownPipe {
            reader,
            _writer: writer,
        })
        .is_err()
    {
        // Lost a racing install; point the handler back at the winner's pipe.
        if let Some(pipe) = PIPE.get() {
            WRITE_FD.store(pipe._writer.as_raw_fd(), Ordering::Relaxed);
        }
        return Ok(());
    }

    let handler = on_sigint as extern "C" fn(libc::c_int);
    let ret = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if ret == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Wakes [`wait`] from ordinary code, as if a signal had been delivered. The
/// server uses this to fold "the reactor died on its own" into the same
/// shutdown path as an interrupt.
pub fn notify() {
    on_sigint(0);
}

/// Blocks the calling thread until SIGINT is delivered (or [`notify`] is
/// called). `install` must have succeeded first.
pub fn wait() {
    let Some(pipe) = PIPE.get() else {
        return;
    };
    let mut byte = 0u8;
    loop {
        let ret = unsafe {
            libc::read(
                pipe.reader.as_raw_fd(),
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };
        // Retry on EINTR; any other outcome means delivery or a dead pipe.
        if ret >= 0 || io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
            return;
        }
    }
}
