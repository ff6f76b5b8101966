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

//! This module contains the reactor facade and its poll/dispatch loop.
//!
//! The loop runs on a dedicated worker thread, one pass at a time: snapshot
//! the registration list, block in `poll(2)` with no timeout, then dispatch
//! every ready descriptor in registration order. The registration list is
//! touched by exactly one thread at a time; the only cross-thread state is
//! the lifecycle flag, the worker handle, and the wake pipe.

use crate::error::Error;
use crate::handler::{Context, EventHandler, Verdict};
use crate::interest::Interest;
use crate::registry::{Entry, EntryId, Registry};
use crate::sys::poll::{poll, Events};
use crate::waker::Waker;
use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Lifecycle state of a reactor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// Created, worker not yet spawned.
    Idle = 0,
    /// Worker spawned and the loop turning.
    Running = 1,
    /// Worker exited, by request or on an engine fault. Terminal.
    Stopped = 2,
}

impl State {
    fn from_u8(value: u8) -> State {
        match value {
            0 => State::Idle,
            1 => State::Running,
            _ => State::Stopped,
        }
    }
}

/// What one pass does with one ready poll slot. Factored out of the loop so
/// the policy is testable without a live socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassAction {
    /// Nothing reported for this slot.
    Skip,
    /// Invoke the entry's handler.
    Dispatch,
    /// Unlink and close without invoking the handler.
    Discard,
    /// The listening descriptor itself failed; the reactor cannot accept
    /// again, so the whole loop aborts.
    Fatal,
}

/// Readable wins over hangup: EOF arrives as `POLLIN` (possibly with
/// `POLLHUP` alongside) and must reach the handler so the zero-length read
/// turns into a `Verdict::Remove` there, keeping disconnect handling in one
/// place.
fn classify(is_listener: bool, readable: bool, failed: bool) -> PassAction {
    if readable {
        PassAction::Dispatch
    } else if failed {
        if is_listener {
            PassAction::Fatal
        } else {
            PassAction::Discard
        }
    } else {
        PassAction::Skip
    }
}

struct Core {
    registry: Mutex<Registry>,
    state: AtomicU8,
    waker: Waker,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    fault: Mutex<Option<io::Error>>,
}

impl Core {
    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .expect("should acquire the registry lock")
    }
}

/// The reactor facade: a cheaply cloneable handle over the registration list,
/// the poll/dispatch worker, and the lifecycle flag.
///
/// The normal embedding sequence is: [`register`](Reactor::register) the
/// listening descriptor, [`start`](Reactor::start), and eventually
/// [`stop`](Reactor::stop) followed by [`drain`](Reactor::drain). Accepted
/// connections are registered from inside the accept handler through its
/// dispatch [`Context`], never through this facade.
#[derive(Clone)]
pub struct Reactor {
    core: Arc<Core>,
}

impl Reactor {
    /// Creates an empty, not-started reactor.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            core: Arc::new(Core {
                registry: Mutex::new(Registry::default()),
                state: AtomicU8::new(State::Idle as u8),
                waker: Waker::new()?,
                worker: Mutex::new(None),
                fault: Mutex::new(None),
            }),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.core.state()
    }

    /// Appends `fd` and its handler at the tail of the registration list.
    /// The reactor takes ownership of the descriptor and closes it when the
    /// entry is removed or drained.
    ///
    /// Before the first `start` this is the listener path. While the loop is
    /// running the call is still safe: the wake pipe is signalled so the
    /// in-flight poll re-snapshots and picks up the new entry next pass.
    pub fn register(
        &self,
        fd: impl Into<OwnedFd>,
        interest: Interest,
        handler: Box<dyn EventHandler>,
    ) -> EntryId {
        let id = self.core.registry().register(fd.into(), interest, handler);
        if self.core.state() == State::Running {
            if let Err(err) = self.core.waker.wake() {
                tracing::warn!(%err, "failed to wake the running loop after register");
            }
        }
        id
    }

    /// Spawns the worker and starts the poll/dispatch loop.
    ///
    /// Starting an already-running reactor is a logged no-op. Starting with
    /// an empty registration list is refused without spawning anything, since
    /// a loop with nothing to poll could never make progress.
    pub fn start(&self) -> Result<(), Error> {
        match self.core.state() {
            State::Running => {
                tracing::warn!("reactor already running; start ignored");
                return Ok(());
            }
            State::Stopped => {
                tracing::warn!("reactor already stopped; start ignored");
                return Ok(());
            }
            State::Idle => {}
        }
        if self.core.registry().is_empty() {
            return Err(Error::EmptyRegistry);
        }

        // Flip the flag before the spawn so a concurrent `stop` can never
        // observe a running reactor without a worker on the way.
        self.core
            .state
            .store(State::Running as u8, Ordering::SeqCst);
        let core = Arc::clone(&self.core);
        let spawned = thread::Builder::new()
            .name("poll-reactor".into())
            .spawn(move || {
                tracing::info!("reactor started");
                match run(&core) {
                    Ok(()) => tracing::info!("reactor stopped"),
                    Err(err) => {
                        tracing::error!(%err, "poll/dispatch loop aborted");
                        *core.fault.lock().expect("should record the loop fault") = Some(err);
                    }
                }
                core.state.store(State::Stopped as u8, Ordering::SeqCst);
            });
        match spawned {
            Ok(handle) => {
                *self
                    .core
                    .worker
                    .lock()
                    .expect("should store the worker handle") = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.core.state.store(State::Idle as u8, Ordering::SeqCst);
                Err(Error::Io(err))
            }
        }
    }

    /// Requests the loop to exit and waits until the worker is fully stopped.
    ///
    /// The wake pipe interrupts the indefinite `poll(2)` wait; the worker
    /// observes the request at the top of its next pass, so a handler that is
    /// mid-execution always runs to completion, and the remaining dispatches
    /// of that pass are abandoned before being invoked. Stopping a reactor
    /// that is not running only joins whatever worker is left, if any. Must
    /// not be called from a handler.
    pub fn stop(&self) {
        let state = &self.core.state;
        if state
            .compare_exchange(
                State::Running as u8,
                State::Stopped as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            tracing::debug!("stop requested");
            if let Err(err) = self.core.waker.wake() {
                tracing::error!(%err, "failed to wake the loop for shutdown");
            }
        }
        self.join_worker();
    }

    /// Blocks until the worker exits, then surfaces the engine fault, if the
    /// loop aborted on one, exactly once. Idempotent no-op when no worker is
    /// or was running.
    pub fn join(&self) -> Result<(), Error> {
        self.join_worker();
        match self
            .core
            .fault
            .lock()
            .expect("should take the loop fault")
            .take()
        {
            Some(err) => Err(Error::Io(err)),
            None => Ok(()),
        }
    }

    /// Unlinks every remaining entry, closing all descriptors still
    /// registered. Refused while the worker is running; call after `stop`.
    /// Returns how many entries were released.
    pub fn drain(&self) -> Result<usize, Error> {
        if self.core.state() == State::Running {
            return Err(Error::Running);
        }
        let mut registry = self.core.registry();
        let count = registry.len();
        registry.clear();
        Ok(count)
    }

    // Holds the lock across the join so concurrent joiners serialize: the
    // loser blocks until the winner has seen the worker exit, and only then
    // observes the emptied slot.
    fn join_worker(&self) {
        let mut worker = self
            .core
            .worker
            .lock()
            .expect("should take the worker handle");
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                tracing::error!("reactor worker panicked");
            }
        }
    }
}

/// The poll/dispatch loop body. One iteration is one pass.
fn run(core: &Core) -> io::Result<()> {
    let mut pending: Vec<Entry> = Vec::new();
    loop {
        let snapshot = core.registry().snapshot();

        let mut events = Events::with_capacity(snapshot.len() + 1);
        for (fd, interest) in &snapshot {
            events.push(*fd, *interest);
        }
        // The wake pipe rides along at the tail so the listener keeps
        // position 0. Any poll failure here is engine-fatal by contract;
        // EINTR never surfaces from the wrapper.
        events.push(core.waker.fd(), Interest::READABLE);
        poll(&mut events, None)?;

        if events[snapshot.len()].is_readable() {
            core.waker.drain();
            if core.state() != State::Running {
                return Ok(());
            }
            // Spurious wake (e.g. a register while running): fall through and
            // dispatch whatever else this pass reported.
        }

        let listener = snapshot[0].0;
        let mut registry = core.registry();
        for slot in events.iter().take(snapshot.len()) {
            let fd = slot.fd();
            let failed = slot.is_error() || slot.is_hangup();
            match classify(fd == listener, slot.is_readable(), failed) {
                PassAction::Skip => {}
                PassAction::Dispatch => {
                    dispatch(&mut registry, &mut pending, fd, fd == listener);
                }
                PassAction::Discard => {
                    if registry.remove(fd) {
                        tracing::info!(fd, "connection dropped on hangup");
                    }
                }
                PassAction::Fatal => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "listening descriptor reported hangup or error",
                    ));
                }
            }
        }
        registry.append(pending.drain(..));
    }
}

/// Invokes the handler of the entry matching `fd` and applies its verdict.
///
/// The handler is swapped out of its slot for the duration of the call, so
/// the entry table stays shareable for peer iteration while the handler runs.
/// A slot whose entry was already removed earlier in the same pass simply no
/// longer matches and is skipped; matching is by descriptor value, so one
/// removal can never shift which entry a later slot refers to.
fn dispatch(registry: &mut Registry, pending: &mut Vec<Entry>, fd: RawFd, is_listener: bool) {
    let Some(index) = registry.position(fd) else {
        return;
    };
    let Some(mut handler) = registry.entries[index].take_handler() else {
        return;
    };

    let verdict = {
        let Registry { entries, next } = &mut *registry;
        let entries: &[Entry] = entries.as_slice();
        let mut ctx = Context {
            entries,
            next,
            pending,
            current: fd,
        };
        handler.on_ready(entries[index].fd(), &mut ctx)
    };

    match verdict {
        Verdict::Keep => registry.entries[index].put_handler(handler),
        Verdict::Remove if is_listener => {
            // Listener immortality: its verdict is advisory at most.
            tracing::warn!(fd, "listener handler requested removal; ignored");
            registry.entries[index].put_handler(handler);
        }
        Verdict::Remove => {
            drop(handler);
            registry.remove(fd);
            tracing::info!(fd, "connection closed by handler verdict");
        }
    }
}
