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

//! This crate contains a readiness-based I/O event loop built directly on the
//! `poll(2)` system call. A [`Reactor`] owns an ordered list of registered file
//! descriptors, each paired with an [`EventHandler`], and runs a poll/dispatch
//! loop on a dedicated worker thread: every pass snapshots the registration
//! list, blocks until the kernel reports activity, then invokes the handler of
//! each ready descriptor in registration order. Handlers signal their own
//! removal through their return value; nothing else unregisters a descriptor.
//!
//! The first registered entry is, by convention, the listening socket. Its
//! handler accepts connections and registers them; it is never removed by a
//! handler outcome, and losing it (hangup or error on the listening
//! descriptor) is fatal to the whole reactor.

mod error;
pub mod handler;
mod interest;
pub mod net;
mod reactor;
mod registry;
mod sys;
mod waker;

pub use crate::error::Error;
pub use crate::handler::{Context, EventHandler, Verdict};
pub use crate::interest::Interest;
pub use crate::reactor::{Reactor, State};
pub use crate::registry::EntryId;
