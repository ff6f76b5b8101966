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

//! This module contains the error type of the reactor surface.

use std::io;

/// Errors reported by the [`Reactor`](crate::Reactor) facade.
///
/// Misuse conditions that the reactor tolerates as no-ops (double start,
/// stopping a reactor that is not running) are logged rather than surfaced
/// here; this type covers the conditions a caller has to act on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reactor was asked to start with no registered descriptors.
    #[error("cannot start a reactor with no registered descriptors")]
    EmptyRegistry,

    /// An operation that requires a quiesced reactor was attempted while the
    /// worker is still running.
    #[error("reactor is still running")]
    Running,

    /// The poll/dispatch loop aborted on an engine-fatal condition, or an
    /// OS-level operation on the reactor's own resources failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
