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

//! This crate contains a TCP chat/broadcast server: thin glue around the
//! `poll-reactor` event loop. The listener's handler accepts connections;
//! every connected client's handler reads one bounded chunk per readiness
//! event, scrubs it down to printable text, and relays the formatted line to
//! every other client.

pub mod handlers;
pub mod signal;
pub mod stats;

pub use crate::handlers::{Acceptor, ChatHandler};
pub use crate::stats::SessionStats;
