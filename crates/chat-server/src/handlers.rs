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

//! This module contains the two reactor handlers of the chat server: the
//! acceptor on the listening socket and the per-client chat handler.

use crate::stats::SessionStats;
use poll_reactor::{net, Context, EventHandler, Interest, Verdict};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::Arc;

/// Upper bound for one read; one readiness event consumes at most this much.
const RECV_BUFFER: usize = 1024;

/// Listener handler: drains every pending connection and registers each with
/// a [`ChatHandler`]. Always keeps the listener registered.
pub struct Acceptor {
    stats: Arc<SessionStats>,
}

impl Acceptor {
    pub fn new(stats: Arc<SessionStats>) -> Self {
        Self { stats }
    }
}

impl EventHandler for Acceptor {
    fn on_ready(&mut self, fd: BorrowedFd<'_>, ctx: &mut Context<'_>) -> Verdict {
        loop {
            match net::accept(fd) {
                Ok(Some(conn)) => {
                    let client = conn.as_raw_fd();
                    ctx.register(
                        conn,
                        Interest::READABLE,
                        Box::new(ChatHandler::new(Arc::clone(&self.stats))),
                    );
                    self.stats.record_accept();
                    tracing::info!(client, "connection accepted");
                }
                Ok(None) => break,
                Err(err) => {
                    // A botched accept burns one pending connection at most;
                    // the listener itself stays usable.
                    tracing::warn!(%err, "accept failed");
                    break;
                }
            }
        }
        Verdict::Keep
    }
}

/// Per-client handler: one bounded read per readiness event, relayed to every
/// other client as `client <fd>: <text>`.
pub struct ChatHandler {
    stats: Arc<SessionStats>,
}

impl ChatHandler {
    pub fn new(stats: Arc<SessionStats>) -> Self {
        Self { stats }
    }
}

impl EventHandler for ChatHandler {
    fn on_ready(&mut self, fd: BorrowedFd<'_>, ctx: &mut Context<'_>) -> Verdict {
        let mut buf = [0u8; RECV_BUFFER];
        let count = match net::recv(fd, &mut buf) {
            Ok(Some(0)) => {
                self.stats.record_disconnect();
                tracing::info!(client = fd.as_raw_fd(), "client disconnected");
                return Verdict::Remove;
            }
            Ok(Some(count)) => count,
            Ok(None) => return Verdict::Keep,
            Err(err) => {
                self.stats.record_disconnect();
                tracing::info!(client = fd.as_raw_fd(), %err, "client read failed");
                return Verdict::Remove;
            }
        };

        let text = scrub(&buf[..count]);
        if text.is_empty() {
            return Verdict::Keep;
        }
        let line = format!("client {}: {}\n", fd.as_raw_fd(), text);
        for peer in ctx.peers() {
            if let Err(err) = net::send(peer, line.as_bytes()) {
                tracing::warn!(peer = peer.as_raw_fd(), %err, "relay failed");
            }
        }
        self.stats.record_relay();
        tracing::debug!(client = fd.as_raw_fd(), bytes = count, "message relayed");
        Verdict::Keep
    }
}

/// Reduces a raw payload to printable text: valid UTF-8 only, control bytes
/// other than newline and tab stripped, trailing whitespace removed. The
/// relayed message ends with exactly one newline no matter what the sender
/// pushed in.
pub fn scrub(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .chars()
        .filter(|ch| !ch.is_control() || *ch == '\n' || *ch == '\t')
        .collect::<String>()
        .trim_end()
        .to_string()
}
