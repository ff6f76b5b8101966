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

//! End-to-end tests driving a live reactor over loopback TCP. Handlers report
//! what happened through an mpsc channel so the test thread can follow the
//! worker without sleeping.

use poll_reactor::{net, Context, Error, EventHandler, Interest, Reactor, State, Verdict};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq, Eq)]
enum Report {
    Accepted(RawFd),
    Data(RawFd, Vec<u8>),
    Eof(RawFd),
}

/// Accept-style handler: drains pending connections and registers each with
/// a `Recorder`.
struct Acceptor {
    tx: Sender<Report>,
}

impl EventHandler for Acceptor {
    fn on_ready(&mut self, fd: BorrowedFd<'_>, ctx: &mut Context<'_>) -> Verdict {
        while let Some(conn) = net::accept(fd).unwrap() {
            let conn_fd = conn.as_raw_fd();
            ctx.register(
                conn,
                Interest::READABLE,
                Box::new(Recorder {
                    tx: self.tx.clone(),
                }),
            );
            self.tx.send(Report::Accepted(conn_fd)).unwrap();
        }
        Verdict::Keep
    }
}

/// Stream-style handler: one bounded read per invocation, removal on EOF.
struct Recorder {
    tx: Sender<Report>,
}

impl EventHandler for Recorder {
    fn on_ready(&mut self, fd: BorrowedFd<'_>, _ctx: &mut Context<'_>) -> Verdict {
        let mut buf = [0u8; 1024];
        match net::recv(fd, &mut buf) {
            Ok(Some(0)) | Err(_) => {
                self.tx.send(Report::Eof(fd.as_raw_fd())).unwrap();
                Verdict::Remove
            }
            Ok(Some(count)) => {
                self.tx
                    .send(Report::Data(fd.as_raw_fd(), buf[..count].to_vec()))
                    .unwrap();
                Verdict::Keep
            }
            Ok(None) => Verdict::Keep,
        }
    }
}

/// Accept-style handler that asks for its own removal on every invocation;
/// the loop must ignore that verdict for the listener slot.
struct ResigningAcceptor {
    tx: Sender<Report>,
}

impl EventHandler for ResigningAcceptor {
    fn on_ready(&mut self, fd: BorrowedFd<'_>, ctx: &mut Context<'_>) -> Verdict {
        while let Some(conn) = net::accept(fd).unwrap() {
            let conn_fd = conn.as_raw_fd();
            ctx.register(
                conn,
                Interest::READABLE,
                Box::new(Recorder {
                    tx: self.tx.clone(),
                }),
            );
            self.tx.send(Report::Accepted(conn_fd)).unwrap();
        }
        Verdict::Remove
    }
}

fn spawn_server(tx: &Sender<Report>) -> (Reactor, TcpStreamFactory) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let reactor = Reactor::new().unwrap();
    reactor.register(
        listener,
        Interest::READABLE,
        Box::new(Acceptor { tx: tx.clone() }),
    );
    reactor.start().unwrap();
    (reactor, TcpStreamFactory { addr })
}

struct TcpStreamFactory {
    addr: std::net::SocketAddr,
}

impl TcpStreamFactory {
    fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).unwrap()
    }
}

fn expect(rx: &Receiver<Report>) -> Report {
    rx.recv_timeout(TICK).expect("timed out waiting on the reactor")
}

#[test]
fn starting_with_no_entries_is_refused() {
    let reactor = Reactor::new().unwrap();
    assert!(matches!(reactor.start(), Err(Error::EmptyRegistry)));
    assert_eq!(reactor.state(), State::Idle);
    // No worker was spawned, so join has nothing to wait on or surface.
    reactor.join().unwrap();
}

#[test]
fn lifecycle_is_idempotent() {
    let (tx, _rx) = std::sync::mpsc::channel();
    let (reactor, _factory) = spawn_server(&tx);

    // Double start is a no-op, not an error.
    reactor.start().unwrap();
    assert_eq!(reactor.state(), State::Running);

    reactor.stop();
    assert_eq!(reactor.state(), State::Stopped);
    // Stop and join again: fully quiesced either way.
    reactor.stop();
    reactor.join().unwrap();

    assert_eq!(reactor.drain().unwrap(), 1);
    assert_eq!(reactor.drain().unwrap(), 0);
}

#[test]
fn drain_is_refused_while_running() {
    let (tx, _rx) = std::sync::mpsc::channel();
    let (reactor, _factory) = spawn_server(&tx);

    assert!(matches!(reactor.drain(), Err(Error::Running)));
    reactor.stop();
    assert_eq!(reactor.drain().unwrap(), 1);
}

#[test]
fn accepts_reads_and_removes_on_eof() {
    let (tx, rx) = std::sync::mpsc::channel();
    let (reactor, factory) = spawn_server(&tx);

    let mut client = factory.connect();
    let fd = match expect(&rx) {
        Report::Accepted(fd) => fd,
        other => panic!("expected an accept, got {other:?}"),
    };

    // A freshly accepted connection gets no spurious dispatch: nothing may
    // arrive until the client actually writes.
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(100)),
        Err(RecvTimeoutError::Timeout)
    );

    client.write_all(b"hi").unwrap();
    assert_eq!(expect(&rx), Report::Data(fd, b"hi".to_vec()));

    // Still registered after a successful read.
    client.write_all(b"again").unwrap();
    assert_eq!(expect(&rx), Report::Data(fd, b"again".to_vec()));

    drop(client);
    assert_eq!(expect(&rx), Report::Eof(fd));

    reactor.stop();
    reactor.join().unwrap();
    reactor.drain().unwrap();
}

#[test]
fn one_client_dropping_leaves_the_other_untouched() {
    let (tx, rx) = std::sync::mpsc::channel();
    let (reactor, factory) = spawn_server(&tx);

    let first = factory.connect();
    let fd_first = match expect(&rx) {
        Report::Accepted(fd) => fd,
        other => panic!("expected an accept, got {other:?}"),
    };
    let mut second = factory.connect();
    let fd_second = match expect(&rx) {
        Report::Accepted(fd) => fd,
        other => panic!("expected an accept, got {other:?}"),
    };

    drop(first);
    assert_eq!(expect(&rx), Report::Eof(fd_first));

    // The survivor keeps its registration and its descriptor.
    second.write_all(b"still here").unwrap();
    assert_eq!(expect(&rx), Report::Data(fd_second, b"still here".to_vec()));

    reactor.stop();
    reactor.drain().unwrap();
}

#[test]
fn listener_failure_is_fatal_and_surfaced_once() {
    // A pipe write-end whose read-end is gone reports POLLERR and never
    // POLLIN, which is exactly a dead listener from the loop's point of view.
    let mut fds: [RawFd; 2] = [-1, -1];
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    assert_eq!(ret, 0);
    let (reader, writer) = unsafe {
        (
            std::os::fd::OwnedFd::from_raw_fd(fds[0]),
            std::os::fd::OwnedFd::from_raw_fd(fds[1]),
        )
    };
    drop(reader);

    let (tx, _rx) = std::sync::mpsc::channel();
    let reactor = Reactor::new().unwrap();
    reactor.register(writer, Interest::READABLE, Box::new(Acceptor { tx }));
    reactor.start().unwrap();

    // The loop aborts on its own; join surfaces the fault exactly once.
    assert!(matches!(reactor.join(), Err(Error::Io(_))));
    assert_eq!(reactor.state(), State::Stopped);
    reactor.join().unwrap();
    assert_eq!(reactor.drain().unwrap(), 1);
}

#[test]
fn listener_survives_its_own_remove_verdict() {
    let (tx, rx) = std::sync::mpsc::channel();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let reactor = Reactor::new().unwrap();
    reactor.register(
        listener,
        Interest::READABLE,
        Box::new(ResigningAcceptor { tx: tx.clone() }),
    );
    reactor.start().unwrap();

    let _first = TcpStream::connect(addr).unwrap();
    assert!(matches!(expect(&rx), Report::Accepted(_)));

    // The Remove verdict above must not have unlinked the listener: a second
    // connection still gets accepted, and its data still gets dispatched.
    let mut second = TcpStream::connect(addr).unwrap();
    let fd_second = match expect(&rx) {
        Report::Accepted(fd) => fd,
        other => panic!("expected an accept, got {other:?}"),
    };
    second.write_all(b"ping").unwrap();
    assert_eq!(expect(&rx), Report::Data(fd_second, b"ping".to_vec()));

    reactor.stop();
    // Listener plus both connections survive to teardown.
    assert_eq!(reactor.drain().unwrap(), 3);
}

#[test]
fn dispatch_follows_registration_order() {
    // Three already-readable entries behind a quiet listener slot: one pass
    // reports them all, and dispatch must follow registration order.
    let (quiet, _quiet_peer) = UnixStream::pair().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();

    let reactor = Reactor::new().unwrap();
    reactor.register(
        quiet,
        Interest::READABLE,
        Box::new(Acceptor { tx: tx.clone() }),
    );

    let mut peers = Vec::new();
    let mut fds = Vec::new();
    for tag in [b"a", b"b", b"c"] {
        let (ours, mut theirs) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        fds.push(ours.as_raw_fd());
        reactor.register(ours, Interest::READABLE, Box::new(Recorder { tx: tx.clone() }));
        theirs.write_all(tag).unwrap();
        peers.push(theirs);
    }

    reactor.start().unwrap();

    let reports: Vec<Report> = (0..3).map(|_| expect(&rx)).collect();
    assert_eq!(
        reports,
        vec![
            Report::Data(fds[0], b"a".to_vec()),
            Report::Data(fds[1], b"b".to_vec()),
            Report::Data(fds[2], b"c".to_vec()),
        ]
    );

    reactor.stop();
    reactor.drain().unwrap();
}
