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

//! This file contains the TCP chat server binary: socket provisioning, the
//! reactor assembly, and the SIGINT-driven teardown. Everything interesting
//! happens in the `poll-reactor` event loop and the handlers of this crate.

use chat_server::{signal, Acceptor, SessionStats};
use clap::Parser;
use poll_reactor::{Interest, Reactor};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short = 'p', long, default_value_t = 8080, help = "Port number")]
    port: u16,

    #[arg(long, default_value = "0.0.0.0", help = "Bind address")]
    bind: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Cli::parse();
    match serve(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server failed");
            ExitCode::FAILURE
        }
    }
}

fn serve(args: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind((args.bind.as_str(), args.port))?;
    listener.set_nonblocking(true)?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    let stats = Arc::new(SessionStats::default());
    let reactor = Reactor::new()?;
    reactor.register(
        listener,
        Interest::READABLE,
        Box::new(Acceptor::new(Arc::clone(&stats))),
    );

    signal::install()?;
    reactor.start()?;

    // Fold a natural loop exit (engine fault) into the same wakeup as an
    // interactive interrupt, then park until either happens.
    let monitor = {
        let reactor = reactor.clone();
        std::thread::spawn(move || {
            let result = reactor.join();
            signal::notify();
            result
        })
    };
    signal::wait();
    tracing::info!("shutting down");

    // Teardown order matters: stop the worker, then close the descriptors,
    // so the loop can never touch an already-closed fd.
    reactor.stop();
    let released = reactor.drain()?;
    tracing::info!(
        released,
        accepted = stats.accepted(),
        disconnected = stats.disconnected(),
        relayed = stats.relayed(),
        "server stopped"
    );
    match monitor.join() {
        Ok(result) => result?,
        Err(_) => tracing::error!("monitor thread panicked"),
    }
    Ok(())
}
