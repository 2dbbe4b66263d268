#![warn(clippy::nursery, clippy::pedantic)]

// Pastelite
// Copyright (C) 2026  Pastelite Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::stream::StreamExt;
use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::{info, warn};

use crate::config::{Opts, Storage};
use crate::routes::AppState;
use crate::store::{MemoryStore, RocksStore, Store};
use crate::time::SystemClock;

mod config;
mod error;
mod page;
mod paste;
mod protocol;
mod routes;
mod short_code;
mod store;
mod time;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();

    let store: Arc<dyn Store> = match opts.storage {
        Storage::Rocksdb => Arc::new(RocksStore::open(&opts.database)?),
        Storage::Memory => {
            warn!("Using in-memory storage; pastes will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    if opts.test_mode {
        warn!("Test mode is enabled; clients can set the request time");
    }

    let state = AppState {
        store: Arc::clone(&store),
        clock: Arc::new(SystemClock),
        public_url: opts.public_url,
        test_mode: opts.test_mode,
    };

    let signals = Signals::new(&[SIGINT, SIGTERM, SIGQUIT])?;
    let signals_handle = signals.handle();

    info!("Listening on {}", opts.bind);
    axum::Server::bind(&opts.bind)
        .serve(routes::router(state).into_make_service())
        .with_graceful_shutdown(shutdown(signals))
        .await?;

    signals_handle.close();
    // Must be called for correct shutdown
    store.close().await?;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown(mut signals: Signals) {
    if let Some(signal) = signals.next().await {
        info!("Received signal {}, shutting down", signal);
    }
}
