#![warn(missing_docs)]

//! A shared bulletin board served over TCP.
//!
//! Clients post fixed-size coloured notes at board coordinates, query them by colour, position
//! or content, pin and unpin them, and shake loose or clear the board. One task per connection
//! speaks the line protocol in [`session`]; a single task owns the [`board::Board`] and applies
//! requests one at a time, see [`store`].

use anyhow::Context;
use std::{net::SocketAddr, time::Duration};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod arguments;

pub use arguments::{Arguments, ClientArguments};

/// Initialize logging. Log lines go to stdout, filtered by `RUST_LOG` (default `info`).
/// When `console` is given, tokio-console events are additionally published at that address.
pub fn init_tracing(console: Option<SocketAddr>) -> anyhow::Result<()> {
    let console = console.map(|addr| {
        console_subscriber::ConsoleLayer::builder()
            .retention(Duration::from_secs(60))
            .server_addr(addr)
            .spawn()
    });
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(console)
        .with(fmt::layer().with_filter(filter))
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Notes, their placement and pins.
pub mod note;

/// The board: validation rules, queries and bulk removal over the notes in arrival order.
pub mod board;

/// Serialize board access through a single task fed by a [`tokio::sync::mpsc`] channel,
/// with replies on [`tokio::sync::oneshot`] channels.
pub mod store;

/// Parse command lines and render responses.
pub mod protocol;

/// Welcome a client, then answer its commands line by line.
pub mod session;
