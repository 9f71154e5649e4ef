use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// Command Line Arguments of the board server.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Arguments {
    /// Port to listen on.
    #[clap(value_parser)]
    pub port: u16,

    /// Board width.
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub board_width: u32,

    /// Board height.
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub board_height: u32,

    /// Width of every note.
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub note_width: u32,

    /// Height of every note.
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub note_height: u32,

    /// Colours notes may be posted in.
    #[clap(value_parser, required = true)]
    pub colours: Vec<String>,

    /// Address to bind to.
    #[clap(long, value_parser, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Address to publish console events on.
    #[clap(short, long, value_parser)]
    pub console: Option<SocketAddr>,
}

impl Arguments {
    /// Address to listen on.
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Command Line Arguments of the interactive client.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ClientArguments {
    /// Address of the board server.
    #[clap(short, long, value_parser, default_value = "127.0.0.1:8080")]
    pub address: SocketAddr,
}
