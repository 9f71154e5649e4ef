use anyhow::Context;
use bboard::ClientArguments;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ClientArguments::parse();

    let mut stdin = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut stdout = FramedWrite::new(tokio::io::stdout(), LinesCodec::new());

    let mut stream = TcpStream::connect(args.address)
        .await
        .context(format!("Failed to connect to {}", args.address))?;
    let (reader, writer) = stream.split();
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    let mut stream = FramedRead::new(reader, LinesCodec::new());

    loop {
        tokio::select! {
            line = stream.next() => {
                if let Some(line) = line {
                    let line = line.context("Failed to read from server")?;
                    stdout.send(line).await.context("Failed to write to stdout")?;
                } else {
                    break;
                }
            },
            input = stdin.next() => {
                if let Some(input) = input {
                    let input = input.context("Failed to read from stdin")?;
                    sink.send(input).await.context("Failed to send to server")?;
                } else {
                    break;
                }
            }
        }
    }
    println!("Done");
    Ok(())
}
