use anyhow::Context;
use std::net::SocketAddr;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio_util::sync::CancellationToken;

use crate::{
    protocol::{self, Command, ProtocolError},
    store::BoardHandle,
};

/// Longest command line accepted, newline excluded.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// One line read from a client.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    /// The reader is exhausted.
    Eof,
    /// A line, invalid UTF-8 replaced by U+FFFD.
    Text(String),
    /// A line over [`MAX_LINE_LENGTH`], already skipped up to its newline.
    TooLong,
}

/// Read one line from `reader`, buffering at most [`MAX_LINE_LENGTH`] + 1 bytes of it.
async fn read_bounded_line<Reader>(reader: &mut Reader, buf: &mut Vec<u8>) -> std::io::Result<Line>
where
    Reader: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE_LENGTH as u64 + 1;
    let bytes_read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if bytes_read == 0 {
        return Ok(Line::Eof);
    }
    if buf.ends_with(b"\n") || bytes_read <= MAX_LINE_LENGTH {
        return Ok(Line::Text(String::from_utf8_lossy(&buf[..]).into_owned()));
    }
    // Skip the rest of the oversized line in bounded chunks.
    loop {
        buf.clear();
        let skipped = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if skipped == 0 || buf.ends_with(b"\n") {
            buf.clear();
            return Ok(Line::TooLong);
        }
    }
}

/// Send the welcome preamble on `writer`, then answer one command per line read from `reader`.
/// Every command gets exactly one response, written before the next line is read.
///
/// # Termination
/// If EOF is signalled on `reader` by `Ok(0)`, the future terminates.
/// If the client sends `DISCONNECT`, it is answered with `DISCONNECT` and the future terminates.
/// If the `token` is cancelled somewhere else, the future terminates.
/// If reading, writing, or reaching the board fails, the error is returned.
/// In every case the writer is shut down before returning.
#[tracing::instrument(name = "session", skip_all, fields(%addr))]
pub async fn handle_connection<Reader, Writer>(
    addr: SocketAddr,
    reader: Reader,
    mut writer: Writer,
    board: BoardHandle,
    token: CancellationToken,
) -> anyhow::Result<()>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    let result = serve_lines(reader, &mut writer, &board, &token).await;
    // Flush data in writer, even when the session failed.
    let shutdown = writer
        .shutdown()
        .await
        .context("Unable to shut down client writer");
    result.context("Client failed to handle commands")?;
    shutdown
}

async fn serve_lines<Reader, Writer>(
    reader: Reader,
    writer: &mut Writer,
    board: &BoardHandle,
    token: &CancellationToken,
) -> anyhow::Result<()>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    writer
        .write_all(protocol::welcome(board).as_bytes())
        .await
        .context("Failed to send welcome")?;

    let mut buf = Vec::new();
    let mut reader = BufReader::new(reader);

    loop {
        let line = tokio::select! {
            read = read_bounded_line(&mut reader, &mut buf) => read.context("Failed to read line")?,
            _ = token.cancelled() => {
                tracing::debug!("session cancelled");
                break Ok(());
            }
        };
        let (command, line) = match line {
            Line::Eof => {
                tracing::info!("client closed the connection");
                break Ok(()); // EOF detected.
            }
            Line::Text(line) => (line.parse::<Command>(), line),
            Line::TooLong => (Err(ProtocolError::LineTooLong), String::new()),
        };
        tracing::debug!(request = line.trim_end(), "received");

        let disconnect = command == Ok(Command::Disconnect);
        let response = match command {
            Ok(command) => execute(board, command).await?,
            Err(error) => error.response(),
        };
        tracing::debug!(%response, "sending");

        writer
            .write_all(format!("{response}\n").as_bytes())
            .await
            .context("Failed to send response")?;

        if disconnect {
            tracing::info!("client disconnected");
            break Ok(());
        }
    }
}

/// Run `command` against the board and render the response, without the trailing newline.
pub async fn execute(board: &BoardHandle, command: Command) -> anyhow::Result<String> {
    let response = match command {
        Command::Post {
            origin,
            colour,
            message,
        } => match board.post(origin, colour, message).await? {
            Ok(()) => "OK".to_string(),
            Err(error) => {
                tracing::debug!(%error, "post rejected");
                error.response()
            }
        },
        Command::Get(query) => protocol::render_notes(&board.get(query).await?),
        Command::Pins => protocol::render_pins(&board.pins().await?),
        Command::Pin(at) => match board.pin(at).await? {
            Ok(count) => format!("OK {count}"),
            Err(error) => error.response(),
        },
        Command::Unpin(at) => match board.unpin(at).await? {
            Ok(count) => format!("OK {count}"),
            Err(error) => error.response(),
        },
        Command::Shake => {
            board.shake().await?;
            "OK".to_string()
        }
        Command::Clear => {
            board.clear().await?;
            "OK".to_string()
        }
        Command::Disconnect => "DISCONNECT".to_string(),
    };
    Ok(response)
}
