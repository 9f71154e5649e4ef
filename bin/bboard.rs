use anyhow::Context;
use bboard::{
    board::Board, init_tracing, note::Dimensions, session, store::BoardHandle, Arguments,
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    init_tracing(args.console)?;

    let board = Board::new(
        Dimensions::new(args.board_width, args.board_height),
        Dimensions::new(args.note_width, args.note_height),
        &args.colours,
    );
    tracing::info!(
        board = %board.size(),
        note = %board.note_size(),
        colours = %board.colours().join(", "),
        "board created"
    );
    let (board, _task) = BoardHandle::spawn(board);

    let address = args.address();
    let listener = TcpListener::bind(address)
        .await
        .context(format!("Failed to bind on {address}"))?;
    tracing::info!(%address, "listening");

    let token = CancellationToken::new();

    loop {
        let (mut socket, addr) = tokio::select! {
            accepted = listener.accept() => accepted.context("Failed to accept on socket")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl-c")?;
                tracing::info!("shutting down");
                token.cancel();
                break Ok(());
            }
        };
        tracing::info!(%addr, "client connected");

        let board = board.clone();
        let token = token.clone();

        tokio::spawn(async move {
            let (reader, writer) = socket.split();
            if let Err(error) =
                session::handle_connection(addr, reader, writer, board, token).await
            {
                tracing::warn!(%addr, "session failed: {error:#}");
            }
            tracing::info!(%addr, "closed connection");
        });
    }
}
