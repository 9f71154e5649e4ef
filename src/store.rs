use anyhow::Context;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    board::{Board, BoardError, Query},
    note::{Dimensions, Location, Note},
};

/// A request sent from a session to the board task.
/// Each request carries a oneshot channel for the reply.
#[derive(Debug)]
pub enum Request {
    /// Post a note.
    Post {
        /// Top-left corner.
        origin: Location,
        /// Colour name, any case.
        colour: String,
        /// Message text.
        message: String,
        /// Reply channel.
        reply: oneshot::Sender<Result<(), BoardError>>,
    },

    /// Fetch the notes matching a query.
    Get {
        /// Filters to apply.
        query: Query,
        /// Reply channel.
        reply: oneshot::Sender<Vec<Note>>,
    },

    /// Pin every note at a point.
    Pin {
        /// Where to pin.
        at: Location,
        /// Reply channel.
        reply: oneshot::Sender<Result<usize, BoardError>>,
    },

    /// Remove pins at a point.
    Unpin {
        /// Where to unpin.
        at: Location,
        /// Reply channel.
        reply: oneshot::Sender<Result<usize, BoardError>>,
    },

    /// Remove unpinned notes.
    Shake {
        /// Reply channel.
        reply: oneshot::Sender<usize>,
    },

    /// Remove all notes.
    Clear {
        /// Reply channel.
        reply: oneshot::Sender<usize>,
    },

    /// Enumerate all pins.
    Pins {
        /// Reply channel.
        reply: oneshot::Sender<Vec<Location>>,
    },
}

/// Receive requests on the given [`tokio::sync::mpsc::Receiver`] and apply them to `board`, one at a time.
/// The reply is sent on the request's [`tokio::sync::oneshot::Sender`].
/// Because a single task owns the board, every request is atomic with respect to all others.
///
/// # Termination
/// In case there are no more senders, terminate the future.
pub async fn serve(mut board: Board, mut rx: mpsc::Receiver<Request>) -> anyhow::Result<()> {
    while let Some(request) = rx.recv().await {
        let delivered = match request {
            Request::Post {
                origin,
                colour,
                message,
                reply,
            } => reply.send(board.post(origin, &colour, &message)).is_ok(),
            Request::Get { query, reply } => reply.send(board.get(&query)).is_ok(),
            Request::Pin { at, reply } => reply.send(board.pin(at)).is_ok(),
            Request::Unpin { at, reply } => reply.send(board.unpin(at)).is_ok(),
            Request::Shake { reply } => {
                let removed = board.shake();
                tracing::debug!(removed, "shook the board");
                reply.send(removed).is_ok()
            }
            Request::Clear { reply } => {
                let removed = board.clear();
                tracing::debug!(removed, "cleared the board");
                reply.send(removed).is_ok()
            }
            Request::Pins { reply } => reply.send(board.pins()).is_ok(),
        };
        if !delivered {
            // The requesting session went away; the board state change still stands.
            tracing::warn!("dropped a board reply, requester is gone");
        }
    }
    tracing::debug!(notes = board.len(), "board task stopped, no more handles");
    Ok(())
}

/// Cloneable access to a board served by [`serve`].
///
/// The geometry and palette never change, so they are copied here and read without a round-trip.
#[derive(Debug, Clone)]
pub struct BoardHandle {
    tx: mpsc::Sender<Request>,
    size: Dimensions,
    note_size: Dimensions,
    colours: Arc<[String]>,
}

impl BoardHandle {
    /// Spawn a task serving `board` and return a handle to it, along with the task.
    pub fn spawn(board: Board) -> (Self, JoinHandle<anyhow::Result<()>>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = Self {
            tx,
            size: board.size(),
            note_size: board.note_size(),
            colours: board.colours().into(),
        };
        let task = tokio::spawn(serve(board, rx));
        (handle, task)
    }

    /// Board extent.
    pub fn size(&self) -> Dimensions {
        self.size
    }

    /// Size of every note.
    pub fn note_size(&self) -> Dimensions {
        self.note_size
    }

    /// Valid, lower-cased colours.
    pub fn colours(&self) -> &[String] {
        &self.colours
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> anyhow::Result<T> {
        let (sender, receiver) = oneshot::channel();
        self.tx
            .send(make(sender))
            .await
            .context("Failed to send request to board")?;
        receiver.await.context("Failed to receive board reply")
    }

    /// See [`Board::post`].
    pub async fn post(
        &self,
        origin: Location,
        colour: String,
        message: String,
    ) -> anyhow::Result<Result<(), BoardError>> {
        self.request(|reply| Request::Post {
            origin,
            colour,
            message,
            reply,
        })
        .await
    }

    /// See [`Board::get`].
    pub async fn get(&self, query: Query) -> anyhow::Result<Vec<Note>> {
        self.request(|reply| Request::Get { query, reply }).await
    }

    /// See [`Board::pin`].
    pub async fn pin(&self, at: Location) -> anyhow::Result<Result<usize, BoardError>> {
        self.request(|reply| Request::Pin { at, reply }).await
    }

    /// See [`Board::unpin`].
    pub async fn unpin(&self, at: Location) -> anyhow::Result<Result<usize, BoardError>> {
        self.request(|reply| Request::Unpin { at, reply }).await
    }

    /// See [`Board::shake`].
    pub async fn shake(&self) -> anyhow::Result<usize> {
        self.request(|reply| Request::Shake { reply }).await
    }

    /// See [`Board::clear`].
    pub async fn clear(&self) -> anyhow::Result<usize> {
        self.request(|reply| Request::Clear { reply }).await
    }

    /// See [`Board::pins`].
    pub async fn pins(&self) -> anyhow::Result<Vec<Location>> {
        self.request(|reply| Request::Pins { reply }).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::ErrorKind;

    fn board() -> Board {
        Board::new(Dimensions::new(100, 100), Dimensions::new(2, 2), ["red", "blue"])
    }

    #[tokio::test]
    async fn serves_requests() {
        let (handle, _task) = BoardHandle::spawn(board());

        assert_eq!(handle.size(), Dimensions::new(100, 100));
        assert_eq!(handle.note_size(), Dimensions::new(2, 2));
        assert_eq!(handle.colours(), ["red", "blue"]);

        handle
            .post(Location::new(0, 0), "Red".to_string(), "hello".to_string())
            .await
            .unwrap()
            .unwrap();
        let overlap = handle
            .post(Location::new(0, 0), "blue".to_string(), "world".to_string())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(overlap.kind, ErrorKind::Overlap);

        assert_eq!(handle.pin(Location::new(1, 1)).await.unwrap(), Ok(1));
        assert_eq!(handle.pins().await.unwrap(), vec![Location::new(1, 1)]);
        assert_eq!(handle.shake().await.unwrap(), 0);
        assert_eq!(handle.unpin(Location::new(1, 1)).await.unwrap(), Ok(1));
        assert_eq!(handle.shake().await.unwrap(), 1);
        assert!(handle.get(Query::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn terminates_without_handles() {
        let (handle, task) = BoardHandle::spawn(board());
        drop(handle);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn survives_dropped_requester() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(serve(board(), rx));

        let (reply, receiver) = oneshot::channel();
        drop(receiver);
        tx.send(Request::Post {
            origin: Location::new(0, 0),
            colour: "red".to_string(),
            message: "orphan".to_string(),
            reply,
        })
        .await
        .unwrap();

        let (reply, receiver) = oneshot::channel();
        tx.send(Request::Get {
            query: Query::default(),
            reply,
        })
        .await
        .unwrap();
        assert_eq!(receiver.await.unwrap().len(), 1);

        drop(tx);
        task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_posts_are_all_kept() {
        let (handle, _task) = BoardHandle::spawn(board());

        let posters = (0..50)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle
                        .post(Location::new(i, i), "red".to_string(), format!("note {i}"))
                        .await
                })
            })
            .collect::<Vec<_>>();
        for poster in futures::future::join_all(posters).await {
            poster.unwrap().unwrap().unwrap();
        }

        let notes = handle.get(Query::default()).await.unwrap();
        assert_eq!(notes.len(), 50);
        let mut origins = notes.iter().map(|note| note.origin().x).collect::<Vec<_>>();
        origins.sort_unstable();
        assert_eq!(origins, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_posts_at_one_spot_admit_exactly_one() {
        let (handle, _task) = BoardHandle::spawn(board());

        let posters = (0..20)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle
                        .post(Location::new(5, 5), "blue".to_string(), format!("racer {i}"))
                        .await
                })
            })
            .collect::<Vec<_>>();
        let admitted = futures::future::join_all(posters)
            .await
            .into_iter()
            .filter(|result| matches!(result, Ok(Ok(Ok(())))))
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(handle.get(Query::default()).await.unwrap().len(), 1);
    }
}
