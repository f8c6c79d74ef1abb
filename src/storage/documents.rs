use std::pin::Pin;
use std::task::{Context, Poll};
use futures_util::Stream;
use tokio::sync::mpsc;
use crate::error::Result;
use crate::models::{CollectionPath, Snapshot};
use crate::utils::CancelFlag;

/// A live source of collection snapshots.
pub trait DocumentStore: Send + Sync {
    /// Starts listening to `path`. Snapshots arrive on the returned stream
    /// until it is cancelled or dropped, or the store reports an error.
    fn subscribe(&self, path: &CollectionPath) -> Subscription;
}

/// Receiving half of a store subscription.
///
/// Cancelling is synchronous and idempotent: once `cancel` returns, the
/// stream yields nothing more, even if snapshots are already buffered.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Result<Snapshot>>,
    cancel: CancelFlag,
}

/// Producing half, held by the store adapter.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    sender: mpsc::UnboundedSender<Result<Snapshot>>,
    cancel: CancelFlag,
}

impl Subscription {
    pub fn channel() -> (SnapshotSender, Subscription) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();
        (
            SnapshotSender { sender, cancel: cancel.clone() },
            Subscription { receiver, cancel },
        )
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SnapshotSender {
    /// Returns `false` once the subscriber is gone.
    pub fn send(&self, item: Result<Snapshot>) -> bool {
        !self.is_closed() && self.sender.send(item).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }

    /// Resolves when the subscriber cancels or goes away.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.sender.closed() => {}
        }
    }
}
