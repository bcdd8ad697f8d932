//! `futures_core::Stream` adapter (requires the `async` feature).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::Subscription;

/// Pull-side view of an [`Observable`].
///
/// Yields `Ok` for each value and `Err` for a terminal error, then ends.
/// Dropping the stream unsubscribes. Values are still pushed by whatever
/// drives the observable (typically an event loop), so the stream only
/// makes progress when that driver runs.
pub struct ObservableStream<T, E> {
    rx: UnboundedReceiver<Result<T, E>>,
    subscription: Subscription,
}

struct ChannelObserver<T, E> {
    tx: UnboundedSender<Result<T, E>>,
}

impl<T, E> Observer<T, E> for ChannelObserver<T, E> {
    fn next(&self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    fn error(&self, error: E) {
        let _ = self.tx.send(Err(error));
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Subscribe and expose the notifications as a stream.
    pub fn into_stream(&self) -> ObservableStream<T, E> {
        let (tx, rx) = unbounded_channel();
        let subscription = self.subscribe(ChannelObserver { tx });
        ObservableStream { rx, subscription }
    }
}

impl<T, E> ObservableStream<T, E> {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl<T, E> Stream for ObservableStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T, E> Drop for ObservableStream<T, E> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
