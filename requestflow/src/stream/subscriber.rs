//! The receiving side of a response stream.

use futures::Stream;
use std::fmt;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use crate::core::Response;
use crate::errors::RequestError;

/// A subscription to a [`ResponseStream`](super::ResponseStream).
///
/// Receives every response published after it was created, in publish order.
/// A subscriber that falls more than the stream capacity behind skips the
/// oldest values.
pub struct ResponseSubscriber<T> {
    receiver: broadcast::Receiver<Response<T>>,
}

impl<T> ResponseSubscriber<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(super) const fn new(receiver: broadcast::Receiver<Response<T>>) -> Self {
        Self { receiver }
    }

    /// Waits for the next response. Returns `None` once the stream closes.
    pub async fn next(&mut self) -> Option<Response<T>> {
        loop {
            match self.receiver.recv().await {
                Ok(response) => return Some(response),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Response subscriber lagged, skipping values");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next buffered response without waiting.
    pub fn try_next(&mut self) -> Option<Response<T>> {
        loop {
            match self.receiver.try_recv() {
                Ok(response) => return Some(response),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Response subscriber lagged, skipping values");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Converts the subscriber into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Response<T>> + Send {
        futures::stream::unfold(self, |mut subscriber| async move {
            subscriber.next().await.map(|response| (response, subscriber))
        })
    }

    /// Invokes `on_response` for every response until the stream closes.
    pub async fn collect<F, Fut>(mut self, mut on_response: F)
    where
        F: FnMut(Response<T>) -> Fut,
        Fut: Future<Output = ()>,
    {
        while let Some(response) = self.next().await {
            on_response(response).await;
        }
    }

    /// Splits responses into data and error callbacks until the stream closes.
    ///
    /// Loading responses invoke neither callback.
    pub async fn collect_split<FD, FutD, FE, FutE>(mut self, mut on_data: FD, mut on_error: FE)
    where
        FD: FnMut(T) -> FutD,
        FutD: Future<Output = ()>,
        FE: FnMut(RequestError) -> FutE,
        FutE: Future<Output = ()>,
    {
        while let Some(response) = self.next().await {
            match response {
                Response::Success(data) => on_data(data).await,
                Response::Error(error) => on_error(error).await,
                Response::Loading => {}
            }
        }
    }

    /// Like [`collect_split`](Self::collect_split), but a newer response
    /// cancels a callback still running for an older one.
    ///
    /// When the stream closes the in-flight callback runs to completion.
    pub async fn collect_latest<FD, FutD, FE, FutE>(mut self, mut on_data: FD, mut on_error: FE)
    where
        FD: FnMut(T) -> FutD,
        FutD: Future<Output = ()>,
        FE: FnMut(RequestError) -> FutE,
        FutE: Future<Output = ()>,
    {
        let mut pending = self.next().await;
        while let Some(response) = pending.take() {
            let callback = async {
                match response {
                    Response::Success(data) => on_data(data).await,
                    Response::Error(error) => on_error(error).await,
                    Response::Loading => {}
                }
            };
            tokio::pin!(callback);

            tokio::select! {
                biased;
                newer = self.next() => match newer {
                    Some(newer) => pending = Some(newer),
                    None => (&mut callback).await,
                },
                () = &mut callback => pending = self.next().await,
            }
        }
    }
}

impl<T> fmt::Debug for ResponseSubscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSubscriber")
            .field("buffered", &self.receiver.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::ResponseStream;
    use super::*;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_pending, task};

    #[tokio::test]
    async fn test_next_returns_none_when_closed() {
        let stream: ResponseStream<u8> = ResponseStream::new(4);
        let mut subscriber = stream.subscribe();
        drop(stream);

        assert!(subscriber.next().await.is_none());
    }

    #[tokio::test]
    async fn test_no_replay_keeps_next_pending() {
        let stream = ResponseStream::new(4);
        stream.publish(Response::Success(1_u8));

        let mut subscriber = stream.subscribe();
        let mut next = task::spawn(subscriber.next());
        assert_pending!(next.poll());
    }

    #[tokio::test]
    async fn test_into_stream_yields_until_close() {
        let stream = ResponseStream::new(4);
        let subscriber = stream.subscribe();

        stream.publish(Response::Loading);
        stream.publish(Response::Success("done"));
        drop(stream);

        let collected: Vec<_> = subscriber.into_stream().collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].data(), Some(&"done"));
    }

    #[tokio::test]
    async fn test_collect_sees_every_response() {
        let stream = ResponseStream::new(4);
        let subscriber = stream.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));

        stream.publish(Response::Loading);
        stream.publish(Response::Success(7_u8));
        drop(stream);

        let sink = seen.clone();
        subscriber
            .collect(|response| {
                sink.lock().push(response.status());
                async {}
            })
            .await;

        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_collect_split_skips_loading() {
        let stream = ResponseStream::new(4);
        let subscriber = stream.subscribe();
        let data = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        stream.publish(Response::Loading);
        stream.publish(Response::Success(1_u8));
        stream.publish(Response::Error(RequestError::injected(anyhow::anyhow!("bad"))));
        drop(stream);

        let (data_sink, error_sink) = (data.clone(), errors.clone());
        subscriber
            .collect_split(
                |value| {
                    data_sink.lock().push(value);
                    async {}
                },
                |error| {
                    error_sink.lock().push(error.to_string());
                    async {}
                },
            )
            .await;

        assert_eq!(*data.lock(), vec![1]);
        assert_eq!(errors.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_latest_cancels_stale_callback() {
        let stream = ResponseStream::new(4);
        let subscriber = stream.subscribe();
        let finished = Arc::new(Mutex::new(Vec::new()));

        let sink = finished.clone();
        let collector = tokio::spawn(subscriber.collect_latest(
            move |value: u8| {
                let sink = sink.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    sink.lock().push(value);
                }
            },
            |_| async {},
        ));

        stream.publish(Response::Success(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        stream.publish(Response::Success(2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(stream);

        collector.await.unwrap();
        assert_eq!(*finished.lock(), vec![2]);
    }
}
