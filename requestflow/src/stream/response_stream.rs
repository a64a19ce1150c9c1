//! The shared publishing side of a response stream.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

use super::ResponseSubscriber;
use crate::core::Response;
use crate::errors::RequestError;

struct StreamInner<T> {
    sender: broadcast::Sender<Response<T>>,
    current: RwLock<Response<T>>,
    capacity: usize,
    // Set on derived streams; dropping it stops the forwarding task.
    _detach: Option<oneshot::Sender<()>>,
}

impl<T: Clone> StreamInner<T> {
    fn publish(&self, response: Response<T>) {
        let mut current = self.current.write();
        *current = response.clone();
        // No subscribers is not an error for a hot stream.
        let _ = self.sender.send(response);
    }
}

/// Hot, zero-replay multicast stream of responses.
///
/// Cloning yields another handle to the same stream. The stream closes once
/// every handle (including those held by running tasks) is dropped.
pub struct ResponseStream<T> {
    inner: Arc<StreamInner<T>>,
}

impl<T> Clone for ResponseStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ResponseStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a stream buffering up to `capacity` responses per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_initial(Response::Loading, capacity, None)
    }

    fn with_initial(
        initial: Response<T>,
        capacity: usize,
        detach: Option<oneshot::Sender<()>>,
    ) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(StreamInner {
                sender,
                current: RwLock::new(initial),
                capacity,
                _detach: detach,
            }),
        }
    }

    /// Publishes a response to every attached subscriber.
    pub(crate) fn publish(&self, response: Response<T>) {
        self.inner.publish(response);
    }

    /// Returns the most recently published response.
    #[must_use]
    pub fn value(&self) -> Response<T> {
        self.inner.current.read().clone()
    }

    /// Attaches a subscriber that receives values published from now on.
    #[must_use]
    pub fn subscribe(&self) -> ResponseSubscriber<T> {
        ResponseSubscriber::new(self.inner.sender.subscribe())
    }

    /// Returns the number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    /// Returns the per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Derives a stream whose success payloads are mapped by `transform`.
    ///
    /// Loading and error responses pass through untouched; a transform
    /// failure becomes an `Error` on the derived stream. The derived stream
    /// mirrors values published after this call and detaches from `self`
    /// once all of its handles are dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn map<U, F>(&self, transform: F) -> ResponseStream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> anyhow::Result<U> + Send + 'static,
    {
        self.derive(move |response| response.try_map(&transform))
    }

    /// Derives a stream whose errors are mapped by `transform`.
    ///
    /// Detaches from `self` once all of its handles are dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn map_error<F>(&self, transform: F) -> Self
    where
        F: Fn(RequestError) -> RequestError + Send + 'static,
    {
        self.derive(move |response| response.map_error(&transform))
    }

    /// Derives an independent stream mirroring this one from now on.
    ///
    /// Detaches from `self` once all of its handles are dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn share(&self) -> Self {
        self.derive(|response| response)
    }

    fn derive<U, F>(&self, mut forward: F) -> ResponseStream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(Response<T>) -> Response<U> + Send + 'static,
    {
        // Subscribe before reading the current value so a concurrent publish
        // is either part of the initial value or delivered to the forwarder.
        let mut source = self.subscribe();
        let (detach, mut detached) = oneshot::channel();
        let derived = ResponseStream::with_initial(
            forward(self.value()),
            self.inner.capacity,
            Some(detach),
        );
        let target = Arc::downgrade(&derived.inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut detached => break,
                    next = source.next() => {
                        let Some(response) = next else { break };
                        let Some(target) = target.upgrade() else { break };
                        target.publish(forward(response));
                    }
                }
            }
        });
        derived
    }
}

impl<T> fmt::Debug for ResponseStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("subscribers", &self.inner.sender.receiver_count())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResponseStatus;
    use crate::testing::collect_responses;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(1);

    fn statuses<T>(responses: &[Response<T>]) -> Vec<ResponseStatus> {
        responses.iter().map(Response::status).collect()
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let stream = ResponseStream::new(8);
        let mut subscriber = stream.subscribe();

        stream.publish(Response::Loading);
        stream.publish(Response::Success(1_u32));

        let received = collect_responses(&mut subscriber, 2, WAIT).await;
        assert_eq!(statuses(&received), vec![ResponseStatus::Loading, ResponseStatus::Success]);
        assert_eq!(received[1].data(), Some(&1));
    }

    #[tokio::test]
    async fn test_zero_replay_for_late_subscriber() {
        let stream = ResponseStream::new(8);
        stream.publish(Response::Success(1_u32));

        let mut late = stream.subscribe();
        assert!(late.try_next().is_none());

        stream.publish(Response::Success(2));
        assert_eq!(late.next().await.and_then(Response::into_data), Some(2));
    }

    #[tokio::test]
    async fn test_value_tracks_latest() {
        let stream = ResponseStream::new(8);
        assert!(stream.value().is_loading());

        stream.publish(Response::Success("a"));
        stream.publish(Response::Success("b"));

        assert_eq!(stream.value().into_data(), Some("b"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let stream = ResponseStream::new(8);
        let mut first = stream.subscribe();
        let mut second = stream.subscribe();
        assert_eq!(stream.subscriber_count(), 2);

        stream.publish(Response::Success(3_u8));

        assert_eq!(first.next().await.and_then(Response::into_data), Some(3));
        assert_eq!(second.next().await.and_then(Response::into_data), Some(3));
    }

    #[tokio::test]
    async fn test_map_transforms_success_only() {
        let stream = ResponseStream::new(8);
        let mapped = stream.map(|n: u32| Ok(n.to_string()));
        let mut subscriber = mapped.subscribe();

        stream.publish(Response::Loading);
        stream.publish(Response::Success(42));
        stream.publish(Response::Error(RequestError::execution(anyhow::anyhow!("x"))));

        let received = collect_responses(&mut subscriber, 3, WAIT).await;
        assert_eq!(
            statuses(&received),
            vec![ResponseStatus::Loading, ResponseStatus::Success, ResponseStatus::Error]
        );
        assert_eq!(received[1].data(), Some(&"42".to_string()));
    }

    #[tokio::test]
    async fn test_map_failure_becomes_error() {
        let stream = ResponseStream::new(8);
        let mapped = stream.map(|s: String| Ok(s.parse::<i32>()?));
        let mut subscriber = mapped.subscribe();

        stream.publish(Response::Success("not a number".to_string()));

        let received = collect_responses(&mut subscriber, 1, WAIT).await;
        assert!(matches!(received[0], Response::Error(RequestError::Transform(_))));
    }

    #[tokio::test]
    async fn test_map_error_rewrites_failure() {
        let stream: ResponseStream<u8> = ResponseStream::new(8);
        let mapped = stream.map_error(|_| RequestError::injected(anyhow::anyhow!("rewritten")));
        let mut subscriber = mapped.subscribe();

        stream.publish(Response::Error(RequestError::execution(anyhow::anyhow!("original"))));

        let received = collect_responses(&mut subscriber, 1, WAIT).await;
        assert!(received[0].failure().unwrap().to_string().contains("rewritten"));
    }

    #[tokio::test]
    async fn test_shared_stream_is_not_retroactive() {
        let stream = ResponseStream::new(8);
        stream.publish(Response::Success(1_u8));

        let shared = stream.share();
        let mut subscriber = shared.subscribe();
        stream.publish(Response::Success(2));

        let received = collect_responses(&mut subscriber, 1, WAIT).await;
        assert_eq!(received[0].data(), Some(&2));
        assert!(subscriber.try_next().is_none());
    }

    #[tokio::test]
    async fn test_derived_value_starts_from_source() {
        let stream = ResponseStream::new(8);
        stream.publish(Response::Success(1_u32));

        let mapped = stream.map(|n: u32| Ok(n + 1));
        assert_eq!(mapped.value().into_data(), Some(2));

        let mut subscriber = mapped.subscribe();
        stream.publish(Response::Success(5));
        let received = collect_responses(&mut subscriber, 1, WAIT).await;
        assert_eq!(received[0].data(), Some(&6));
        assert_eq!(mapped.value().into_data(), Some(6));
    }

    #[tokio::test]
    async fn test_dropped_derived_streams_detach_from_source() {
        let stream = ResponseStream::new(8);
        for _ in 0..100 {
            drop(stream.map(|n: u32| Ok(n + 1)));
            drop(stream.share());
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.publish(Response::Success(1));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(stream.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_live_derived_stream_keeps_forwarding() {
        let stream = ResponseStream::new(8);
        let shared = stream.share();
        let mut subscriber = shared.subscribe();
        assert_eq!(stream.subscriber_count(), 1);

        stream.publish(Response::Success(9_u8));

        let received = collect_responses(&mut subscriber, 1, WAIT).await;
        assert_eq!(received[0].data(), Some(&9));
        drop(subscriber);
        drop(shared);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_dropped_values() {
        let stream = ResponseStream::new(2);
        let mut subscriber = stream.subscribe();

        for n in 0..5_u8 {
            stream.publish(Response::Success(n));
        }

        let received = collect_responses(&mut subscriber, 2, WAIT).await;
        let data: Vec<u8> = received.into_iter().filter_map(Response::into_data).collect();
        assert_eq!(data, vec![3, 4]);
    }
}
