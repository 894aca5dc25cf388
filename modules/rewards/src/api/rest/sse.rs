use std::{borrow::Cow, convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Typed SSE fan-out built on `tokio::sync::broadcast`.
/// Slow subscribers lose the oldest events instead of blocking publishers.
#[derive(Clone)]
pub struct SseBroadcaster<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> SseBroadcaster<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Errors (no subscribers) are ignored.
    pub fn send(&self, value: T) {
        let _ = self.tx.send(value);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Lagged receivers skip the dropped messages.
    pub fn subscribe_stream(&self) -> impl Stream<Item = T> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|res| async move { res.ok() })
    }

    /// Messages matching `keep`, as JSON events named `event_name`.
    pub fn sse_response_filtered<F>(
        &self,
        event_name: impl Into<Cow<'static, str>>,
        keep: F,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
    where
        T: Serialize,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let event_name = event_name.into();
        let stream = self
            .subscribe_stream()
            .filter(move |msg| futures::future::ready(keep(msg)))
            .map(move |msg| {
                let ev = Event::default()
                    .event(event_name.as_ref())
                    .json_data(&msg)
                    .unwrap_or_else(|_| {
                        Event::default()
                            .event(event_name.as_ref())
                            .data("serialization_error")
                    });
                Ok(ev)
            });
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(KEEPALIVE_INTERVAL)
                .text("keepalive"),
        )
    }
}
