/// Output port: publish domain events (no knowledge of transport).
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}

/// Publisher for deployments without an event consumer.
pub struct NoopPublisher;

impl<E: 'static> EventPublisher<E> for NoopPublisher {
    fn publish(&self, _event: &E) {}
}
