use crate::domain::{events::RewardsDomainEvent, ports::EventPublisher};

use super::dto::RewardEvent;
use super::sse::SseBroadcaster;

/// Adapter: implements domain port and forwards events into SSE broadcaster.
pub struct SseRewardEventPublisher {
    out: SseBroadcaster<RewardEvent>,
}

impl SseRewardEventPublisher {
    pub fn new(out: SseBroadcaster<RewardEvent>) -> Self {
        Self { out }
    }
}

impl EventPublisher<RewardsDomainEvent> for SseRewardEventPublisher {
    fn publish(&self, event: &RewardsDomainEvent) {
        self.out.send(RewardEvent::from(event));
    }
}
