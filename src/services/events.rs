//! Post-commit order notifications over NATS.

use axum::body::Bytes;
use crate::domain::events::OrderEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn disabled() -> Self { Self::default() }

    pub fn nats(client: async_nats::Client) -> Self { Self { client: Some(client) } }

    /// Best-effort: the order is already committed, so failures are only logged.
    pub async fn publish(&self, event: &OrderEvent) {
        let Some(client) = &self.client else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode order event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject().to_string(), Bytes::from(payload)).await {
            tracing::warn!(subject = event.subject(), error = %e, "Failed to publish order event");
        }
    }
}
