use crate::domain::events::AccountEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;
use async_trait::async_trait;

/// Publishes events as structured log lines.
///
/// Stands in for an external bus when the ledger runs standalone.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &AccountEvent) -> Result<()> {
        let payload = serde_json::to_string(&event.payload)?;
        tracing::info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            account_id = %event.account_id,
            payload = %payload,
            "published event"
        );
        Ok(())
    }
}
