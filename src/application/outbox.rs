//! Outbound event queue between the ledger and the event publisher.
//!
//! Mutations never wait on delivery: events are pushed with `try_send` into a
//! bounded channel and a detached worker forwards them to the publisher. A full
//! queue drops the event with a warning instead of applying backpressure to
//! the ledger.

use crate::domain::events::AccountEvent;
use crate::domain::ports::EventPublisherBox;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;

/// Sending half of the outbound event queue, owned by `LedgerService`.
#[derive(Clone)]
pub struct EventOutbox {
    sender: Sender<AccountEvent>,
}

impl EventOutbox {
    /// Creates the queue with room for `capacity` undelivered events.
    pub fn channel(capacity: usize) -> (Self, Receiver<AccountEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, event: AccountEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "outbound event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "outbound event queue closed, dropping event"
                );
            }
        }
    }
}

/// Drains the queue into `publisher` on a detached task.
///
/// Publish failures are logged and the event is not retried. The task ends
/// once every `EventOutbox` is dropped and the queue is empty, returning the
/// number of events delivered.
pub fn spawn_publisher(
    mut receiver: Receiver<AccountEvent>,
    publisher: EventPublisherBox,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(event) = receiver.recv().await {
            match publisher.publish(&event).await {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    account_id = %event.account_id,
                    error = %err,
                    "failed to publish event"
                ),
            }
        }
        delivered
    })
}
