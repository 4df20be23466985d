//! In-process domain event bus.
//!
//! Write paths emit an event after each committed mutation; a background
//! task drains the channel and logs them. Delivery to external consumers
//! (e.g. a browser-facing change feed) is a deployment concern layered on
//! top, not handled here.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the order write paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    OrderUpdated {
        order_id: Uuid,
        order_number: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderPaidOff {
        order_id: Uuid,
        dp_amount: i64,
    },
    OrderDeleted {
        order_id: Uuid,
        order_number: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Failures are reported to the caller
    /// but never fail the originating request.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                order_number,
            } => {
                info!(order_id = %order_id, order_number = %order_number, "order created");
            }
            Event::OrderUpdated {
                order_id,
                order_number,
            } => {
                info!(order_id = %order_id, order_number = %order_number, "order updated");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "order status changed"
                );
            }
            Event::OrderPaidOff {
                order_id,
                dp_amount,
            } => {
                info!(order_id = %order_id, dp_amount = dp_amount, "order paid off");
            }
            Event::OrderDeleted {
                order_id,
                order_number,
            } => {
                info!(order_id = %order_id, order_number = %order_number, "order deleted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_and_receives_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender
            .send(Event::OrderCreated {
                order_id,
                order_number: "INV-202501-0001".to_string(),
            })
            .await
            .expect("send event");

        match rx.recv().await {
            Some(Event::OrderCreated {
                order_id: received, ..
            }) => assert_eq!(received, order_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::OrderDeleted {
                order_id: Uuid::new_v4(),
                order_number: "INV-202501-0002".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
