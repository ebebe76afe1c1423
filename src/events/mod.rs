use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Payment lifecycle events published on the internal bus. Consumers are
/// fire-and-forget; a send failure is logged and never fails the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PaymentInitiated {
        order_id: Uuid,
        transaction_id: Uuid,
        gateway: String,
    },
    PaymentStateChanged {
        transaction_id: Uuid,
        old_state: String,
        new_state: String,
    },
    RefundRequested {
        transaction_id: Uuid,
        amount_minor: i64,
        currency: String,
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

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel. Today events only feed the structured log;
/// downstream consumers hook in here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentInitiated {
                order_id,
                transaction_id,
                gateway,
            } => {
                info!(%order_id, %transaction_id, %gateway, "payment initiated");
            }
            Event::PaymentStateChanged {
                transaction_id,
                old_state,
                new_state,
            } => {
                info!(%transaction_id, %old_state, %new_state, "payment state changed");
            }
            Event::RefundRequested {
                transaction_id,
                amount_minor,
                currency,
            } => {
                info!(%transaction_id, %amount_minor, %currency, "refund requested");
            }
        }
    }
}
