use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, downgrading a full/closed channel to a warning.
    /// Checkout must not fail because the event loop lags.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

// Define the various events that can occur in the checkout workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),

    // Funnel events
    CustomerConverted {
        customer_id: Uuid,
        order_id: Uuid,
        order_total: Decimal,
    },
    PaymentDeclined {
        customer_id: Uuid,
        decline_count: i32,
        decline_code: Option<String>,
    },
    RetryLimitReached {
        customer_id: Uuid,
        decline_count: i32,
    },

    // Operational alerts
    /// Funds were captured or authorized but the order commit failed.
    /// Requires manual reconciliation.
    PaymentCapturedOrderMissing {
        customer_id: Uuid,
        transaction_id: Uuid,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
}

/// Background consumer for checkout events. Conversion and decline events
/// are informational; capture-without-order alerts are escalated.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::CustomerConverted {
                customer_id,
                order_id,
                order_total,
            } => {
                info!(
                    customer_id = %customer_id,
                    order_id = %order_id,
                    order_total = %order_total,
                    "Customer converted"
                );
            }
            Event::PaymentDeclined {
                customer_id,
                decline_count,
                decline_code,
            } => {
                info!(
                    customer_id = %customer_id,
                    decline_count,
                    decline_code = decline_code.as_deref().unwrap_or("-"),
                    "Payment declined"
                );
            }
            Event::RetryLimitReached {
                customer_id,
                decline_count,
            } => {
                warn!(
                    customer_id = %customer_id,
                    decline_count,
                    "Customer reached the payment retry ceiling"
                );
            }
            Event::PaymentCapturedOrderMissing {
                customer_id,
                transaction_id,
                amount,
                timestamp,
            } => {
                error!(
                    customer_id = %customer_id,
                    transaction_id = %transaction_id,
                    amount = %amount,
                    timestamp = %timestamp,
                    "ALERT: payment captured but order commit failed; manual reconciliation required"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn send_delivers_events_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated(Uuid::nil()))
            .await
            .expect("send should succeed");
        sender
            .send(Event::PaymentDeclined {
                customer_id: Uuid::nil(),
                decline_count: 1,
                decline_code: Some("DEMO_DECLINE".into()),
            })
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::OrderCreated(_))));
        assert!(matches!(
            rx.recv().await,
            Some(Event::PaymentDeclined { decline_count: 1, .. })
        ));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out.
        sender
            .send_or_log(Event::CustomerConverted {
                customer_id: Uuid::nil(),
                order_id: Uuid::nil(),
                order_total: dec!(34.99),
            })
            .await;
    }
}
