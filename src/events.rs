use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
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
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total_amount: Decimal,
        payment_method: String,
    },
    OrderDeleted(Uuid),

    // Catalogue events
    MealCreated(Uuid),
    MealUpdated(Uuid),
    MealDeleted(Uuid),

    // Customer events
    CustomerCreated(Uuid),
    CustomerUpdated(Uuid),
    CustomerDeleted(Uuid),
    BalanceToppedUp {
        customer_id: Uuid,
        amount: Decimal,
        new_balance: Decimal,
    },
    BalanceDebited {
        customer_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
        new_balance: Decimal,
    },

    // User events
    UserCreated(Uuid),
    UserUpdated(Uuid),
    UserDeleted(Uuid),
}

impl Event {
    /// Short, stable name used for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderPlaced { .. } => "order_placed",
            Event::OrderDeleted(_) => "order_deleted",
            Event::MealCreated(_) => "meal_created",
            Event::MealUpdated(_) => "meal_updated",
            Event::MealDeleted(_) => "meal_deleted",
            Event::CustomerCreated(_) => "customer_created",
            Event::CustomerUpdated(_) => "customer_updated",
            Event::CustomerDeleted(_) => "customer_deleted",
            Event::BalanceToppedUp { .. } => "balance_topped_up",
            Event::BalanceDebited { .. } => "balance_debited",
            Event::UserCreated(_) => "user_created",
            Event::UserUpdated(_) => "user_updated",
            Event::UserDeleted(_) => "user_deleted",
        }
    }
}

/// Drains the event channel and logs each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                customer_id,
                total_amount,
                payment_method,
            } => {
                info!(
                    event = event.name(),
                    order_id = %order_id,
                    customer_id = %customer_id,
                    total_amount = %total_amount,
                    payment_method = %payment_method,
                    "Order placed"
                );
            }
            Event::BalanceToppedUp {
                customer_id,
                amount,
                new_balance,
            } => {
                info!(
                    event = event.name(),
                    customer_id = %customer_id,
                    amount = %amount,
                    new_balance = %new_balance,
                    "Balance topped up"
                );
            }
            Event::BalanceDebited {
                customer_id,
                order_id,
                amount,
                new_balance,
            } => {
                info!(
                    event = event.name(),
                    customer_id = %customer_id,
                    order_id = %order_id,
                    amount = %amount,
                    new_balance = %new_balance,
                    "Balance debited"
                );
            }
            other => {
                info!(event = other.name(), payload = ?other, "Event processed");
            }
        }
    }
    info!("Event channel closed; event processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn event_sender_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::MealCreated(Uuid::new_v4()))
            .await
            .expect("send event");

        let received = rx.recv().await.expect("event should arrive");
        assert_eq!(received.name(), "meal_created");
    }

    #[tokio::test]
    async fn event_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::UserDeleted(Uuid::new_v4())).await;
        assert!(result.is_err());
    }

    #[test]
    fn event_round_trips_through_serde() {
        let event = Event::BalanceDebited {
            customer_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            amount: dec!(12.50),
            new_balance: dec!(7.50),
        };

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.name(), "balance_debited");
    }
}
