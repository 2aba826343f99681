use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender and the receiver its events arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event dropped");
        }
    }
}

/// Things that happen to orders and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        user_id: Uuid,
        total_amount: Decimal,
        item_count: usize,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    PaymentInitiated {
        order_id: Uuid,
    },
    /// A stock counter was asked for more than it held and stopped at zero
    StockClamped {
        product_id: Uuid,
        variant: Option<String>,
        shortfall: u32,
    },
    StockDepleted {
        product_id: Uuid,
        variant: Option<String>,
    },
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                user_id,
                total_amount,
                item_count,
            } => info!(%order_id, %user_id, %total_amount, item_count, "order created"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "order status changed"),
            Event::PaymentInitiated { order_id } => info!(%order_id, "payment initiated"),
            Event::StockClamped {
                product_id,
                variant,
                shortfall,
            } => warn!(%product_id, ?variant, shortfall, "stock over-consumed, clamped at zero"),
            Event::StockDepleted {
                product_id,
                variant,
            } => warn!(%product_id, ?variant, "stock depleted"),
        }
    }

    info!("Event processing loop stopped");
}
