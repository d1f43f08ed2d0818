//! Notification payloads pushed to connected clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{ProductEvent, UserId};

/// Known notification kinds. Serialises as `"type"` plus `"data"`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    PriceAdjustment(PriceAdjustment),
    InventoryRestock(InventoryRestock),
    AdminNotice(serde_json::Value),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceAdjustment(_) => "PRICE_ADJUSTMENT",
            Self::InventoryRestock(_) => "INVENTORY_RESTOCK",
            Self::AdminNotice(_) => "ADMIN_NOTICE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceAdjustment {
    pub product_id: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub currency: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryRestock {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity_added: u32,
    pub stock: u32,
}

/// A notification addressed to one user.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotificationMessage {
    pub user_id: UserId,
    pub message: String,
    #[serde(flatten)]
    pub notification: Notification,
    pub sent_at: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(user_id: UserId, notification: Notification, message: impl Into<String>) -> Self {
        Self { user_id, message: message.into(), notification, sent_at: Utc::now() }
    }

    /// Builds the admin-facing message for a product event.
    pub fn from_product_event(user_id: UserId, event: ProductEvent) -> Self {
        match event {
            ProductEvent::PriceAdjusted { product_id, name, old_price, new_price } => Self::new(
                user_id,
                Notification::PriceAdjustment(PriceAdjustment {
                    product_id,
                    old_price: old_price.amount(),
                    new_price: new_price.amount(),
                    currency: new_price.currency().to_string(),
                    reason: "Dynamic pricing algorithm based on demand and stock".to_string(),
                }),
                format!("AI adjusted price for {name}"),
            ),
            ProductEvent::Restocked { product_id, sku, name, quantity_added, stock } => Self::new(
                user_id,
                Notification::InventoryRestock(InventoryRestock {
                    product_id,
                    sku,
                    name: name.clone(),
                    quantity_added,
                    stock: stock.value(),
                }),
                format!("Autonomous restock complete for {name}"),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string(self) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, Quantity};
    use serde_json::json;

    #[test]
    fn wire_format_keeps_type_and_data_at_top_level() {
        let msg = NotificationMessage::new(UserId::new(7), Notification::AdminNotice(json!({"k": 1})), "hello");
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["user_id"], 7);
        assert_eq!(value["type"], "ADMIN_NOTICE");
        assert_eq!(value["message"], "hello");
        assert_eq!(value["data"], json!({"k": 1}));
        assert!(value["sent_at"].is_string());
    }

    #[test]
    fn restock_event_becomes_inventory_notification() {
        let event = ProductEvent::Restocked {
            product_id: "p-1".into(),
            sku: "LAMP-2".into(),
            name: "Desk Lamp".into(),
            quantity_added: 50,
            stock: Quantity::new(52),
        };
        let msg = NotificationMessage::from_product_event(UserId::new(1), event);
        assert_eq!(msg.notification.kind(), "INVENTORY_RESTOCK");
        assert_eq!(msg.message, "Autonomous restock complete for Desk Lamp");
        match msg.notification {
            Notification::InventoryRestock(r) => {
                assert_eq!(r.sku, "LAMP-2");
                assert_eq!(r.stock, 52);
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }

    #[test]
    fn price_event_carries_old_and_new_price() {
        let event = ProductEvent::PriceAdjusted {
            product_id: "p-2".into(),
            name: "Mug".into(),
            old_price: Money::usd(Decimal::new(1000, 2)),
            new_price: Money::usd(Decimal::new(1025, 2)),
        };
        let msg = NotificationMessage::from_product_event(UserId::new(1), event);
        assert_eq!(msg.message, "AI adjusted price for Mug");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "PRICE_ADJUSTMENT");
        assert_eq!(value["data"]["product_id"], "p-2");
        assert_eq!(value["data"]["currency"], "USD");
    }
}
