//! Autonomous restock job

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::catalog::{Catalog, CatalogError};
use crate::domain::{DomainEvent, Product, UserId};
use crate::notifications::{NotificationMessage, Publisher};

#[derive(Debug, Clone, Copy)]
pub struct RestockPolicy {
    /// Products with stock strictly below this are restocked.
    pub threshold: u32,
    pub quantity: u32,
    /// Simulated supplier lead time per order.
    pub supplier_delay: Duration,
}

impl Default for RestockPolicy {
    fn default() -> Self {
        Self { threshold: 5, quantity: 50, supplier_delay: Duration::from_millis(500) }
    }
}

pub struct InventoryJob {
    catalog: Arc<dyn Catalog>,
    publisher: Publisher,
    admin: UserId,
    policy: RestockPolicy,
    running: Mutex<()>,
}

impl InventoryJob {
    pub fn new(catalog: Arc<dyn Catalog>, publisher: Publisher, admin: UserId, policy: RestockPolicy) -> Self {
        Self { catalog, publisher, admin, policy, running: Mutex::new(()) }
    }

    /// Restocks every low-stock product once. Returns how many were restocked.
    /// Overlapping calls run one after the other, so a product is ordered once.
    pub async fn run_once(&self) -> Result<usize, CatalogError> {
        let _running = self.running.lock().await;
        info!("AI Agent: Checking inventory levels for autonomous restock");
        let mut restocked = 0;
        for listed in self.catalog.products()? {
            if listed.stock().value() >= self.policy.threshold {
                continue;
            }
            info!(
                product = listed.name(),
                stock = listed.stock().value(),
                ordering = self.policy.quantity,
                "AI Agent: Low stock detected, ordering from supplier"
            );
            if !self.policy.supplier_delay.is_zero() {
                tokio::time::sleep(self.policy.supplier_delay).await;
            }
            // Delivery lands on the stored product; other jobs may have changed it meanwhile.
            let mut events: Vec<DomainEvent> = Vec::new();
            let quantity = self.policy.quantity;
            let product = match self.catalog.update(listed.id(), &mut |product: &mut Product| {
                product.restock(quantity);
                events = product.take_events();
            }) {
                Ok(product) => product,
                Err(e) => {
                    error!(product_id = listed.id(), error = %e, "Failed to restock product");
                    continue;
                }
            };
            restocked += 1;
            info!(product = product.name(), stock = product.stock().value(), "AI Agent: Restock complete");
            for DomainEvent::Product(event) in events {
                self.publisher.send(NotificationMessage::from_product_event(self.admin, event)).await;
            }
        }
        Ok(restocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::domain::Money;
    use crate::jobs::PricingJob;
    use crate::notifications::{ChannelConnection, ConnectionId, HubConfig, Notification, NotificationHub};
    use rust_decimal::Decimal;

    fn product(sku: &str, stock: u32) -> Product {
        Product::create(sku.to_uppercase(), sku, Money::usd(Decimal::new(500, 2)), stock)
    }

    #[tokio::test]
    async fn restocks_only_low_stock_products() {
        let low = product("low", 4);
        let edge = product("edge", 5);
        let (low_id, edge_id) = (low.id().to_string(), edge.id().to_string());
        let catalog = Arc::new(InMemoryCatalog::with_products([low, edge]));

        let (hub, task) = NotificationHub::spawn(HubConfig::default());
        let (conn, mut rx) = ChannelConnection::new(8);
        let admin = UserId::new(1);
        hub.register(ConnectionId::new(), admin, conn).await;

        let policy = RestockPolicy { supplier_delay: Duration::ZERO, ..RestockPolicy::default() };
        let job = InventoryJob::new(catalog.clone(), hub.publisher(), admin, policy);
        assert_eq!(job.run_once().await.unwrap(), 1);
        assert_eq!(catalog.get(&low_id).unwrap().stock().value(), 54);
        assert_eq!(catalog.get(&edge_id).unwrap().stock().value(), 5);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.message, "Autonomous restock complete for low");
        assert!(matches!(&msg.notification, Notification::InventoryRestock(r) if r.stock == 54 && r.quantity_added == 50));
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_supplier_before_restocking() {
        let catalog = Arc::new(InMemoryCatalog::with_products([product("slow", 0)]));
        let (hub, task) = NotificationHub::spawn(HubConfig::default());
        let job = InventoryJob::new(catalog, hub.publisher(), UserId::new(1), RestockPolicy::default());
        let started = tokio::time::Instant::now();
        assert_eq!(job.run_once().await.unwrap(), 1);
        assert!(started.elapsed() >= Duration::from_millis(500));
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn price_change_during_supplier_wait_survives_restock() {
        let speaker = product("speaker", 3);
        let id = speaker.id().to_string();
        let catalog = Arc::new(InMemoryCatalog::with_products([speaker]));
        let (hub, task) = NotificationHub::spawn(HubConfig::default());
        let admin = UserId::new(1);
        let inventory = InventoryJob::new(catalog.clone(), hub.publisher(), admin, RestockPolicy::default());
        let pricing = PricingJob::new(catalog.clone(), hub.publisher(), admin);

        let (restocked, adjusted) = tokio::join!(inventory.run_once(), pricing.run_once());
        assert_eq!(restocked.unwrap(), 1);
        assert_eq!(adjusted.unwrap(), 1);

        let stored = catalog.get(&id).unwrap();
        // 5.00 * 1.025 * 1.15 = 5.89375, priced while stock was still 3
        assert_eq!(stored.price().amount(), Decimal::new(589, 2));
        assert_eq!(stored.stock().value(), 53);
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_runs_restock_once() {
        let lamp = product("lamp", 2);
        let id = lamp.id().to_string();
        let catalog = Arc::new(InMemoryCatalog::with_products([lamp]));
        let (hub, task) = NotificationHub::spawn(HubConfig::default());
        let (conn, mut rx) = ChannelConnection::new(8);
        let admin = UserId::new(1);
        hub.register(ConnectionId::new(), admin, conn).await;
        let job = InventoryJob::new(catalog.clone(), hub.publisher(), admin, RestockPolicy::default());

        let (first, second) = tokio::join!(job.run_once(), job.run_once());
        assert_eq!(first.unwrap() + second.unwrap(), 1);
        assert_eq!(catalog.get(&id).unwrap().stock().value(), 52);

        hub.publish(admin, Notification::AdminNotice(serde_json::Value::Null), "marker").await;
        assert!(matches!(rx.recv().await.unwrap().notification, Notification::InventoryRestock(_)));
        assert_eq!(rx.recv().await.unwrap().message, "marker");
        task.shutdown().await;
    }
}
