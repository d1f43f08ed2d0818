//! Dynamic pricing job

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::domain::{DomainEvent, Money, Product, ProductError, UserId};
use crate::notifications::{NotificationMessage, Publisher};

/// Demand multiplier applied on every run.
const DEMAND_FACTOR: Decimal = Decimal::from_parts(1025, 0, 0, false, 3);
const LOW_STOCK_FACTOR: Decimal = Decimal::from_parts(115, 0, 0, false, 2);
const OVERSTOCK_FACTOR: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

/// New price for a product: demand times an inventory factor, rounded to cents.
pub fn reprice(price: &Money, stock: u32) -> Money {
    let inventory_factor = match stock {
        s if s < 10 => LOW_STOCK_FACTOR,
        s if s > 100 => OVERSTOCK_FACTOR,
        _ => Decimal::ONE,
    };
    price.scale(DEMAND_FACTOR * inventory_factor)
}

pub struct PricingJob {
    catalog: Arc<dyn Catalog>,
    publisher: Publisher,
    admin: UserId,
    running: Mutex<()>,
}

impl PricingJob {
    pub fn new(catalog: Arc<dyn Catalog>, publisher: Publisher, admin: UserId) -> Self {
        Self { catalog, publisher, admin, running: Mutex::new(()) }
    }

    /// Reprices the whole catalog once. Returns how many prices changed.
    /// Overlapping calls run one after the other.
    pub async fn run_once(&self) -> Result<usize, CatalogError> {
        let _running = self.running.lock().await;
        info!("AI Agent: Starting dynamic pricing adjustment");
        let mut adjusted = 0;
        for listed in self.catalog.products()? {
            let mut outcome: Result<bool, ProductError> = Ok(false);
            let mut events: Vec<DomainEvent> = Vec::new();
            let stored = self.catalog.update(listed.id(), &mut |product: &mut Product| {
                let new_price = reprice(product.price(), product.stock().value());
                outcome = product.adjust_price(new_price);
                events = product.take_events();
            });
            let product = match stored {
                Ok(product) => product,
                Err(e) => {
                    error!(product_id = listed.id(), error = %e, "Failed to reprice product");
                    continue;
                }
            };
            match outcome {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(product_id = product.id(), error = %e, "Skipping product during pricing");
                    continue;
                }
            }
            adjusted += 1;
            self.announce(&product, events).await;
        }
        info!(adjusted, "AI Agent: Dynamic pricing adjustment finished");
        Ok(adjusted)
    }

    async fn announce(&self, product: &Product, events: Vec<DomainEvent>) {
        for DomainEvent::Product(event) in events {
            info!(product = product.name(), price = %product.price(), "AI Agent: Adjusted price");
            self.publisher.send(NotificationMessage::from_product_event(self.admin, event)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::notifications::{
        ChannelConnection, ConnectionId, HubConfig, Notification, NotificationHub,
    };

    fn usd(cents: i64) -> Money { Money::usd(Decimal::new(cents, 2)) }

    #[test]
    fn reprice_applies_inventory_bands() {
        assert_eq!(reprice(&usd(1000), 50).amount(), Decimal::new(1025, 2));
        // 10 * 1.025 * 1.15 = 11.7875
        assert_eq!(reprice(&usd(1000), 5).amount(), Decimal::new(1179, 2));
        // 10 * 1.025 * 0.90 = 9.225, rounded half away from zero
        assert_eq!(reprice(&usd(1000), 200).amount(), Decimal::new(923, 2));
        assert_eq!(reprice(&usd(1000), 10).amount(), Decimal::new(1025, 2));
        assert_eq!(reprice(&usd(1000), 100).amount(), Decimal::new(1025, 2));
    }

    #[test]
    fn reprice_of_zero_stays_zero() {
        assert_eq!(reprice(&usd(0), 5).amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn run_once_saves_and_notifies_admin() {
        let product = Product::create("MUG", "Mug", usd(1000), 50);
        let free = Product::create("FREE", "Sticker", usd(0), 50);
        let id = product.id().to_string();
        let catalog = Arc::new(InMemoryCatalog::with_products([product, free]));

        let (hub, task) = NotificationHub::spawn(HubConfig::default());
        let (conn, mut rx) = ChannelConnection::new(8);
        let admin = UserId::new(1);
        hub.register(ConnectionId::new(), admin, conn).await;

        let job = PricingJob::new(catalog.clone(), hub.publisher(), admin);
        assert_eq!(job.run_once().await.unwrap(), 1);
        assert_eq!(catalog.get(&id).unwrap().price().amount(), Decimal::new(1025, 2));

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.message, "AI adjusted price for Mug");
        match &msg.notification {
            Notification::PriceAdjustment(p) => {
                assert_eq!(p.product_id, id);
                assert_eq!(p.old_price, Decimal::new(1000, 2));
                assert_eq!(p.new_price, Decimal::new(1025, 2));
            }
            other => panic!("unexpected notification {other:?}"),
        }
        task.shutdown().await;
    }
}
