//! Product Aggregate

use uuid::Uuid;
use crate::domain::value_objects::{Money, Quantity};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug)]
pub struct Product {
    id: String,
    sku: String,
    name: String,
    price: Money,
    stock: Quantity,
    events: Vec<DomainEvent>,
}

impl Product {
    pub fn create(sku: impl Into<String>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: Uuid::now_v7().to_string(), sku: sku.into(), name: name.into(), price,
            stock: Quantity::new(stock), events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn sku(&self) -> &str { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock(&self) -> Quantity { self.stock }

    /// Replaces the price. Returns `false` and records nothing when unchanged.
    pub fn adjust_price(&mut self, new_price: Money) -> Result<bool, ProductError> {
        if new_price.currency() != self.price.currency() { return Err(ProductError::CurrencyMismatch); }
        if new_price.amount().is_sign_negative() { return Err(ProductError::NegativePrice); }
        if new_price == self.price { return Ok(false); }
        let old_price = std::mem::replace(&mut self.price, new_price.clone());
        self.raise_event(DomainEvent::Product(ProductEvent::PriceAdjusted {
            product_id: self.id.clone(), name: self.name.clone(), old_price, new_price,
        }));
        Ok(true)
    }

    pub fn restock(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.raise_event(DomainEvent::Product(ProductEvent::Restocked {
            product_id: self.id.clone(), sku: self.sku.clone(), name: self.name.clone(),
            quantity_added: qty, stock: self.stock,
        }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("price currency does not match product currency")]
    CurrencyMismatch,
    #[error("price must not be negative")]
    NegativePrice,
}
