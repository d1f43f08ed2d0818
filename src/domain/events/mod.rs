//! Domain events
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Product(ProductEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProductEvent {
    PriceAdjusted { product_id: String, name: String, old_price: Money, new_price: Money },
    Restocked { product_id: String, sku: String, name: String, quantity_added: u32, stock: Quantity },
}
