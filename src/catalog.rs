//! Product catalog seam used by the background jobs.
//!
//! The relational product store lives outside this service. Jobs list
//! products to decide what to touch, then apply each change through
//! [`Catalog::update`] against the stored product, never a stale copy.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use crate::domain::{Money, Product};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("product not found: {0}")]
    NotFound(String),
}

pub trait Catalog: Send + Sync + 'static {
    fn products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Runs `apply` on the current stored product while holding it exclusively
    /// and returns the product as stored afterwards.
    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Product)) -> Result<Product, CatalogError>;
}

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id().to_string(), p)).collect();
        Self { products: RwLock::new(map) }
    }

    /// A few products spanning the low, normal and overstocked bands.
    pub fn demo() -> Self {
        let usd = |cents: i64| Money::usd(Decimal::new(cents, 2));
        Self::with_products([
            Product::create("ECHO-SPK", "Smart Speaker", usd(4999), 3),
            Product::create("DESK-LMP", "LED Desk Lamp", usd(2950), 42),
            Product::create("USB-C-CBL", "USB-C Cable", usd(999), 250),
        ])
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.products.read().ok()?.get(id).cloned()
    }
}

impl Catalog for InMemoryCatalog {
    fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let map = self.products.read().map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let mut products: Vec<Product> = map.values().cloned().collect();
        products.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(products)
    }

    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Product)) -> Result<Product, CatalogError> {
        let mut map = self.products.write().map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let product = map.get_mut(id).ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        apply(product);
        Ok(product.clone())
    }
}
