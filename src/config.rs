//! Service configuration read from the environment (and `.env` via dotenvy).

use std::str::FromStr;
use std::time::Duration;

use crate::domain::UserId;
use crate::jobs::RestockPolicy;
use crate::notifications::HubConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hub_queue_capacity: usize,
    pub connection_queue_capacity: usize,
    /// Recipient of job notifications.
    pub admin_user_id: UserId,
    pub pricing_interval: Duration,
    pub inventory_interval: Duration,
    pub restock_threshold: u32,
    pub restock_quantity: u32,
    pub supplier_delay: Duration,
    pub seed_demo_catalog: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            hub_queue_capacity: 256,
            connection_queue_capacity: 64,
            admin_user_id: UserId::new(1),
            pricing_interval: Duration::from_secs(24 * 60 * 60),
            inventory_interval: Duration::from_secs(12 * 60 * 60),
            restock_threshold: 5,
            restock_quantity: 50,
            supplier_delay: Duration::from_millis(500),
            seed_demo_catalog: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let cfg = Self {
            port: parse(&lookup, "PORT", d.port)?,
            hub_queue_capacity: parse(&lookup, "HUB_QUEUE_CAPACITY", d.hub_queue_capacity)?,
            connection_queue_capacity: parse(&lookup, "CONNECTION_QUEUE_CAPACITY", d.connection_queue_capacity)?,
            admin_user_id: parse(&lookup, "ADMIN_USER_ID", d.admin_user_id)?,
            pricing_interval: Duration::from_secs(parse(&lookup, "PRICING_INTERVAL_SECS", d.pricing_interval.as_secs())?),
            inventory_interval: Duration::from_secs(parse(&lookup, "INVENTORY_INTERVAL_SECS", d.inventory_interval.as_secs())?),
            restock_threshold: parse(&lookup, "RESTOCK_THRESHOLD", d.restock_threshold)?,
            restock_quantity: parse(&lookup, "RESTOCK_QUANTITY", d.restock_quantity)?,
            supplier_delay: Duration::from_millis(parse(&lookup, "SUPPLIER_DELAY_MS", d.supplier_delay.as_millis() as u64)?),
            seed_demo_catalog: parse_bool(&lookup, "SEED_DEMO_CATALOG", d.seed_demo_catalog)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hub_queue_capacity == 0 { return Err(ConfigError::Zero("HUB_QUEUE_CAPACITY")); }
        if self.connection_queue_capacity == 0 { return Err(ConfigError::Zero("CONNECTION_QUEUE_CAPACITY")); }
        if self.pricing_interval.is_zero() { return Err(ConfigError::Zero("PRICING_INTERVAL_SECS")); }
        if self.inventory_interval.is_zero() { return Err(ConfigError::Zero("INVENTORY_INTERVAL_SECS")); }
        Ok(())
    }

    pub fn hub(&self) -> HubConfig { HubConfig { queue_capacity: self.hub_queue_capacity } }

    pub fn restock_policy(&self) -> RestockPolicy {
        RestockPolicy { threshold: self.restock_threshold, quantity: self.restock_quantity, supplier_delay: self.supplier_delay }
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}
