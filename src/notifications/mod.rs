//! Real-time user notifications.
//!
//! - `hub`: the control loop and its handles
//! - `registry`: connection bookkeeping owned by the loop
//! - `connection`: what the hub delivers into
//! - `message`: notification payloads and wire format

mod connection;
mod hub;
mod message;
pub(crate) mod registry;

pub use connection::{ChannelConnection, Connection, ConnectionId, DeliveryError};
pub use hub::{HubConfig, HubStats, HubTask, NotificationHub, Publisher, REGISTRY_BATCH};
pub use message::{InventoryRestock, Notification, NotificationMessage, PriceAdjustment};
pub use registry::{ClientRegistry, Delivery};
