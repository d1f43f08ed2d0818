//! Webshop notification service
//!
//! Pushes user-scoped notifications to browsers over WebSocket.
//!
//! ## Features
//! - Notification hub with a single control loop owning all connections
//! - WebSocket gateway keyed by `user_id`
//! - Dynamic pricing and autonomous restock jobs that notify the admin
//! - Admin endpoint for ad-hoc notices

pub mod catalog;
pub mod config;
pub mod domain;
pub mod http;
pub mod jobs;
pub mod notifications;

pub use config::{Config, ConfigError};
pub use notifications::{NotificationHub, Publisher};
