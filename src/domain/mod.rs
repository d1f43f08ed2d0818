//! Shop domain touched by the notification producers
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::{Product, ProductError};
pub use events::{DomainEvent, ProductEvent};
pub use value_objects::{Money, Quantity, UserId};
