//! Client connections as seen by the hub

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::NotificationMessage;

/// Identity of one client session. Minted per upgrade and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for ConnectionId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Backlogged,
    #[error("transport error: {0}")]
    Transport(String),
}

/// A bidirectional channel to one client, owned by the hub once registered.
///
/// `deliver` runs on the hub's control loop and must not block. `close` may be
/// called more than once; calls after the first are no-ops.
pub trait Connection: Send + 'static {
    fn deliver(&mut self, message: &Arc<NotificationMessage>) -> Result<(), DeliveryError>;
    fn close(&mut self);
}

/// Hub side of a bounded outbound queue. The session task owns the receiver
/// and writes whatever arrives to the socket.
#[derive(Debug)]
pub struct ChannelConnection {
    tx: Option<mpsc::Sender<Arc<NotificationMessage>>>,
}

impl ChannelConnection {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<NotificationMessage>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }
}

impl Connection for ChannelConnection {
    fn deliver(&mut self, message: &Arc<NotificationMessage>) -> Result<(), DeliveryError> {
        let tx = self.tx.as_ref().ok_or(DeliveryError::Closed)?;
        tx.try_send(Arc::clone(message)).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    // Dropping the sender ends the session's outbound stream.
    fn close(&mut self) { self.tx = None; }
}
