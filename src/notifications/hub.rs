//! Notification hub: a single control loop owning the connection registry.
//!
//! Producers never touch the registry. They enqueue registrations,
//! unregistrations and publishes on three bounded channels, and the loop
//! applies them one at a time. Registry changes are drained ahead of
//! publishes, so a producer that registers and then publishes sees its
//! registration take effect first.
//!
//! That priority is bounded: after [`REGISTRY_BATCH`] registry changes in a
//! row, one waiting publish is let through before the next change. A storm
//! of connects and disconnects slows delivery down but cannot stall it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{ClientRegistry, Connection, ConnectionId, Notification, NotificationMessage};
use crate::domain::UserId;

/// Registry changes applied back to back before a pending publish gets a turn.
pub const REGISTRY_BATCH: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Capacity of each of the three input channels.
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self { Self { queue_capacity: 256 } }
}

/// Snapshot published by the control loop after every iteration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub users: usize,
    pub published: u64,
    pub delivered: u64,
    pub evicted: u64,
}

struct Registration {
    id: ConnectionId,
    user_id: UserId,
    connection: Box<dyn Connection>,
}

/// Publish-only capability handed to background jobs and request handlers.
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::Sender<NotificationMessage>,
}

impl Publisher {
    /// Enqueues a notification for `user_id`. Waits only for channel capacity;
    /// delivery is best-effort and a no-op once the hub has stopped.
    pub async fn publish(&self, user_id: UserId, notification: Notification, message: impl Into<String>) {
        self.send(NotificationMessage::new(user_id, notification, message)).await;
    }

    pub async fn send(&self, message: NotificationMessage) {
        if let Err(mpsc::error::SendError(dropped)) = self.tx.send(message).await {
            debug!(user_id = %dropped.user_id, kind = dropped.notification.kind(), "Hub stopped, notification dropped");
        }
    }
}

/// Cloneable handle to a running hub.
#[derive(Clone)]
pub struct NotificationHub {
    register_tx: mpsc::Sender<Registration>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    publisher: Publisher,
    stats: watch::Receiver<HubStats>,
}

/// Owns the control task. Dropping it stops the loop as well.
pub struct HubTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl HubTask {
    /// Stops the loop, closes every registered connection and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Notification hub task failed");
        }
    }
}

impl NotificationHub {
    /// Starts the control loop on the current runtime.
    pub fn spawn(config: HubConfig) -> (Self, HubTask) {
        let capacity = config.queue_capacity.max(1);
        let (register_tx, register_rx) = mpsc::channel(capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
        let (publish_tx, publish_rx) = mpsc::channel(capacity);
        let (stats_tx, stats) = watch::channel(HubStats::default());
        let (shutdown, shutdown_rx) = oneshot::channel();

        let control = ControlLoop {
            registry: ClientRegistry::new(),
            register_rx,
            unregister_rx,
            publish_rx,
            shutdown_rx,
            stats_tx,
            stats: HubStats::default(),
            registry_streak: 0,
        };
        let handle = tokio::spawn(control.run());

        let hub = Self { register_tx, unregister_tx, publisher: Publisher { tx: publish_tx }, stats };
        (hub, HubTask { shutdown, handle })
    }

    /// Hands a connection to the hub. If the hub has stopped the connection
    /// is closed immediately.
    pub async fn register(&self, id: ConnectionId, user_id: UserId, connection: impl Connection) {
        let registration = Registration { id, user_id, connection: Box::new(connection) };
        if let Err(mpsc::error::SendError(mut rejected)) = self.register_tx.send(registration).await {
            debug!(connection_id = %id, user_id = %user_id, "Hub stopped, registration rejected");
            rejected.connection.close();
        }
    }

    /// Removes and closes a connection. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) {
        if self.unregister_tx.send(id).await.is_err() {
            debug!(connection_id = %id, "Hub stopped, unregister ignored");
        }
    }

    pub async fn publish(&self, user_id: UserId, notification: Notification, message: impl Into<String>) {
        self.publisher.publish(user_id, notification, message).await;
    }

    pub fn publisher(&self) -> Publisher { self.publisher.clone() }

    pub fn stats(&self) -> HubStats { *self.stats.borrow() }

    /// Subscribes to the loop's stats snapshots.
    pub fn watch_stats(&self) -> watch::Receiver<HubStats> { self.stats.clone() }
}

struct ControlLoop {
    registry: ClientRegistry,
    register_rx: mpsc::Receiver<Registration>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    publish_rx: mpsc::Receiver<NotificationMessage>,
    shutdown_rx: oneshot::Receiver<()>,
    stats_tx: watch::Sender<HubStats>,
    stats: HubStats,
    registry_streak: usize,
}

impl ControlLoop {
    async fn run(mut self) {
        info!("Notification hub started");
        loop {
            if self.registry_streak >= REGISTRY_BATCH {
                self.registry_streak = 0;
                if let Ok(message) = self.publish_rx.try_recv() {
                    self.deliver(message);
                    self.publish_stats();
                    continue;
                }
            }
            tokio::select! {
                biased;
                _ = &mut self.shutdown_rx => break,
                Some(reg) = self.register_rx.recv() => {
                    self.registry.insert(reg.id, reg.user_id, reg.connection);
                    self.registry_streak += 1;
                }
                Some(id) = self.unregister_rx.recv() => {
                    self.registry.remove(id);
                    self.registry_streak += 1;
                }
                Some(message) = self.publish_rx.recv() => self.deliver(message),
                else => break,
            }
            self.publish_stats();
        }
        let open = self.registry.len();
        self.registry.close_all();
        self.publish_stats();
        info!(closed = open, "Notification hub stopped");
    }

    fn deliver(&mut self, message: NotificationMessage) {
        self.registry_streak = 0;
        let message = Arc::new(message);
        let outcome = self.registry.deliver(&message);
        self.stats.published += 1;
        self.stats.delivered += outcome.delivered as u64;
        self.stats.evicted += outcome.evicted as u64;
        debug!(
            user_id = %message.user_id,
            kind = message.notification.kind(),
            delivered = outcome.delivered,
            evicted = outcome.evicted,
            "Notification processed"
        );
    }

    fn publish_stats(&mut self) {
        self.stats.connections = self.registry.len();
        self.stats.users = self.registry.user_count();
        self.stats_tx.send_replace(self.stats);
    }
}
