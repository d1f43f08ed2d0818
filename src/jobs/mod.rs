//! Background producers that publish into the notification hub.

mod inventory;
mod pricing;

pub use inventory::{InventoryJob, RestockPolicy};
pub use pricing::{reprice, PricingJob};

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Runs `tick` every `period`, first after one full period.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(job = name, period_secs = period.as_secs(), "Background job scheduled");
        loop {
            ticker.tick().await;
            tick().await;
        }
    })
}
