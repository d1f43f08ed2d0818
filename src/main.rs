//! Webshop notifier - WebSocket notification service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webshop_notifier::{
    catalog::{Catalog, InMemoryCatalog},
    http::{self, AppState},
    jobs::{spawn_periodic, InventoryJob, PricingJob},
    Config, NotificationHub,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    let cfg = Config::from_env()?;

    let (hub, hub_task) = NotificationHub::spawn(cfg.hub());
    let catalog: Arc<dyn Catalog> = if cfg.seed_demo_catalog {
        Arc::new(InMemoryCatalog::demo())
    } else {
        Arc::new(InMemoryCatalog::new())
    };

    let pricing = Arc::new(PricingJob::new(catalog.clone(), hub.publisher(), cfg.admin_user_id));
    let inventory = Arc::new(InventoryJob::new(catalog, hub.publisher(), cfg.admin_user_id, cfg.restock_policy()));
    let jobs = [
        spawn_periodic("pricing", cfg.pricing_interval, {
            let job = pricing.clone();
            move || {
                let job = job.clone();
                async move {
                    if let Err(e) = job.run_once().await { tracing::error!(error = %e, "Pricing run failed"); }
                }
            }
        }),
        spawn_periodic("inventory", cfg.inventory_interval, {
            let job = inventory.clone();
            move || {
                let job = job.clone();
                async move {
                    if let Err(e) = job.run_once().await { tracing::error!(error = %e, "Inventory run failed"); }
                }
            }
        }),
    ];

    let state = AppState { hub, pricing, inventory, connection_queue_capacity: cfg.connection_queue_capacity };
    let app = http::router(state);

    tracing::info!("🚀 Webshop notifier listening on 0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port)).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Shutting down background jobs and notification hub");
    for job in jobs { job.abort(); }
    hub_task.shutdown().await;
    tracing::info!("Server exited properly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
