use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use wholesale_api::{
    app_router,
    commerce::{client::RestCommerceClient, CommercePlatform},
    config, db, events,
    handlers::AppServices,
    services::notifications::NotificationService,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    info!(environment = %cfg.environment, "starting wholesale-api");

    let db = Arc::new(db::establish_connection_from_app_config(&cfg).await?);
    if cfg.auto_migrate {
        db::run_migrations(&db).await?;
    }

    let (event_sender, event_receiver) = events::channel(1024);
    let notifications = NotificationService::new(db.clone());
    tokio::spawn(events::process_events(event_receiver, notifications));

    let platform: Option<Arc<dyn CommercePlatform>> = if cfg.commerce.enabled {
        Some(Arc::new(RestCommerceClient::new(&cfg.commerce)?))
    } else {
        warn!("commerce platform disabled; transfer and reconciliation are unavailable");
        None
    };

    let services = AppServices::build(
        db.clone(),
        Some(event_sender),
        platform,
        cfg.sync.clone(),
    );

    // Background reconciliation loop, when a platform is configured.
    if let Some(reconciliation) = services.reconciliation.clone() {
        let interval_secs = cfg.sync.interval_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match reconciliation.run_sync().await {
                    Ok(report) => info!(
                        processed = report.processed,
                        created = report.created_shipments,
                        failed = report.failures.len(),
                        "scheduled reconciliation pass complete"
                    ),
                    Err(e) => error!(error = %e, "scheduled reconciliation pass failed"),
                }
            }
        });
    }

    let state = AppState {
        db,
        config: cfg.clone(),
        services,
    };
    let app = app_router(state);

    let listener = TcpListener::bind(cfg.bind_address()).await?;
    info!(address = %cfg.bind_address(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
