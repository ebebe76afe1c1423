use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, signal, sync::mpsc};
use tracing::info;

use multisafepay_bridge as bridge;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = bridge::config::load_config()?;
    bridge::config::init_tracing(cfg.log_level(), cfg.log_json);
    bridge::metrics::init_metrics()?;

    let db = bridge::db::establish_connection_from_app_config(&cfg).await?;
    let db = Arc::new(db);

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = Arc::new(bridge::events::EventSender::new(event_tx));
    tokio::spawn(bridge::events::process_events(event_rx));

    let services = bridge::AppServices::new(db.clone(), cfg.clone(), event_sender.clone());
    let state = bridge::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = bridge::app_router(state);
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!(%addr, "starting multisafepay-bridge");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
