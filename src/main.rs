use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echodb::api;
use echodb::cli;
use echodb::clock::{Clock, SystemClock};
use echodb::gossip::{self, GossipEngine, HttpPeerSender};
use echodb::loader::{self, JsonFileSource};
use echodb::settings::APP_VERSION;
use echodb::storage::{spawn_maintenance, StorageEngine};
use echodb::task;
use echodb::version::VersionService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echodb=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars; anything invalid stops startup here
    let settings = cli::Cli::parse().into_settings();
    let http_address = settings.http_socket_address()?;
    let store_settings = settings.store_settings()?;
    let clock = Arc::new(SystemClock);

    let store = StorageEngine::with_clock(&store_settings, clock.clone())?;
    if let Some(path) = &settings.seed_file {
        loader::seed_store(&JsonFileSource::new(path), &store, clock.now())?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = vec![spawn_maintenance(
        store.clone(),
        store_settings.maintenance_interval,
    )];

    let mut gossip_server = None;
    if settings.gossip_enabled() {
        let gossip_settings = settings.gossip_settings()?;
        let sender = Arc::new(HttpPeerSender::new(gossip_settings.timeout)?);
        let engine = GossipEngine::new(&gossip_settings, sender, clock.clone())?;
        let gossip_address = settings.gossip_socket_address()?;

        let server = axum::Server::try_bind(&gossip_address)?
            .serve(gossip::router(engine.clone()).into_make_service())
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
        info!("Gossip listener on {}", gossip_address);
        gossip_server = Some(tokio::spawn(server));
        tasks.push(engine.start());
    } else {
        info!(run_mode = %settings.run_mode, peers = settings.peers.len(), "gossip disabled");
    }

    let app = api::api(api::AppState {
        store,
        versions: VersionService::new(format!("v{}", APP_VERSION)),
    });

    info!("Starting echodb on {}", http_address);
    let served = axum::Server::try_bind(&http_address)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await;
    if let Err(err) = &served {
        error!(err = %err, "API server failed");
    }

    // The shutdown sender is gone by now, so the gossip listener drains too
    task::stop_all(tasks).await;
    if let Some(server) = gossip_server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(err = %err, "gossip listener failed"),
            Err(err) => error!(err = %err, "gossip listener panicked"),
        }
    }
    info!("echodb stopped");
    served?;
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(err = %err, "unable to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}

async fn wait_for_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}
