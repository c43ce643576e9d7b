//! Bot server: gateway, idle sweeper and HTTP endpoints.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use balcao::background::BackgroundTasks;
use balcao::bot::{Dispatcher, DispatcherConfig, IdlePolicy, IdleSweeper};
use balcao::catalog::{CatalogRepository, DirCatalogRepository};
use balcao::clock::{Clock, SystemClock};
use balcao::config::{self, GatewayConfig};
use balcao::gateway::{
    CHANNEL_CAPACITY, GatewayBridge, GatewayCommand, GatewayTransport, PairingState,
    SubprocessGateway,
};
use balcao::server::{self, AppState};
use balcao::session::{self, SessionStore};
use balcao::store::DeliveryLog;
use balcao::store::file::FileDeliveryLog;
use balcao::transport::{PacedSender, Transport};

/// Running gateway: command channel plus the supervisor and bridge tasks.
struct GatewayHandles {
    commands: mpsc::Sender<GatewayCommand>,
    supervisor: JoinHandle<()>,
    bridge: JoinHandle<()>,
}

pub async fn run(
    config_path: &str,
    host_override: Option<IpAddr>,
    port_override: Option<u16>,
) -> Result<()> {
    let loaded = super::load_config(config_path).await?;
    let mut config = loaded.config;

    // CLI overrides config
    if let Some(host) = host_override {
        config.server.host = host.to_string();
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let catalogs: Arc<dyn CatalogRepository> = Arc::new(DirCatalogRepository::new(
        &loaded.catalog_dir,
        &config.catalogs.extension,
    ));
    match catalogs.list().await {
        Ok(items) => info!(
            dir = %loaded.catalog_dir.display(),
            count = items.len(),
            "Catalog directory ready"
        ),
        Err(e) => warn!(error = %e, "Catalogs unavailable; contacts will get an apology"),
    }

    let delivery_log: Arc<dyn DeliveryLog> =
        Arc::new(FileDeliveryLog::new(&loaded.delivery_log_path));
    let store = SessionStore::new();
    let session_count = store.counter();
    let sessions = session::shared(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let background_tasks = BackgroundTasks::new();
    let pairing = PairingState::new();

    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let transport: Arc<dyn Transport> = Arc::new(GatewayTransport::new(cmd_tx.clone()));
    let sender = PacedSender::new(transport, config.bot.typing_delay());

    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig {
        sessions: sessions.clone(),
        sender: sender.clone(),
        catalogs,
        delivery_log,
        background: background_tasks.clone(),
        clock: clock.clone(),
        bulk_delay: config.bot.bulk_delay(),
        store_location_url: config.bot.store_location_url.clone(),
    }));

    // Spawn idle sweeper
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = IdleSweeper::new(
        sessions.clone(),
        sender,
        clock.clone(),
        IdlePolicy::from_config(&config.bot),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(config.bot.sweep_interval(), shutdown_rx));

    let gateway = match config.gateway.clone() {
        Some(gateway_config) => {
            let bridge =
                GatewayBridge::new(&gateway_config.name, dispatcher, pairing.clone(), clock);
            Some(start_gateway(
                resolve_command(config_path, gateway_config),
                cmd_tx,
                cmd_rx,
                bridge,
            ))
        }
        None => {
            warn!("No gateway configured; the bot will not receive messages");
            None
        }
    };

    let state = AppState {
        sessions: session_count,
        pairing,
    };
    let app = server::build_app(state);

    let ip: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host '{}'", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop sweeping before the gateway goes away
    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;

    if let Some(gateway) = gateway {
        let _ = gateway.commands.send(GatewayCommand::Shutdown).await;
        drop(gateway.commands);
        let _ = gateway.supervisor.await;
        let _ = gateway.bridge.await;
    }

    // Wait for delivery log appends to land
    background_tasks.shutdown().await;

    info!("Server stopped");
    Ok(())
}

/// Resolve the gateway command path relative to the config file.
///
/// Bare program names are left for `PATH` lookup.
fn resolve_command(config_path: &str, mut gateway: GatewayConfig) -> GatewayConfig {
    let command = Path::new(&gateway.command);
    if command.components().count() > 1 {
        gateway.command = config::resolve_path(Path::new(config_path), command)
            .to_string_lossy()
            .to_string();
    }
    gateway
}

fn start_gateway(
    config: GatewayConfig,
    commands: mpsc::Sender<GatewayCommand>,
    cmd_rx: mpsc::Receiver<GatewayCommand>,
    bridge: GatewayBridge,
) -> GatewayHandles {
    let name = config.name.clone();
    let (evt_tx, evt_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let supervisor = tokio::spawn(SubprocessGateway::new(config).run(evt_tx, cmd_rx));
    let bridge = tokio::spawn(bridge.run(evt_rx));

    info!(gateway = %name, "Subprocess gateway started");
    GatewayHandles {
        commands,
        supervisor,
        bridge,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
