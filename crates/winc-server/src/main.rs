//! Winc ledger HTTP server.
//!
//! Binds the REST adapter, runs schema migrations, and drives the
//! pending-transaction poller.

use std::net::SocketAddr;
use std::panic;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use winc_config::{validate_config, LedgerConfig};
use winc_core::SystemClock;
use winc_runtime::{CryptoCreditService, PendingTxPoller, TopUpService, UploadService};
use winc_server::gateway::HttpChainGateway;
use winc_server::pricing::FixedRateOracle;
use winc_server::{build_router, AppState};
use winc_store::LedgerStore;

#[derive(Parser, Debug)]
#[command(name = "winc-server")]
#[command(about = "Winc credit-ledger server", long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (defaults from NODE_ENV)
    #[arg(short, long)]
    port: Option<u16>,

    /// Chain gateway base URL for the pending-transaction poller
    #[arg(long, env = "CRYPTO_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Winc charged per byte by the dev pricing oracle
    #[arg(long, default_value = "1", env = "WINC_PER_BYTE")]
    winc_per_byte: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Number of worker threads (0 = automatic based on CPU cores)
    #[arg(short, long, default_value = "0")]
    worker_threads: usize,
}

/// Setup panic hook to log panics before aborting.
fn setup_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Server panic: {}", panic_info);
        default_hook(panic_info);
    }));
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    setup_panic_hook();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if args.worker_threads > 0 {
        runtime_builder.worker_threads(args.worker_threads);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async {
        let log_level = if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");

        serve(args).await
    })
}

async fn serve(args: Args) -> anyhow::Result<()> {
    let config = LedgerConfig::from_env()?;
    validate_config(&config)?;

    let store = Arc::new(LedgerStore::connect(&config.database).await?);
    store.migrate().await?;
    info!(env = %config.env, "ledger schema ready");

    let clock = Arc::new(SystemClock);
    let topup = Arc::new(TopUpService::new(store.clone(), clock.clone()));
    let uploads = Arc::new(UploadService::new(store.clone()));
    let crypto = Arc::new(CryptoCreditService::new(
        store.clone(),
        clock.clone(),
        config.crypto_fund_excluded_addresses.clone(),
    ));

    let poller_task = match args.gateway_url.as_deref() {
        Some(url) => {
            let poller = PendingTxPoller::new(
                store.clone(),
                Arc::new(HttpChainGateway::new(url)),
                clock.clone(),
                config.poller.clone(),
            );
            Some(tokio::spawn(poller.run()))
        }
        None => {
            info!("no chain gateway configured, pending-transaction poller disabled");
            None
        }
    };

    let state = AppState {
        store,
        topup,
        uploads,
        crypto,
        pricing: Arc::new(FixedRateOracle {
            winc_per_byte: args.winc_per_byte,
        }),
        webhook_secret: config.stripe.webhook_secret.clone(),
        admin_api_token: config.admin_api_token.clone(),
    };
    let router = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
    info!("Starting winc ledger server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = poller_task {
        task.abort();
    }
    info!("Server shutdown complete");
    Ok(())
}
