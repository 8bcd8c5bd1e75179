// ============================================================================
// TRX LOTTO — SERVER
// ============================================================================
//
// Two draws a day: day pays at 13:35 (betting closes 13:10), night pays at
// 21:50 (betting closes 20:10). Deposits and withdrawals are processed by
// hand through the admin routes.
//
// Run:  LOTTO_ADMIN_PIN=... cargo run
// Test: curl http://localhost:8080/health

use std::sync::Arc;

use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trx_lotto::config::{AdminPinSource, LottoConfig, StorageBackend};
use trx_lotto::routes::{self, AppState};
use trx_lotto::{AdminGuard, JsonDirStore, KeyValueStore, Ledger, MemoryStore, RedbStore, SecretHasher, SystemClock};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn open_store(config: &LottoConfig) -> Result<Arc<dyn KeyValueStore>, BoxError> {
    let store: Arc<dyn KeyValueStore> = match config.storage {
        StorageBackend::Memory => {
            warn!("In-memory storage: nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::JsonDir => Arc::new(JsonDirStore::open(&config.data_dir)?),
        StorageBackend::Redb => Arc::new(RedbStore::open(&config.data_dir)?),
    };
    Ok(store)
}

fn admin_guard(config: &LottoConfig) -> Result<AdminGuard, BoxError> {
    match &config.admin_pin {
        AdminPinSource::Hash(hash) => Ok(AdminGuard::from_hash(hash.clone())),
        AdminPinSource::Plain(pin) => {
            warn!("Admin PIN given in plaintext; prefer LOTTO_ADMIN_PIN_HASH");
            let hasher = SecretHasher::new(config.hash_cost)?;
            Ok(AdminGuard::from_pin(pin, &hasher)?)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
    warn!("🛑 Shutdown signal received");
}

async fn run() -> Result<(), BoxError> {
    let config = LottoConfig::from_env()?;
    info!(
        bind = %config.bind_addr,
        storage = ?config.storage,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    let store = open_store(&config)?;
    let ledger = Ledger::open(store, Arc::new(SystemClock), config.ledger_settings())?;
    let state = AppState::new(ledger, admin_guard(&config)?).with_session_ttl(config.session_ttl);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("🚀 Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,trx_lotto=debug")))
        .with(tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true))
        .init();

    info!("🎰 TRX Lotto v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("❌ FATAL: {}", e);
        std::process::exit(1);
    }
}
