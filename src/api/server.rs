//! SheetMacro API Server implementation
//!
//! HTTP REST API server using Axum. Passes on the same sheet are serialized
//! through `SheetLocks`; different sheets run concurrently.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::config::EngineConfig;
use crate::core::FunctionRegistry;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// One async lock per sheet id. Entries live only while someone holds or
/// waits on them.
#[derive(Clone, Default)]
pub struct SheetLocks {
    locks: LockMap,
}

/// Exclusive access to one sheet; releases and prunes its entry on drop
pub struct SheetGuard {
    sheet_id: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SheetGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters clone the entry under this same map lock, so a count of one
        // means nobody else can reach it.
        if locks
            .get(&self.sheet_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.sheet_id);
        }
    }
}

impl SheetLocks {
    /// Wait for exclusive access to `sheet_id`
    pub async fn acquire(&self, sheet_id: &str) -> SheetGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(sheet_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        SheetGuard {
            sheet_id: sheet_id.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub registry: Arc<FunctionRegistry>,
    pub engine: Arc<EngineConfig>,
    pub locks: SheetLocks,
}

impl AppState {
    pub fn new(engine: EngineConfig, registry: FunctionRegistry) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: Arc::new(registry),
            engine: Arc::new(engine),
            locks: SheetLocks::default(),
        }
    }
}

/// Build the router (also used directly by tests)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/functions", get(handlers::functions))
        .route("/api/v1/evaluate", post(handlers::evaluate))
        .route("/api/v1/calculate", post(handlers::calculate))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, engine: EngineConfig) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetmacro=info,tower_http=info".into()),
        )
        .try_init();

    let registry = engine.build_registry()?;
    info!(functions = registry.len(), "function registry built");
    let state = Arc::new(AppState::new(engine, registry));
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔥 SheetMacro API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/functions, /api/v1/evaluate, /api/v1/calculate");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SheetMacro API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    info!("Shutdown signal received, stopping server...");
}
