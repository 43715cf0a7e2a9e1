//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: storage init, migrations,
//! default admin, REST API, session cleanup, metrics and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::{start_session_cleanup_task, NoteService, UserService};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::RepositoryProvider;
use crate::infrastructure::{
    init_database, run_migrations, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};
use crate::interfaces::http::middleware::SessionCookie;
use crate::interfaces::http::modules::metrics::install_recorder;
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Options for starting the service.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the configured admin when no user exists (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

/// Handle to a running service.
///
/// ```rust,no_run
/// use notes_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub users: Arc<UserService>,
    pub notes: Arc<NoteService>,
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to.
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
    cleanup_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let mut app_cfg = opts.config;

        info!("Starting notes service...");

        if app_cfg.ensure_jwt_secret() {
            warn!("security.jwt_secret is empty, using a random secret; tokens will not survive a restart");
        }
        let jwt_config = app_cfg.security.jwt_config();
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            match app_cfg.database.backend {
                StorageBackend::Memory => {
                    warn!("Using in-memory storage, data is lost on shutdown");
                    (Arc::new(InMemoryRepositoryProvider::new()), None)
                }
                StorageBackend::Sqlite => {
                    let db = init_database(&app_cfg.database.to_database_config()).await?;
                    if opts.auto_migrate {
                        info!("Running database migrations...");
                        run_migrations(&db).await?;
                    }
                    (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
                }
            };

        // ── Services ───────────────────────────────────────────
        let users = Arc::new(
            UserService::new(repos.clone(), jwt_config).with_hash_cost(app_cfg.security.bcrypt_cost),
        );
        let notes = Arc::new(NoteService::new(repos.clone()));

        if opts.create_default_admin && app_cfg.admin.enabled {
            let admin = &app_cfg.admin;
            match users
                .ensure_default_admin(&admin.username, &admin.email, &admin.password)
                .await
            {
                Ok(Some(_)) => info!(email = %admin.email, "Default admin created"),
                Ok(None) => {}
                Err(e) => error!(error = %e, "Failed to create default admin"),
            }
        }

        let prometheus_handle = if app_cfg.server.metrics {
            Some(prometheus_handle()?)
        } else {
            None
        };

        // ── Shutdown & background tasks ────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout_secs);
        let shutdown_signal = shutdown.signal();

        let cleanup_task = start_session_cleanup_task(
            users.clone(),
            shutdown_signal.clone(),
            app_cfg.sessions.cleanup_interval_secs,
        );

        // ── REST API server ────────────────────────────────────
        let cookie = SessionCookie {
            name: app_cfg.security.session_cookie.clone(),
            secure: app_cfg.security.cookie_secure,
        };
        let state = AppState::new(users.clone(), notes.clone(), cookie, db.clone());
        let api_router =
            create_api_router(state, &app_cfg.cors.allowed_origins, prometheus_handle);

        let listener = tokio::net::TcpListener::bind(app_cfg.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Notes service started");

        Ok(Self {
            users,
            notes,
            repos,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            cleanup_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered,
    /// bounded by `server.shutdown_timeout_secs`.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let Self {
            db,
            shutdown,
            api_task,
            cleanup_task,
            ..
        } = self;

        shutdown
            .run_with_timeout(async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
                if let Err(e) = cleanup_task.await {
                    error!("Session cleanup task panicked: {}", e);
                }
            })
            .await;

        if let Some(db) = db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("✅ Database connection closed");
            }
        }

        info!("👋 Notes service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down notes service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// The global recorder can only be installed once per process;
/// a restart within the same process reuses it.
fn prometheus_handle() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = install_recorder()?;
    info!("📊 Prometheus metrics recorder installed");
    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

/// Initialize tracing from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn memory_options() -> ServerOptions {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.api_port = 0;
        config.server.metrics = false;
        config.server.shutdown_timeout_secs = 5;
        config.database.backend = StorageBackend::Memory;
        config.security.bcrypt_cost = 4;
        ServerOptions {
            config,
            ..ServerOptions::default()
        }
    }

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn memory_server_serves_health_and_shuts_down() {
        let handle = ServerHandle::start(memory_options()).await.unwrap();
        assert!(handle.is_running());
        assert!(!handle.config.security.jwt_secret.is_empty());

        let response = raw_get(handle.local_addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"memory\""));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn default_admin_is_created_on_empty_store() {
        let handle = ServerHandle::start(memory_options()).await.unwrap();

        let admin = handle.users.login("admin", "admin123").await.unwrap();
        assert!(admin.user.is_admin());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn admin_creation_can_be_skipped() {
        let mut opts = memory_options();
        opts.create_default_admin = false;
        let handle = ServerHandle::start(opts).await.unwrap();

        assert!(handle.users.login("admin", "admin123").await.is_err());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn sqlite_backend_migrates_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = memory_options();
        opts.config.database.backend = StorageBackend::Sqlite;
        opts.config.database.path = dir.path().join("server.db").display().to_string();

        let handle = ServerHandle::start(opts).await.unwrap();
        assert_eq!(handle.repos.users().count_users().await.unwrap(), 1);

        handle.shutdown().await;
    }
}
