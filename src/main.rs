//! Module Access service
//!
//! HTTP service exposing the module access engine: access checks, the
//! permission matrix with cascading edits, and role management.

use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use config::{LogFormat, LogTarget};
use module_access::{
    api, config, db,
    db::{SqliteAccessStore, SqliteRoleStore},
    models::ModuleTree,
    AccessService, AppConfig, AppState, RoleRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("module-access {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    if args.iter().any(|arg| arg == "--check-navigation") {
        return check_navigation(&config);
    }

    // The guard must be kept alive so buffered log lines reach the file
    let _log_guard = init_logging(&config);

    info!("Module access service starting up");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let tree = load_module_tree(&config)?;

    let access = Arc::new(
        AccessService::new(
            &tree,
            &config.access,
            Arc::new(SqliteAccessStore::new(db.clone())),
            Arc::new(SqliteRoleStore::new(db.clone())),
        )
        .context("Invalid module tree")?,
    );

    // A failed initial load keeps the system-role fallback; the admin can reload later
    if let Err(e) = access.reload().await {
        warn!(error = %e, "Initial permission load failed, serving defaults");
    }

    let roles = Arc::new(RoleRegistry::new(
        Arc::new(SqliteRoleStore::new(db.clone())),
        config.access.store_timeout(),
    ));

    let state = AppState {
        config: config.clone(),
        db,
        access,
        roles,
    };

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Module access service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Load the navigation tree named by the configuration
///
/// Without a file the tree is empty and only modules found in the access
/// store are served.
fn load_module_tree(config: &AppConfig) -> Result<ModuleTree> {
    match config.access.navigation_file {
        Some(ref path) if path.exists() => {
            info!("Loading navigation tree from {:?}", path);
            ModuleTree::load(path)
        }
        Some(ref path) => {
            warn!("Navigation file {:?} not found, using an empty module tree", path);
            Ok(ModuleTree::default())
        }
        None => {
            warn!("No navigation file configured, using an empty module tree");
            Ok(ModuleTree::default())
        }
    }
}

/// Validate the navigation file and exit
fn check_navigation(config: &AppConfig) -> Result<()> {
    let path = config
        .access
        .navigation_file
        .as_deref()
        .context("No navigation file configured (access.navigation_file)")?;

    let tree = ModuleTree::load(path)?;
    let resolver = module_access::services::FallbackResolver::new(
        &tree,
        config.access.logout_module_id.clone(),
    )
    .with_context(|| format!("Invalid navigation tree in {:?}", path))?;

    println!(
        "{:?}: {} sections, {} modules in the permission matrix",
        path,
        tree.sections().len(),
        resolver.module_count()
    );
    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;

    if matches!(log_config.target, LogTarget::Console | LogTarget::Both) {
        layers.push(fmt_layer(&log_config.format, std::io::stdout));
    }

    if matches!(log_config.target, LogTarget::File | LogTarget::Both) {
        let (writer, file_guard) = create_file_writer(log_config);
        layers.push(fmt_layer(&log_config.format, writer));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    guard
}

fn fmt_layer<W>(
    format: &LogFormat,
    writer: W,
) -> Box<dyn tracing_subscriber::Layer<tracing_subscriber::registry::Registry> + Send + Sync>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, Layer};

    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Ensure the directory holding the SQLite file exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, config: &AppConfig) -> Router {
    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api/v1", api::routes(&state))
        .with_state(state)
        .layer(trace_layer)
        .layer(cors)
}

fn print_help() {
    println!(
        r#"module-access {}

USAGE:
    module-access [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --check-navigation      Validate the configured navigation file and exit

ENVIRONMENT:
    MODULE_ACCESS_CONFIG        Path to configuration file
    MODULE_ACCESS_HOST          Listen address
    MODULE_ACCESS_PORT          Listen port
    MODULE_ACCESS_NAVIGATION    Path to the navigation tree file
    MODULE_ACCESS_LOG_FORMAT    pretty, compact or json
    DATABASE_URL                SQLite connection URL
    RUST_LOG                    Log filter

CONFIGURATION:
    The service looks for configuration files in the following order:
    1. Path specified by MODULE_ACCESS_CONFIG
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/module-access/config.yaml
    5. <user config dir>/module-access/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
