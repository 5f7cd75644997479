//! Lead bot server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use leadbot_catalog::QuizCatalog;
use leadbot_config::{load_settings, Settings};
use leadbot_persistence::{ConversationStore, InMemoryStore, ScyllaConfig};
use leadbot_server::{create_router, init_metrics, AppState};
use leadbot_transport::{CloudApiSender, MessageSender};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("LEADBOT_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!("Starting lead bot server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?settings.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let catalog = load_catalog(&settings);
    tracing::info!(steps = catalog.steps().len(), "Quiz catalog ready");

    let metrics_handle = match init_metrics() {
        Ok(handle) => {
            tracing::info!("Initialized Prometheus metrics at /metrics");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder failed to install; /metrics disabled");
            None
        }
    };

    let window = settings.window.duration();
    let store: Arc<dyn ConversationStore> = if settings.persistence.enabled {
        tracing::info!("Initializing ScyllaDB conversation store...");
        let scylla_config = ScyllaConfig {
            hosts: settings.persistence.scylla_hosts.clone(),
            keyspace: settings.persistence.keyspace.clone(),
            replication_factor: settings.persistence.replication_factor,
        };
        match leadbot_persistence::init_scylla(scylla_config, window).await {
            Ok(store) => {
                tracing::info!(
                    hosts = ?settings.persistence.scylla_hosts,
                    keyspace = %settings.persistence.keyspace,
                    "ScyllaDB conversation store initialized"
                );
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to initialize ScyllaDB: {}. Falling back to in-memory.",
                    e
                );
                Arc::new(InMemoryStore::new(window))
            }
        }
    } else {
        tracing::info!("Persistence disabled, using in-memory conversation store");
        Arc::new(InMemoryStore::new(window))
    };

    let sender: Arc<dyn MessageSender> = Arc::new(CloudApiSender::new(&settings.whatsapp)?);

    let host = settings.server.host.clone();
    let port = settings.server.port;

    let mut state = AppState::new(settings, store, sender, catalog);
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing with env-filter and optional JSON output
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("leadbot={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

/// Load the quiz catalog: configured YAML file, built-in set otherwise.
fn load_catalog(settings: &Settings) -> QuizCatalog {
    match &settings.catalog_path {
        Some(path) => match QuizCatalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(
                    path = %path,
                    error = %e,
                    "Failed to load quiz catalog; using the built-in set"
                );
                QuizCatalog::default()
            }
        },
        None => QuizCatalog::default(),
    }
}
