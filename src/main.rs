use petrel_analytics::api::AppState;
use petrel_analytics::config::Config;
use petrel_analytics::server;
use petrel_analytics::store::{ledger, Store};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petrel_analytics=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        db_path = %config.db_path.display(),
        "Starting Petrel Analytics"
    );

    // Ensure the database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create data directory");
    }

    let store = Store::open(&config.db_path).expect("Failed to open database");

    // Periodic uniqueness-ledger pruning, off the request path
    if config.ledger_retention_days > 0 {
        let prune_store = store.clone();
        let retention_days = config.ledger_retention_days;
        let interval_secs = config.prune_interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let conn = prune_store.lock();
                match ledger::prune(&conn, chrono::Utc::now().date_naive(), retention_days) {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Pruned uniqueness ledger");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger prune failed");
                    }
                }
            }
        });
    }

    let secret = config.secret.clone().unwrap_or_else(|| {
        let secret = uuid::Uuid::new_v4().to_string();
        tracing::warn!("No secret configured; using a random one. Set PETREL_SECRET so fingerprints stay stable across restarts within a day.");
        secret
    });

    let state = Arc::new(AppState::new(store, secret, config.admin_key.clone()));

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
