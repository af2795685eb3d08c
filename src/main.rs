use perpsync::engine::DEFAULT_NOTIFICATION_RETENTION;
use perpsync::ingestion::run_poller;
use perpsync::{
    api, config::Config, spawn_session, PositionDataSource, RpcDataSource, SessionConfig,
    SystemClock,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let registry = config.token_registry();
    tracing::info!(
        chain_id = config.chain_id,
        tokens = registry.tokens.len(),
        account = ?config.account,
        "Starting position session"
    );

    let (session, _session_task) = spawn_session(
        SessionConfig {
            account: config.account,
            registry,
            options: config.display,
            notification_retention: DEFAULT_NOTIFICATION_RETENTION,
            expiry_tick: Duration::from_secs(1),
        },
        Arc::new(SystemClock::new()),
    );

    let datasource: Arc<dyn PositionDataSource> = Arc::new(RpcDataSource::new(
        config.rpc_url.clone(),
        config.reader_address,
        config.vault_address,
    ));
    tokio::spawn(run_poller(
        datasource,
        session.clone(),
        Duration::from_millis(config.poll_interval_ms),
    ));

    // Create router
    let app = api::create_router(api::AppState::new(session, config.chain_id));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
