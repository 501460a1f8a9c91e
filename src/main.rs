use dotenvy::dotenv;
use temple_ledger::{
    api::{AppState, build_router},
    config::{self, database},
    core::receipt_sequence,
    errors::Result,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env file before anything reads the environment
    dotenv().ok(); // Non-fatal, env vars can be set externally

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(
        &app_config.database.url,
        app_config.database.query_timeout(),
    )
    .await
    .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed receipt sequences from existing history
    let sequences = receipt_sequence::seed_sequences(&db)
        .await
        .inspect_err(|e| error!("Failed to seed receipt sequences: {}", e))?;
    for sequence in &sequences {
        info!(
            transaction_type = ?sequence.transaction_type,
            next_number = sequence.next_number,
            "Receipt sequence ready"
        );
    }

    // 6. Serve until Ctrl-C
    let state = AppState::new(db, &app_config);
    let listener = TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind_address, e))?;
    info!(address = %app_config.server.bind_address, "Temple ledger listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
