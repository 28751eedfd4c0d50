//! Huddle server binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Load the response catalog and open the SQLite database
//! 4. Start the axum REST API server

mod cli;

use clap::Parser;

use huddle_api::routes;
use huddle_api::state::AppState;
use huddle_core::catalog::ResponseCatalog;
use huddle_core::config::HuddleConfig;
use huddle_storage::Database;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so the file's log level applies. This is
    // `HuddleConfig::load_or_default` split in two: its fallback warning would
    // be emitted before a subscriber exists, so it is logged below instead.
    let config_file = args.resolve_config_path();
    let loaded = HuddleConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => HuddleConfig::default(),
    };
    args.apply(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Huddle v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Catalog.
    let catalog_path = config.catalog_path();
    let catalog = ResponseCatalog::load_or_builtin(catalog_path.as_deref())?;
    tracing::info!(
        topics = catalog.len(),
        custom = catalog_path.is_some(),
        "Response catalog ready"
    );

    // Storage.
    let db_path = config.database_path();
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let state = AppState::new(config.clone(), db, catalog);

    routes::start_server(&config, state).await?;

    Ok(())
}
