use axum::serve;
use log::{info, warn};
use std::sync::Arc;
use studymate::ai::{GeminiClient, TextGenerator};
use studymate::config::AppConfig;
use studymate::seed;
use studymate::store::{MemoryStore, PostgresStore, Store};
use studymate::{build_app, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    info!("StudyMate: learning assistant API");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: server={}:{} store={} model={}",
        config.server.host, config.server.port, config.database.backend, config.ai.model
    );

    let client = GeminiClient::new(&config.ai, config.ai_api_key())?;
    if !client.is_configured() {
        warn!("No AI API key configured (GEMINI_API_KEY); AI features will answer 503");
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(client);

    if config.use_memory_store() {
        warn!("Using the in-memory store; data is lost on restart");
        run_server(Arc::new(MemoryStore::new()), generator, config).await
    } else {
        info!("Connecting to PostgreSQL...");
        let database_url = config.database_url()?;
        let max_connections = config.database.max_connections.unwrap_or(20);
        let postgres_store = PostgresStore::new(&database_url, max_connections).await?;

        info!("Running database migrations...");
        postgres_store.migrate().await?;

        run_server(Arc::new(postgres_store), generator, config).await
    }
}

async fn run_server<S: Store + 'static>(
    store: Arc<S>,
    generator: Arc<dyn TextGenerator>,
    config: AppConfig,
) -> anyhow::Result<()> {
    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        info!("Loading seed data...");
        seed::load_seed_data(store.as_ref()).await?;
    }

    let bind_address = config.server_address();
    let state = AppState::new(store, generator, config);
    if !state.extractor.pdf_supported().await {
        warn!("pdftotext not found; PDF uploads will be rejected as unreadable");
    }

    let listener = TcpListener::bind(&bind_address).await?;
    info!("StudyMate server running on http://{}", bind_address);
    info!("API documentation available at http://{}/docs", bind_address);

    serve(listener, build_app(state)).await?;

    Ok(())
}
