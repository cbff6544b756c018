use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordaudio_backend::domain::generation::{GenerationService, PacingConfig, RunTarget};
use wordaudio_backend::domain::job::JobRunner;
use wordaudio_backend::infrastructure::config::{Config, LogFormat};
use wordaudio_backend::infrastructure::db::{check_connection, create_pool};
use wordaudio_backend::infrastructure::http::start_http_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting WordAudio Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    if config.gemini_api_keys.is_empty() {
        tracing::warn!(
            "GEMINI_API_KEYS is empty; every synthesis attempt will fail until keys are provided"
        );
    } else {
        tracing::info!(
            key_count = config.gemini_api_keys.len(),
            "Gemini API keys loaded"
        );
    }

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool and outbound clients)
    tracing::info!("Instantiating repositories...");
    let ledger_repo = Arc::new(
        wordaudio_backend::infrastructure::repositories::PgAudioLedgerRepository::new(pool.clone()),
    );
    let storage_repo = Arc::new(
        wordaudio_backend::infrastructure::repositories::SupabaseStorageRepository::new(
            config.supabase_url.clone(),
            config.supabase_service_key.clone(),
            config.storage_bucket.clone(),
        ),
    );
    let tts_repo =
        Arc::new(wordaudio_backend::infrastructure::repositories::GeminiTtsRepository::new());

    // 2. Instantiate the generation engine (inject repositories)
    tracing::info!("Instantiating generation engine...");
    let engine = Arc::new(GenerationService::new(
        ledger_repo,
        storage_repo,
        tts_repo,
        config.gemini_api_keys.clone(),
        RunTarget {
            wordlist_path: config.wordlist_path.clone(),
            level: config.target_level.clone(),
            group_start: config.group_start,
            group_end: config.group_end,
        },
        PacingConfig::default(),
    ));

    // 3. Instantiate the job runner and controller
    tracing::info!("Instantiating job runner...");
    let runner = Arc::new(JobRunner::new(engine));
    let job_controller = Arc::new(wordaudio_backend::controllers::job::JobController::new(
        runner,
    ));

    // Start HTTP server with all routes
    start_http_server(pool, config, job_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wordaudio_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wordaudio_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
