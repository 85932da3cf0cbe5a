use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use moodlog_api::auth::rate_limit::RateLimitState;
use moodlog_api::blob::HttpObjectStore;
use moodlog_api::clock::SystemClock;
use moodlog_api::comment::{ClaudeCommenter, CommentGenerator, FallbackCommenter};
use moodlog_api::config::Config;
use moodlog_api::service::EntryService;
use moodlog_api::store::PgEntryRepository;
use moodlog_api::{db, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodlog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let blobs = HttpObjectStore::new(
        &config.storage_url,
        &config.storage_bucket,
        &config.storage_service_key,
    )?;

    let comments: Arc<dyn CommentGenerator> = if config.claude_api_key.is_empty() {
        tracing::warn!("CLAUDE_API_KEY not set, using the fallback comment");
        Arc::new(FallbackCommenter)
    } else {
        Arc::new(ClaudeCommenter::new(
            &config.claude_base_url,
            &config.claude_api_key,
            &config.claude_model,
        )?)
    };

    let clock = SystemClock::new(config.reference_offset()?);

    let state = AppState {
        config: config.clone(),
        entries: EntryService::new(
            Arc::new(PgEntryRepository::new(db)),
            Arc::new(blobs),
            comments,
            Arc::new(clock),
        ),
        rate_limiter: RateLimitState::new(),
    };

    let app = router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    // Client addresses feed the demo comment rate limit.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
