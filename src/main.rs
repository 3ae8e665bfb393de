use anyhow::{Context, Result};
use axum::middleware;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use forum_steward::{
    api::{
        create_forum_router, logging_middleware, security_headers_middleware, ForumApiState,
        RequestLogConfig,
    },
    config::sanitize_database_url,
    CommunityStore, DatabasePool, ForumService, InMemoryStore, ModerationGate, StewardConfig,
    SubmissionThrottle, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = StewardConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check the STEWARD_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting forum steward");

    let blocklist = config.moderation.build_blocklist()?;
    if blocklist.is_empty() {
        warn!("Blocklist is empty - submissions will never be flagged or blocked");
    }
    info!(
        terms = blocklist.len(),
        throttle_window_secs = config.throttle.window_secs,
        throttle_max_submissions = config.throttle.max_submissions,
        "Moderation configured"
    );

    let store: Arc<dyn CommunityStore> = if config.database.postgres_enabled {
        info!(
            url = %sanitize_database_url(&config.database.postgres_url),
            "Using PostgreSQL store"
        );
        let db = DatabasePool::new(
            &config.database.postgres_url,
            config.database.max_connections,
        )
        .await
        .context("Failed to connect to PostgreSQL")?;
        db.init_schema()
            .await
            .context("Failed to initialize database schema")?;
        info!(connections = db.pool().size(), "Database ready");
        db.community()
    } else {
        warn!("PostgreSQL disabled - using in-memory store, data is lost on restart");
        Arc::new(InMemoryStore::new())
    };

    let service = ForumService::new(
        store,
        Arc::new(SystemClock),
        ModerationGate::new(blocklist, config.moderation.limits.clone()),
        SubmissionThrottle::new(config.throttle),
    );

    let app = create_forum_router(ForumApiState::new(service))
        .layer(middleware::from_fn_with_state(
            RequestLogConfig {
                log_requests: config.logging.log_requests,
            },
            logging_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Forum steward listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging from the configured level
fn init_logging(config: &StewardConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
