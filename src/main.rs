use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btz_arena::{
    app::{AppState, build_router},
    clock::SystemClock,
    config::Config,
    db,
    features::{catalog, matchmaking::spawn_sweeper},
};

fn init_logging(log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "btz_arena=info".into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    init_logging(config.log_json);

    // Database configuration
    let pool = db::build_pool(&config.database_url, config.pool_size)
        .with_context(|| format!("opening database {}", config.database_url))?;
    db::run_migrations(&pool).context("applying schema")?;

    // Question catalog loading
    catalog::load_catalog(&pool, &config.questions_path)?;

    let state = AppState::new(pool, &config, Arc::new(SystemClock));
    let _sweeper = spawn_sweeper(state.matchmaking.clone());
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    log::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
