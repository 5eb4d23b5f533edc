use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use commentary::auth::session;
use commentary::config::{Cli, Config};
use commentary::db;
use commentary::error::AppResult;
use commentary::routes;
use commentary::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path(), config.database.max_connections)?;
    db::run_migrations(&pool)?;

    let state = AppState::new(pool, config.clone());

    let mut app = routes::router(&config);

    // Test-only seed endpoint: creates a user + session, returns the token
    if std::env::var("COMMENTARY_TEST_SEED").is_ok() {
        tracing::warn!("Mounting /test/seed");
        app = app.route("/test/seed", get(test_seed));
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr = config.bind_addr()?;
    tracing::info!(
        "Listening on http://{}{}",
        addr,
        config.mount_prefix()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct SeedParams {
    username: Option<String>,
}

/// Test-only: seed a user + session and return the session token.
/// Only mounted when COMMENTARY_TEST_SEED env var is set.
async fn test_seed(
    State(state): State<AppState>,
    Query(params): Query<SeedParams>,
) -> AppResult<Json<Value>> {
    let username = params.username.unwrap_or_else(|| "testuser".to_string());
    let user = session::create_user(&state.db, &username)?;
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    Ok(Json(json!({
        "user_id": user.id,
        "username": user.username,
        "token": token,
    })))
}
