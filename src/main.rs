use std::sync::Arc;

mod app;
mod auth;
mod cards;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory;
mod state;

use crate::{auth::session::SessionManager, config::AppConfig, state::AppState};
use axum::extract::FromRef;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "anime_cards=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let app_state = AppState::postgres(pool, config.clone());
    auth::session::spawn_purge_task(
        SessionManager::from_ref(&app_state),
        config.session.purge_interval(),
    );

    app::serve(app::build_app(app_state)).await
}
