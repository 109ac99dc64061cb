mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::content::ContentLibrary;
use services::repository::{MemorySceneRepository, PgSceneRepository, SceneRepository};
use services::session::SessionGate;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();

    // Without a database the canvas still works, but only until restart.
    let repo: Arc<dyn SceneRepository> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgSceneRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; canvas uses the in-memory store");
            Arc::new(MemorySceneRepository::new())
        }
    };

    let gate = SessionGate::new(config.canvas_password.as_deref());
    if !gate.is_configured() {
        tracing::warn!("CANVAS_PASSWORD not set; canvas login disabled");
    }

    let state = state::AppState::new(
        gate,
        repo,
        config.save_retry,
        ContentLibrary::new(&config.content_dir),
        config.cookie,
    );

    let app = routes::app(state, config.canvas_body_limit_bytes, &config.website_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(
        port = config.port,
        content_dir = %config.content_dir.display(),
        website_dir = %config.website_dir.display(),
        "folio server listening"
    );
    axum::serve(listener, app).await.expect("server failed");
}
