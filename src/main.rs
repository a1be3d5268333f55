mod agent;
mod analytics;
mod chat;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod service;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{Router, routing::get, routing::post, routing::put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::GeminiAgentService;
use crate::analytics::{Analytics, LogAnalytics, MeasurementProtocol};
use crate::chat::scheduler::Pacing;
use crate::chat::session::{Collaborators, SessionSettings};
use crate::config::AppConfig;
use crate::db::{PgSessionStore, SessionStore, UnconfiguredStore};
use crate::routes::api_routes::{
    end_session_handler, get_session_handler, send_message_handler, set_draft_handler,
    start_session_handler,
};
use crate::routes::ws_routes::ws_session_handler;
use crate::service::session_service::SessionService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibe_check=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();

    // ── Database (optional) ───────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url, config.database_max_connections).await?;
            Arc::new(PgSessionStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; conversations will not be persisted");
            Arc::new(UnconfiguredStore)
        }
    };

    // ── Collaborators ─────────────────────────────────────────────────────────
    let ai = GeminiAgentService::new(config.gemini_api_key.as_deref(), &config.gemini_model)?;

    let analytics: Arc<dyn Analytics> = match config.measurement_protocol() {
        Some((measurement_id, api_secret)) => {
            info!("Forwarding analytics events to GA4 ({measurement_id})");
            Arc::new(MeasurementProtocol::new(measurement_id, api_secret))
        }
        None => Arc::new(LogAnalytics),
    };

    let sessions = SessionService::new(
        Collaborators { ai: Arc::new(ai), store, analytics },
        SessionSettings {
            pacing: Pacing::default(),
            ai_timeout: config.ai_timeout,
            idle_ttl: config.session_idle_ttl,
        },
    );

    // ── Router ────────────────────────────────────────────────────────────────
    let app = Router::new()
        .route("/api/sessions", post(start_session_handler))
        .route(
            "/api/sessions/{id}",
            get(get_session_handler).delete(end_session_handler),
        )
        .route("/api/sessions/{id}/messages", post(send_message_handler))
        .route("/api/sessions/{id}/draft", put(set_draft_handler))
        .route("/ws/sessions/{id}", get(ws_session_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(sessions);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
