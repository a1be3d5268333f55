//! Best-effort mirroring of sessions and messages to PostgreSQL.

pub mod message_repository;
pub mod session_repository;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::{Message, Profile};

use self::message_repository::MessageRepository;
use self::session_repository::SessionRepository;

/// The persistence collaborator. Callers treat every failure as non-fatal.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, profile: &Profile) -> Result<String, AppError>;

    async fn save_message(&self, session_id: &str, message: &Message) -> Result<(), AppError>;

    async fn update_session_email(&self, session_id: &str, email: &str) -> Result<(), AppError>;
}

/// Connects, runs migrations, and returns the pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(AppError::DatabaseConnectionFailed)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Unexpected(format!("Failed to run database migrations: {e}")))?;

    info!("Database connection established and migrations applied");
    Ok(pool)
}

#[derive(Clone)]
pub struct PgSessionStore {
    sessions: SessionRepository,
    messages: MessageRepository,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: SessionRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create_session(&self, profile: &Profile) -> Result<String, AppError> {
        self.sessions.create(profile).await
    }

    async fn save_message(&self, session_id: &str, message: &Message) -> Result<(), AppError> {
        self.messages.save(session_id, message).await
    }

    async fn update_session_email(&self, session_id: &str, email: &str) -> Result<(), AppError> {
        self.sessions.update_email(session_id, email).await
    }
}

/// Stand-in used when no database is configured; every call fails.
#[derive(Clone, Copy, Default)]
pub struct UnconfiguredStore;

#[async_trait]
impl SessionStore for UnconfiguredStore {
    async fn create_session(&self, _profile: &Profile) -> Result<String, AppError> {
        Err(AppError::StoreUnavailable)
    }

    async fn save_message(&self, _session_id: &str, _message: &Message) -> Result<(), AppError> {
        Err(AppError::StoreUnavailable)
    }

    async fn update_session_email(&self, _session_id: &str, _email: &str) -> Result<(), AppError> {
        Err(AppError::StoreUnavailable)
    }
}
