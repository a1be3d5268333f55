use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Message;

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, session_id: &str, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO messages (id, session_id, content, is_user, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(&message.text)
        .bind(message.is_user)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save message {} for session {session_id}: {e}", message.id);
            AppError::db_query("Failed to save message", e)
        })?;
        Ok(())
    }
}
