use chrono::Utc;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Profile;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a session row for `profile` and returns its id.
    pub async fn create(&self, profile: &Profile) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sessions
                (id, my_nickname, gender, partner_name, relationship, worry_content, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&id)
        .bind(&profile.my_nickname)
        .bind(&profile.gender)
        .bind(&profile.partner_name)
        .bind(&profile.relationship)
        .bind(&profile.worry_content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create session: {e}");
            AppError::db_query("Failed to create session", e)
        })?;
        Ok(id)
    }

    pub async fn update_email(&self, id: &str, email: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET user_email = $1 WHERE id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to update session email {id}: {e}");
                AppError::db_query("Failed to update session email", e)
            })?;
        Ok(())
    }
}
