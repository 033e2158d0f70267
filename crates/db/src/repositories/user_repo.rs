//! Repository for the `users` table.

use sqlx::types::Json;
use sqlx::PgPool;
use stepiva_core::enneagram::EnneagramResult;

use crate::models::user::{UpdateNotificationPreferences, UpsertUser, User};

/// Column list for `users` queries.
const COLUMNS: &str = "id, email, display_name, enneagram_result, email_notifications, \
                       push_notifications, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    /// Insert the user or update the supplied profile fields.
    ///
    /// `None` fields keep their stored value.
    pub async fn upsert(pool: &PgPool, id: &str, input: &UpsertUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, email, display_name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                email = COALESCE(EXCLUDED.email, users.email), \
                display_name = COALESCE(EXCLUDED.display_name, users.display_name), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.display_name)
            .fetch_one(pool)
            .await
    }

    /// Make sure a row exists for `id` without touching existing data.
    pub async fn ensure_exists(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Store the assessment outcome, replacing any previous one.
    pub async fn set_enneagram_result(
        pool: &PgPool,
        id: &str,
        result: &EnneagramResult,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET enneagram_result = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(Json(result))
            .fetch_optional(pool)
            .await
    }

    pub async fn update_notification_preferences(
        pool: &PgPool,
        id: &str,
        input: &UpdateNotificationPreferences,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET \
                email_notifications = COALESCE($2, email_notifications), \
                push_notifications = COALESCE($3, push_notifications), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(input.email_notifications)
            .bind(input.push_notifications)
            .fetch_optional(pool)
            .await
    }

    /// Users that have never created a plan.
    pub async fn list_without_plans(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users u \
             WHERE NOT EXISTS (SELECT 1 FROM plans p WHERE p.user_id = u.id) \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }
}
