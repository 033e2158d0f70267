//! Repository for the `notifications` table.

use sqlx::types::Json;
use sqlx::PgPool;
use stepiva_core::notification::{EmailStatus, NotificationType};
use stepiva_core::types::{DbId, Timestamp};

use crate::models::notification::{CreateNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, plan_id, milestone_id, notification_type, prompt, \
                       used_fallback, is_read, read_at, feedback, feedback_summary, \
                       email_status, notification_meta, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (user_id, plan_id, milestone_id, notification_type, prompt, used_fallback, notification_meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(&input.user_id)
            .bind(input.plan_id)
            .bind(&input.milestone_id)
            .bind(input.notification_type.as_str())
            .bind(&input.prompt)
            .bind(input.used_fallback)
            .bind(Json(&input.notification_meta))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Notifications written for one milestone, newest first.
    pub async fn list_for_milestone(
        pool: &PgPool,
        plan_id: DbId,
        milestone_id: &str,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE plan_id = $1 AND milestone_id = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(plan_id)
            .bind(milestone_id)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification belongs to the given user, `false`
    /// otherwise. Marking twice keeps the first `read_at`.
    pub async fn mark_read(pool: &PgPool, id: DbId, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the user's free-text reaction to a notification.
    pub async fn set_feedback(
        pool: &PgPool,
        id: DbId,
        user_id: &str,
        feedback: &str,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET feedback = $3, feedback_summary = NULL \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .bind(feedback)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_feedback_summary(
        pool: &PgPool,
        id: DbId,
        summary: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET feedback_summary = $2 WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_email_status(
        pool: &PgPool,
        id: DbId,
        status: &EmailStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET email_status = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(status))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Whether a reminder for this milestone was written at or after `since`.
    pub async fn exists_for_milestone_since(
        pool: &PgPool,
        plan_id: DbId,
        milestone_id: &str,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM notifications \
                WHERE plan_id = $1 AND milestone_id = $2 \
                  AND notification_type = $3 AND created_at >= $4)",
        )
        .bind(plan_id)
        .bind(milestone_id)
        .bind(NotificationType::MilestoneReminder.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Whether the user received a notification of `kind` at or after `since`.
    pub async fn exists_of_type_since(
        pool: &PgPool,
        user_id: &str,
        kind: NotificationType,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM notifications \
                WHERE user_id = $1 AND notification_type = $2 AND created_at >= $3)",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Latest non-empty feedback summaries for a user, newest first.
    pub async fn recent_feedback_summaries(
        pool: &PgPool,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT feedback_summary FROM notifications \
             WHERE user_id = $1 AND feedback_summary IS NOT NULL AND feedback_summary <> '' \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
