//! Repository for the `plans` table.
//!
//! Step and milestone edits rewrite the whole `milestones` document. Run
//! them between [`PlanRepo::find_for_update`] and
//! [`PlanRepo::save_milestones`] on one transaction so concurrent edits to
//! the same plan serialize on the row lock instead of overwriting each other.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use stepiva_core::plan::Milestone;
use stepiva_core::types::DbId;

use crate::models::plan::{NewPlan, Plan};

/// Column list for `plans` queries.
const COLUMNS: &str = "id, user_id, goal_type, goal, target_date, status, nudge_frequency, \
                       milestones, created_at, updated_at";

pub struct PlanRepo;

impl PlanRepo {
    pub async fn create(pool: &PgPool, input: &NewPlan) -> Result<Plan, sqlx::Error> {
        let query = format!(
            "INSERT INTO plans (user_id, goal_type, goal, target_date, nudge_frequency, milestones) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Plan>(&query)
            .bind(&input.user_id)
            .bind(input.goal_type.trim())
            .bind(input.goal.trim())
            .bind(input.target_date)
            .bind(input.nudge_frequency.as_str())
            .bind(Json(&input.milestones))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE id = $1");
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's plans, newest first, optionally filtered by status.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Plan>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM plans \
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Plan>(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Every plan currently receiving reminders.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE status = 'active' ORDER BY id");
        sqlx::query_as::<_, Plan>(&query).fetch_all(pool).await
    }

    /// Patch status and/or nudge frequency. `None` keeps the stored value.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        status: Option<&str>,
        nudge_frequency: Option<&str>,
    ) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!(
            "UPDATE plans SET \
                status = COALESCE($2, status), \
                nudge_frequency = COALESCE($3, nudge_frequency), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .bind(status)
            .bind(nudge_frequency)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a plan. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Load a plan and lock its row for the rest of the transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Replace the milestone document of a plan.
    pub async fn save_milestones(
        conn: &mut PgConnection,
        id: DbId,
        milestones: &[Milestone],
    ) -> Result<Plan, sqlx::Error> {
        let query = format!(
            "UPDATE plans SET milestones = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .bind(Json(milestones))
            .fetch_one(conn)
            .await
    }
}
