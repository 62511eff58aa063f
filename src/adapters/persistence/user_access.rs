use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::UserAccessRepo,
    domain::entities::user_access::UserAccess,
};

fn row_to_user_access(row: sqlx::postgres::PgRow) -> UserAccess {
    UserAccess {
        user_id: row.get("id"),
        email: row.get("email"),
        trial_start: row.get("trial_start"),
        is_premium: row.get("is_premium"),
        premium_expires_at: row.get("premium_expires_at"),
        last_renewal_reminder_sent_at: row.get("last_renewal_reminder_sent_at"),
    }
}

const SELECT_COLS: &str =
    "id, email, trial_start, is_premium, premium_expires_at, last_renewal_reminder_sent_at";

#[async_trait]
impl UserAccessRepo for PostgresPersistence {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<UserAccess>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", SELECT_COLS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(row.map(row_to_user_access))
    }

    async fn extend_premium(&self, user_id: Uuid, days: i64) -> AppResult<UserAccess> {
        // Single-statement read-modify-write: GREATEST picks the later of
        // (now, stored expiry) so concurrent grants stay additive.
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                is_premium = TRUE,
                premium_expires_at = GREATEST(premium_expires_at, CURRENT_TIMESTAMP)
                    + make_interval(days => $2),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(days as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        row.map(row_to_user_access).ok_or(AppError::NotFound)
    }

    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                is_premium = FALSE,
                updated_at = CURRENT_TIMESTAMP
            WHERE is_premium = TRUE
              AND premium_expires_at IS NOT NULL AND premium_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn mark_reminder_sent(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET last_renewal_reminder_sent_at = $2, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
