use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::{CreateSubscriptionInput, SubscriptionRepo},
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_code: row.get("plan_code"),
        currency: row.get("currency"),
        status: row.get("status"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        last_tx_ref: row.get("last_tx_ref"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, user_id, plan_code, currency, status, \
     current_period_start, current_period_end, last_tx_ref, created_at, updated_at";

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_current(
        &self,
        user_id: Uuid,
        plan_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE user_id = $1 AND plan_code = $2
              AND status = 'active' AND current_period_end > $3
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(plan_code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_subscription))
    }

    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_code, currency, status,
                current_period_start, current_period_end, last_tx_ref
            )
            VALUES ($1, $2, $3, $4, 'active', $5, $6, $7)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.plan_code)
        .bind(&input.currency)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(&input.tx_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_subscription(row))
    }

    async fn extend_period(&self, id: Uuid, days: i64, tx_ref: &str) -> AppResult<bool> {
        // Extension stacks on the stored period end, not on now, so an early
        // renewal keeps the remaining days. Guarded on `active`.
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                current_period_end = current_period_end + make_interval(days => $2),
                last_tx_ref = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(days as i32)
        .bind(tx_ref)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active_ending_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE status = 'active'
              AND current_period_end > $1 AND current_period_end <= $2
            ORDER BY current_period_end ASC
            "#,
            SELECT_COLS
        ))
        .bind(now)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_subscription).collect())
    }
}
