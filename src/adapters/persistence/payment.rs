use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::{CreatePaymentInput, PaymentRepo},
    domain::entities::payment::Payment,
};

fn row_to_payment(row: sqlx::postgres::PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tx_ref: row.get("tx_ref"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: row.get("status"),
        gateway_tx_id: row.get("gateway_tx_id"),
        verified_at: row.get("verified_at"),
        failure_reason: row.get("failure_reason"),
        verification_snapshot: row.get("verification_snapshot"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, user_id, tx_ref, amount_cents, currency, status, \
     gateway_tx_id, verified_at, failure_reason, verification_snapshot, \
     created_at, updated_at";

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn create(&self, input: &CreatePaymentInput) -> AppResult<Payment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (id, user_id, tx_ref, amount_cents, currency, status)
            VALUES ($1, $2, $3, $4, $5, 'initiated')
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.tx_ref)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_payment(row))
    }

    async fn get_by_tx_ref(&self, tx_ref: &str) -> AppResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE tx_ref = $1",
            SELECT_COLS
        ))
        .bind(tx_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_payment))
    }

    async fn mark_callback_received(&self, tx_ref: &str) -> AppResult<bool> {
        // Advisory transition; anything past `initiated` keeps its state.
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = 'callback_received',
                updated_at = CURRENT_TIMESTAMP
            WHERE tx_ref = $1 AND status = 'initiated'
            "#,
        )
        .bind(tx_ref)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn settle(
        &self,
        tx_ref: &str,
        gateway_tx_id: Option<&str>,
        snapshot: &serde_json::Value,
    ) -> AppResult<bool> {
        // The WHERE clause is the at-most-once gate: of any number of
        // concurrent reconcilers, exactly one sees rows_affected = 1.
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = 'successful',
                gateway_tx_id = $2,
                verified_at = CURRENT_TIMESTAMP,
                verification_snapshot = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE tx_ref = $1 AND status IN ('initiated', 'callback_received')
            "#,
        )
        .bind(tx_ref)
        .bind(gateway_tx_id)
        .bind(snapshot)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            tracing::debug!(tx_ref, "Settle skipped - payment already terminal or missing");
        }
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, tx_ref: &str, reason: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = 'failed',
                failure_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE tx_ref = $1 AND status IN ('initiated', 'callback_received')
            "#,
        )
        .bind(tx_ref)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM payments
            WHERE status IN ('initiated', 'callback_received') AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
            SELECT_COLS
        ))
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_payment).collect())
    }
}
