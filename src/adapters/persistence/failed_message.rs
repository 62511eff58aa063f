use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::ports::mailer::OutboundMessage,
    application::use_cases::ledger::FailedMessageRepo,
    domain::entities::failed_message::FailedMessageRecord,
};

fn row_to_record(row: sqlx::postgres::PgRow) -> FailedMessageRecord {
    FailedMessageRecord {
        id: row.get("id"),
        recipient: row.get("recipient"),
        subject: row.get("subject"),
        body: row.get("body"),
        category: row.get("category"),
        last_error: row.get("last_error"),
        retry_count: row.get("retry_count"),
        last_attempt_at: row.get("last_attempt_at"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, recipient, subject, body, category, last_error, \
     retry_count, last_attempt_at, created_at";

#[async_trait]
impl FailedMessageRepo for PostgresPersistence {
    async fn enqueue(
        &self,
        message: &OutboundMessage,
        error: &str,
    ) -> AppResult<FailedMessageRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO failed_messages (id, recipient, subject, body, category, last_error)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(&message.recipient)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(&message.category)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_record(row))
    }

    async fn oldest(&self, limit: i64) -> AppResult<Vec<FailedMessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM failed_messages ORDER BY created_at ASC LIMIT $1",
            SELECT_COLS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM failed_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    async fn record_attempt(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE failed_messages SET
                retry_count = retry_count + 1,
                last_error = $2,
                last_attempt_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }
}
