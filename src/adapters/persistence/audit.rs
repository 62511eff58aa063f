use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::AuditLogRepo,
};

#[async_trait]
impl AuditLogRepo for PostgresPersistence {
    async fn record_webhook(
        &self,
        tx_ref: Option<&str>,
        event: Option<&str>,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO webhook_log (id, tx_ref, event, payload) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(tx_ref)
        .bind(event)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    async fn record_callback(&self, tx_ref: &str, raw_query: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO callback_log (id, tx_ref, raw_query) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(tx_ref)
            .bind(raw_query)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }
}
