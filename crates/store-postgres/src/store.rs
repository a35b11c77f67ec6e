use async_trait::async_trait;
use cadence_core::{
    AccountId, AutomationId, EmailLogId, ScheduledEmail, ScheduledEmailId, ScheduledEmailStatus, TemplateId,
};
use cadence_store::{NewScheduledEmail, ScheduledEmailStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::migrations;

fn status_to_str(status: ScheduledEmailStatus) -> &'static str {
    match status {
        ScheduledEmailStatus::Pending => "pending",
        ScheduledEmailStatus::Processing => "processing",
        ScheduledEmailStatus::Sent => "sent",
        ScheduledEmailStatus::Failed => "failed",
        ScheduledEmailStatus::Cancelled => "cancelled",
    }
}

fn str_to_status(s: &str) -> Result<ScheduledEmailStatus, StoreError> {
    match s {
        "pending" => Ok(ScheduledEmailStatus::Pending),
        "processing" => Ok(ScheduledEmailStatus::Processing),
        "sent" => Ok(ScheduledEmailStatus::Sent),
        "failed" => Ok(ScheduledEmailStatus::Failed),
        "cancelled" => Ok(ScheduledEmailStatus::Cancelled),
        other => Err(StoreError::Backend(format!("unrecognized status {other}"))),
    }
}

fn row_to_scheduled_email(row: &sqlx::postgres::PgRow) -> Result<ScheduledEmail, StoreError> {
    let status: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    let attempts: i32 = row.try_get("attempts").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(ScheduledEmail {
        id: ScheduledEmailId(row.try_get::<Uuid, _>("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        account_id: AccountId(row.try_get("account_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        owner_id: cadence_core::OwnerId(row.try_get("owner_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        automation_id: AutomationId(
            row.try_get("automation_id").map_err(|e| StoreError::Backend(e.to_string()))?,
        ),
        node_id: row.try_get("node_id").map_err(|e| StoreError::Backend(e.to_string()))?,
        template_id: TemplateId(row.try_get("template_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        trigger_field: row.try_get("trigger_field").map_err(|e| StoreError::Backend(e.to_string()))?,
        qualification_value: row
            .try_get("qualification_value")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        status: str_to_status(&status)?,
        scheduled_for: row.try_get("scheduled_for").map_err(|e| StoreError::Backend(e.to_string()))?,
        requires_verification: row
            .try_get("requires_verification")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        verified_at: row.try_get("verified_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error: row.try_get("last_error").map_err(|e| StoreError::Backend(e.to_string()))?,
        reason: row.try_get("reason").map_err(|e| StoreError::Backend(e.to_string()))?,
        failed_at: row.try_get("failed_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

/// PostgreSQL-backed implementation of [`ScheduledEmailStore`].
///
/// `claim` is a single conditional `UPDATE ... RETURNING`, never a
/// read-then-write pair, so two workers racing on the same row can never
/// both succeed (§5 "Shared-resource policy").
pub struct PostgresScheduledEmailStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresScheduledEmailStore {
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if pool creation or migration fails.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool, config })
    }

    /// Build a store from an already-connected pool, running migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, StoreError> {
        migrations::run_migrations(&pool, &config).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool, config })
    }

    fn table(&self) -> String {
        self.config.scheduled_emails_table()
    }
}

#[async_trait]
impl ScheduledEmailStore for PostgresScheduledEmailStore {
    async fn insert_batch(&self, rows: Vec<NewScheduledEmail>) -> Result<Vec<ScheduledEmail>, StoreError> {
        let table = self.table();
        let mut inserted = Vec::with_capacity(rows.len());

        let query = format!(
            "INSERT INTO {table} \
             (id, account_id, owner_id, automation_id, node_id, template_id, trigger_field, \
              qualification_value, status, scheduled_for, requires_verification, attempts, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10, 0, NOW(), NOW()) \
             ON CONFLICT (automation_id, account_id, template_id, qualification_value) \
             WHERE status IN ('pending', 'processing') DO NOTHING \
             RETURNING *"
        );

        for row in rows {
            let id = Uuid::new_v4();
            let maybe_row = sqlx::query(&query)
                .bind(id)
                .bind(row.account_id.0)
                .bind(row.owner_id.0)
                .bind(row.automation_id.0)
                .bind(&row.node_id)
                .bind(row.template_id.0)
                .bind(&row.trigger_field)
                .bind(&row.qualification_value)
                .bind(row.scheduled_for)
                .bind(row.requires_verification)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            if let Some(pg_row) = maybe_row {
                inserted.push(row_to_scheduled_email(&pg_row)?);
            }
        }
        Ok(inserted)
    }

    async fn exists_active(
        &self,
        automation_id: AutomationId,
        account_id: AccountId,
        template_id: TemplateId,
        qualification_value: &str,
    ) -> Result<bool, StoreError> {
        let table = self.table();
        let query = format!(
            "SELECT 1 FROM {table} \
             WHERE automation_id = $1 AND account_id = $2 AND template_id = $3 \
             AND qualification_value = $4 AND status IN ('pending', 'processing')"
        );
        let row = sqlx::query(&query)
            .bind(automation_id.0)
            .bind(account_id.0)
            .bind(template_id.0)
            .bind(qualification_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn get(&self, id: ScheduledEmailId) -> Result<Option<ScheduledEmail>, StoreError> {
        let table = self.table();
        let query = format!("SELECT * FROM {table} WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_scheduled_email).transpose()
    }

    async fn list_due_for_verification(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        let table = self.table();
        let window = now + Duration::hours(24);
        let query = format!(
            "SELECT * FROM {table} \
             WHERE status = 'pending' AND requires_verification \
             AND scheduled_for >= $1 AND scheduled_for <= $2 \
             ORDER BY scheduled_for ASC LIMIT $3"
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(window)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_scheduled_email).collect()
    }

    async fn list_ready_to_send(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        let table = self.table();
        let query = format!(
            "SELECT * FROM {table} \
             WHERE status = 'pending' AND NOT requires_verification AND scheduled_for <= $1 \
             ORDER BY scheduled_for ASC LIMIT $2"
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_scheduled_email).collect()
    }

    async fn claim(&self, id: ScheduledEmailId) -> Result<bool, StoreError> {
        let table = self.table();
        let query = format!(
            "UPDATE {table} SET status = 'processing', attempts = attempts + 1, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING id"
        );
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn mark_verified(&self, id: ScheduledEmailId) -> Result<(), StoreError> {
        let table = self.table();
        let query = format!(
            "UPDATE {table} SET requires_verification = false, verified_at = NOW(), updated_at = NOW() \
             WHERE id = $1"
        );
        let result =
            sqlx::query(&query).bind(id.0).execute(&self.pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn cancel(&self, id: ScheduledEmailId, reason: &str) -> Result<(), StoreError> {
        let table = self.table();
        let query =
            format!("UPDATE {table} SET status = 'cancelled', reason = $2, updated_at = NOW() WHERE id = $1");
        let result = sqlx::query(&query)
            .bind(id.0)
            .bind(reason)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn mark_sent(&self, id: ScheduledEmailId, email_log_id: EmailLogId) -> Result<(), StoreError> {
        let table = self.table();
        let query = format!("UPDATE {table} SET status = 'sent', last_error = NULL, updated_at = NOW() WHERE id = $1");
        let result =
            sqlx::query(&query).bind(id.0).execute(&self.pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        let _ = email_log_id;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn mark_failed_or_retry(
        &self,
        id: ScheduledEmailId,
        error: &str,
        max_attempts: u32,
    ) -> Result<(), StoreError> {
        let table = self.table();
        let query = format!(
            "UPDATE {table} SET \
             status = CASE WHEN attempts < $2 THEN 'pending' ELSE 'failed' END, \
             failed_at = CASE WHEN attempts < $2 THEN failed_at ELSE NOW() END, \
             last_error = $3, updated_at = NOW() \
             WHERE id = $1"
        );
        let result = sqlx::query(&query)
            .bind(id.0)
            .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn cancel_pending_for_automation(
        &self,
        automation_id: AutomationId,
        reason: &str,
    ) -> Result<u64, StoreError> {
        let table = self.table();
        let query = format!(
            "UPDATE {table} SET status = 'cancelled', reason = $2, updated_at = NOW() \
             WHERE automation_id = $1 AND status IN ('pending', 'processing')"
        );
        let result = sqlx::query(&query)
            .bind(automation_id.0)
            .bind(reason)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn reap_stuck_processing(&self, threshold: Duration) -> Result<u64, StoreError> {
        let table = self.table();
        let cutoff = Utc::now() - threshold;
        let query =
            format!("UPDATE {table} SET status = 'pending', updated_at = NOW() WHERE status = 'processing' AND updated_at < $1");
        let result = sqlx::query(&query)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> PostgresConfig {
        PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/cadence_test".to_string()),
            table_prefix: format!("test_{}_", Uuid::new_v4().simple()),
            ..PostgresConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let store = PostgresScheduledEmailStore::new(test_config()).await.expect("pool creation should succeed");
        cadence_store::run_store_conformance_tests(&store).await.expect("conformance tests should pass");
    }
}
