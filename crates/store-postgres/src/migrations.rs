use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Create the `scheduled_emails` table and its dedup/lookup indexes if they
/// do not already exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let table = config.scheduled_emails_table();
    let prefix = &config.table_prefix;

    let create_table = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id UUID PRIMARY KEY,
            account_id UUID NOT NULL,
            owner_id UUID NOT NULL,
            automation_id UUID NOT NULL,
            node_id TEXT NOT NULL,
            template_id UUID NOT NULL,
            trigger_field TEXT,
            qualification_value TEXT NOT NULL,
            status TEXT NOT NULL,
            scheduled_for TIMESTAMPTZ NOT NULL,
            requires_verification BOOLEAN NOT NULL,
            verified_at TIMESTAMPTZ,
            attempts INT NOT NULL DEFAULT 0,
            last_error TEXT,
            reason TEXT,
            failed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    );

    // Only Pending/Processing rows participate in the uniqueness constraint:
    // a Sent/Failed/Cancelled row must never block a fresh replan (§4.3).
    let create_dedup_index = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {prefix}scheduled_emails_dedup_idx \
         ON {table} (automation_id, account_id, template_id, qualification_value) \
         WHERE status IN ('pending', 'processing')"
    );

    let create_verification_index = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}scheduled_emails_verification_idx \
         ON {table} (scheduled_for) \
         WHERE status = 'pending' AND requires_verification"
    );

    let create_send_index = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}scheduled_emails_send_idx \
         ON {table} (scheduled_for) \
         WHERE status = 'pending' AND NOT requires_verification"
    );

    let create_processing_index = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}scheduled_emails_processing_idx \
         ON {table} (updated_at) \
         WHERE status = 'processing'"
    );

    sqlx::query(&create_table).execute(pool).await?;
    sqlx::query(&create_dedup_index).execute(pool).await?;
    sqlx::query(&create_verification_index).execute(pool).await?;
    sqlx::query(&create_send_index).execute(pool).await?;
    sqlx::query(&create_processing_index).execute(pool).await?;

    Ok(())
}
