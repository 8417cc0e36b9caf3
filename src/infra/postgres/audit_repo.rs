use {
    crate::domain::{
        audit::AuditEntry, error::PaymentError, id::TransactionId,
        transaction::TransactionStatus,
    },
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub async fn insert_audit_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &AuditEntry,
) -> Result<(), PaymentError> {
    sqlx::query(
        r#"
        INSERT INTO payment_audit_log
            (transaction_id, action, from_status, to_status, actor, detail, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.transaction_id.as_uuid())
    .bind(&entry.action)
    .bind(entry.from_status.map(|s| s.as_str()))
    .bind(entry.to_status.as_str())
    .bind(&entry.actor)
    .bind(&entry.detail)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    transaction_id: Uuid,
    action: String,
    from_status: Option<String>,
    to_status: String,
    actor: String,
    detail: serde_json::Value,
    created_at: DateTime<Utc>,
}

pub async fn list_audit_entries(
    pool: &sqlx::PgPool,
    id: TransactionId,
) -> Result<Vec<AuditEntry>, PaymentError> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT transaction_id, action, from_status, to_status, actor, detail, created_at
        FROM payment_audit_log
        WHERE transaction_id = $1
        ORDER BY id
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(AuditEntry {
                transaction_id: TransactionId::from_uuid(row.transaction_id),
                action: row.action,
                from_status: row
                    .from_status
                    .as_deref()
                    .map(TransactionStatus::try_from)
                    .transpose()?,
                to_status: TransactionStatus::try_from(row.to_status.as_str())?,
                actor: row.actor,
                detail: row.detail,
                created_at: row.created_at,
            })
        })
        .collect()
}
