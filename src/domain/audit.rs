use {
    super::id::TransactionId,
    super::transaction::TransactionStatus,
    chrono::{DateTime, Utc},
    serde::Serialize,
};

/// Append-only record of one status change.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    pub transaction_id: TransactionId,
    pub action: String,
    pub from_status: Option<TransactionStatus>,
    pub to_status: TransactionStatus,
    pub actor: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry written alongside the initial insert.
    pub fn created(transaction_id: TransactionId, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            action: "created".to_string(),
            from_status: None,
            to_status: TransactionStatus::Created,
            actor: actor.to_string(),
            detail: serde_json::json!({}),
            created_at: now,
        }
    }
}
