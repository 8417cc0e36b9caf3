use {
    super::audit_repo::{insert_audit_entry, list_audit_entries},
    crate::domain::{
        audit::AuditEntry,
        error::PaymentError,
        id::{GatewayReference, OrderId, PayerId, PaymentMethod, TransactionId},
        money::{Currency, Money, MoneyAmount},
        store::{BoxFuture, TransactionStore},
        transaction::{NewTransaction, PaymentTransaction, TransactionPatch, TransactionStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::time::Duration,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    order_id: String,
    payer_id: String,
    amount_minor_units: i64,
    currency: String,
    method: String,
    status: String,
    gateway_reference: Option<String>,
    gateway_response: Option<serde_json::Value>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = PaymentError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.id),
            order_id: OrderId::new(row.order_id)?,
            payer_id: PayerId::new(row.payer_id)?,
            money: Money::new(
                MoneyAmount::new(row.amount_minor_units)?,
                Currency::try_from(row.currency.as_str())?,
            ),
            method: PaymentMethod::new(row.method)?,
            status: TransactionStatus::try_from(row.status.as_str())?,
            gateway_reference: row.gateway_reference.map(GatewayReference::new).transpose()?,
            gateway_response: row.gateway_response,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed store. The status precondition is part of the `UPDATE`'s
/// `WHERE` clause, so the compare-and-swap holds across process instances.
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub async fn migrate(&self) -> Result<(), PaymentError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PaymentError::Persistence(e.into()))
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, PaymentError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(format!("{}ms", self.statement_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn create_inner(&self, new: NewTransaction) -> Result<PaymentTransaction, PaymentError> {
        let now = Utc::now();
        let transaction = new.into_transaction(TransactionId::generate(), now);

        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO payment_transactions
                (id, order_id, payer_id, amount_minor_units, currency, method, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(transaction.id().as_uuid())
        .bind(transaction.order_id().as_str())
        .bind(transaction.payer_id().as_str())
        .bind(transaction.money().amount().minor_units())
        .bind(transaction.money().currency().as_str())
        .bind(transaction.method().as_str())
        .bind(transaction.status().as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_audit_entry(&mut tx, &AuditEntry::created(transaction.id(), "checkout", now))
            .await?;
        tx.commit().await?;
        Ok(transaction)
    }

    async fn get_inner(&self, id: TransactionId) -> Result<PaymentTransaction, PaymentError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, order_id, payer_id, amount_minor_units, currency, method, status,
                   gateway_reference, gateway_response, failure_reason, created_at, updated_at
            FROM payment_transactions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(PaymentError::NotFound(id))?.try_into()
    }

    async fn find_by_reference_inner(
        &self,
        method: &PaymentMethod,
        reference: &GatewayReference,
    ) -> Result<Option<PaymentTransaction>, PaymentError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, order_id, payer_id, amount_minor_units, currency, method, status,
                   gateway_reference, gateway_response, failure_reason, created_at, updated_at
            FROM payment_transactions
            WHERE method = $1 AND gateway_reference = $2
            "#,
        )
        .bind(method.as_str())
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentTransaction::try_from).transpose()
    }

    async fn update_inner(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<PaymentTransaction, PaymentError> {
        patch.validate()?;
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let updated = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE payment_transactions
            SET status = $3,
                gateway_reference = COALESCE($4, gateway_reference),
                gateway_response = COALESCE($5, gateway_response),
                failure_reason = COALESCE($6, failure_reason),
                updated_at = $7
            WHERE id = $1 AND status = $2
            RETURNING id, order_id, payer_id, amount_minor_units, currency, method, status,
                      gateway_reference, gateway_response, failure_reason, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.expected.as_str())
        .bind(patch.status.as_str())
        .bind(patch.gateway_reference.as_ref().map(|r| r.as_str()))
        .bind(&patch.gateway_response)
        .bind(patch.failure_reason.as_deref())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| reference_conflict(e, patch.gateway_reference.as_ref()))?;

        let Some(row) = updated else {
            // Precondition failed: tell a missing row apart from a lost race.
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM payment_transactions WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return match current {
                None => Err(PaymentError::NotFound(id)),
                Some(status) => Err(PaymentError::InvalidTransition {
                    from: TransactionStatus::try_from(status.as_str())?,
                    to: patch.status,
                }),
            };
        };

        insert_audit_entry(&mut tx, &patch.audit_entry(id, now)).await?;
        tx.commit().await?;
        row.try_into()
    }
}

/// A unique violation on `(method, gateway_reference)` becomes `ReferenceConflict`.
fn reference_conflict(err: sqlx::Error, reference: Option<&GatewayReference>) -> PaymentError {
    match (&err, reference) {
        (sqlx::Error::Database(db), Some(reference)) if db.is_unique_violation() => {
            PaymentError::ReferenceConflict(reference.to_string())
        }
        _ => err.into(),
    }
}

impl TransactionStore for PgTransactionStore {
    fn create(
        &self,
        new: NewTransaction,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(self.create_inner(new))
    }

    fn get(&self, id: TransactionId) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(self.get_inner(id))
    }

    fn find_by_gateway_reference<'a>(
        &'a self,
        method: &'a PaymentMethod,
        reference: &'a GatewayReference,
    ) -> BoxFuture<'a, Result<Option<PaymentTransaction>, PaymentError>> {
        Box::pin(self.find_by_reference_inner(method, reference))
    }

    fn update(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(self.update_inner(id, patch))
    }

    fn audit_trail(
        &self,
        id: TransactionId,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, PaymentError>> {
        Box::pin(list_audit_entries(&self.pool, id))
    }
}
