use {
    crate::domain::{
        audit::AuditEntry,
        error::PaymentError,
        id::{GatewayReference, PaymentMethod, TransactionId},
        store::{BoxFuture, TransactionStore},
        transaction::{NewTransaction, PaymentTransaction, TransactionPatch},
    },
    chrono::Utc,
    std::{collections::HashMap, sync::Arc},
    tokio::sync::RwLock,
};

#[derive(Default)]
struct Inner {
    transactions: HashMap<TransactionId, PaymentTransaction>,
    references: HashMap<(PaymentMethod, GatewayReference), TransactionId>,
    audit: Vec<AuditEntry>,
}

/// Process-local store for tests and local runs. The conditional update runs
/// under a single write lock, so it only serializes writers within one process.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every stored transaction, in no particular order.
    pub async fn snapshot(&self) -> Vec<PaymentTransaction> {
        self.inner.read().await.transactions.values().cloned().collect()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn create(
        &self,
        new: NewTransaction,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(async move {
            let now = Utc::now();
            let tx = new.into_transaction(TransactionId::generate(), now);
            let mut inner = self.inner.write().await;
            inner.audit.push(AuditEntry::created(tx.id(), "checkout", now));
            inner.transactions.insert(tx.id(), tx.clone());
            Ok(tx)
        })
    }

    fn get(&self, id: TransactionId) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(async move {
            self.inner
                .read()
                .await
                .transactions
                .get(&id)
                .cloned()
                .ok_or(PaymentError::NotFound(id))
        })
    }

    fn find_by_gateway_reference<'a>(
        &'a self,
        method: &'a PaymentMethod,
        reference: &'a GatewayReference,
    ) -> BoxFuture<'a, Result<Option<PaymentTransaction>, PaymentError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            let found = inner
                .references
                .get(&(method.clone(), reference.clone()))
                .and_then(|id| inner.transactions.get(id))
                .cloned();
            Ok(found)
        })
    }

    fn update(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        Box::pin(async move {
            let now = Utc::now();
            let mut inner = self.inner.write().await;
            let Inner {
                transactions,
                references,
                audit,
            } = &mut *inner;

            let tx = transactions.get_mut(&id).ok_or(PaymentError::NotFound(id))?;

            let reference_key = patch
                .gateway_reference
                .as_ref()
                .map(|r| (tx.method().clone(), r.clone()));
            if let Some(key) = &reference_key {
                if references.get(key).is_some_and(|owner| *owner != id) {
                    return Err(PaymentError::ReferenceConflict(key.1.to_string()));
                }
            }

            tx.apply(&patch, now)?;
            if let Some(key) = reference_key {
                references.insert(key, id);
            }
            audit.push(patch.audit_entry(id, now));
            Ok(tx.clone())
        })
    }

    fn audit_trail(
        &self,
        id: TransactionId,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, PaymentError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner
                .audit
                .iter()
                .filter(|entry| entry.transaction_id == id)
                .cloned()
                .collect())
        })
    }
}
