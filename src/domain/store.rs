use {
    super::audit::AuditEntry,
    super::error::PaymentError,
    super::id::{GatewayReference, PaymentMethod, TransactionId},
    super::transaction::{NewTransaction, PaymentTransaction, TransactionPatch},
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable record of payment transactions; the only shared mutable state.
///
/// `update` must be atomic and conditioned on the stored status so that
/// concurrent writers (webhook deliveries, cancellation, the initial gateway
/// response) resolve to exactly one winner across process instances.
pub trait TransactionStore: Send + Sync {
    fn create(
        &self,
        new: NewTransaction,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>>;

    /// Fails with [`PaymentError::NotFound`] for an unknown id.
    fn get(&self, id: TransactionId) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>>;

    fn find_by_gateway_reference<'a>(
        &'a self,
        method: &'a PaymentMethod,
        reference: &'a GatewayReference,
    ) -> BoxFuture<'a, Result<Option<PaymentTransaction>, PaymentError>>;

    /// Fails with [`PaymentError::InvalidTransition`] when the stored status no
    /// longer equals `patch.expected`, writing nothing.
    fn update(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>>;

    fn audit_trail(&self, id: TransactionId)
    -> BoxFuture<'_, Result<Vec<AuditEntry>, PaymentError>>;
}
