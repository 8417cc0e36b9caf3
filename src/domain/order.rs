use {
    super::error::PaymentError,
    super::id::{OrderId, TransactionId},
    super::store::BoxFuture,
    super::transaction::PaymentOutcome,
};

/// Outbound port to the service that owns orders.
pub trait OrderService: Send + Sync {
    fn apply_payment_outcome<'a>(
        &'a self,
        order_id: &'a OrderId,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> BoxFuture<'a, Result<(), PaymentError>>;
}
