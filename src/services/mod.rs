pub mod gateway_registry;
pub mod orchestrator;
pub mod webhook_handler;
pub mod webhook_verifier;

use {
    crate::domain::{
        error::PaymentError,
        order::OrderService,
        transaction::{PaymentOutcome, PaymentTransaction},
    },
    std::{future::Future, sync::Arc, time::Duration},
};

/// Bounds a store call.
pub(crate) async fn store_call<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, PaymentError>>,
) -> Result<T, PaymentError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| PaymentError::StoreTimeout(limit))?
}

/// Tells the order service about a terminal outcome. Runs only after the
/// status change has committed; failures are logged, not propagated.
///
/// The call runs on its own task, so it still completes when the caller's
/// future is dropped (client disconnect, request timeout).
pub(crate) async fn notify_order(
    orders: Arc<dyn OrderService>,
    tx: PaymentTransaction,
    outcome: PaymentOutcome,
    limit: Duration,
) {
    let task = tokio::spawn(async move {
        let call = orders.apply_payment_outcome(tx.order_id(), tx.id(), outcome);
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(())) => {
                tracing::info!(transaction_id = %tx.id(), order_id = %tx.order_id(), %outcome, "order notified");
            }
            Ok(Err(e)) => {
                tracing::error!(transaction_id = %tx.id(), order_id = %tx.order_id(), %outcome, error = %e, "order notification failed");
            }
            Err(_) => {
                tracing::error!(transaction_id = %tx.id(), order_id = %tx.order_id(), %outcome, "order notification timed out");
            }
        }
    });
    if let Err(e) = task.await {
        tracing::error!(error = %e, "order notification task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_store_call_is_a_store_timeout() {
        let limit = Duration::from_secs(5);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, PaymentError>(())
        };
        let err = store_call(limit, slow).await.unwrap_err();
        assert!(matches!(err, PaymentError::StoreTimeout(l) if l == limit), "{err:?}");
        assert!(err.is_retryable());
    }
}
