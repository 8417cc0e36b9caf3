use {
    super::{notify_order, store_call, webhook_verifier::WebhookVerifier},
    crate::domain::{
        error::PaymentError,
        id::PaymentMethod,
        order::OrderService,
        store::TransactionStore,
        transaction::{PaymentOutcome, TransactionPatch, TransactionStatus},
        webhook::{ReportedResult, WebhookOutcome},
    },
    chrono::Utc,
    std::{sync::Arc, time::Duration},
};

pub struct WebhookHandler {
    store: Arc<dyn TransactionStore>,
    orders: Arc<dyn OrderService>,
    verifier: WebhookVerifier,
    call_timeout: Duration,
}

impl WebhookHandler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        orders: Arc<dyn OrderService>,
        verifier: WebhookVerifier,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            orders,
            verifier,
            call_timeout,
        }
    }

    /// Processes one delivery. Returns only after the resulting state change
    /// (or no-op) has committed, so the caller may acknowledge on `Ok`.
    #[tracing::instrument(
        name = "webhook",
        skip_all,
        fields(method = %method, event_id = tracing::field::Empty, reference = tracing::field::Empty)
    )]
    pub async fn handle(
        &self,
        method: &PaymentMethod,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        let verified = signature
            .ok_or_else(|| PaymentError::Verification("missing signature header".into()))
            .and_then(|sig| self.verifier.verify(payload, sig, Utc::now()));
        let event = match verified {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(target: "security", %method, error = %e, "webhook rejected: verification failed");
                return Err(e);
            }
        };

        tracing::Span::current()
            .record("event_id", tracing::field::display(&event.event_id))
            .record("reference", tracing::field::display(&event.reference));

        let tx = match store_call(
            self.call_timeout,
            self.verifier.resolve(self.store.as_ref(), method, &event),
        )
        .await
        {
            Ok(tx) => tx,
            Err(e @ PaymentError::UnknownReference(_)) => {
                tracing::warn!("webhook for unmapped gateway reference");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if tx.status().is_terminal() {
            tracing::info!(transaction_id = %tx.id(), status = %tx.status(), "transaction already final, acknowledging");
            return Ok(WebhookOutcome::AlreadyFinal);
        }

        let (target, failure_reason) = match event.result {
            ReportedResult::Succeeded if event.money == *tx.money() => {
                (TransactionStatus::Succeeded, None)
            }
            ReportedResult::Succeeded => {
                tracing::warn!(
                    transaction_id = %tx.id(),
                    expected = %tx.money(),
                    reported = %event.money,
                    "gateway reported a different amount, failing transaction"
                );
                (
                    TransactionStatus::Failed,
                    Some(format!(
                        "amount mismatch: gateway reported {}, expected {}",
                        event.money,
                        tx.money()
                    )),
                )
            }
            ReportedResult::Failed => (
                TransactionStatus::Failed,
                Some(
                    event
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "gateway reported failure".to_string()),
                ),
            ),
        };

        let mut patch = TransactionPatch::transition(TransactionStatus::Processing, target)
            .with_response(event.raw.clone())
            .by(format!("webhook:{method}"));
        if let Some(reason) = failure_reason {
            patch = patch.with_failure_reason(reason);
        }

        let updated = match store_call(self.call_timeout, self.store.update(tx.id(), patch)).await {
            Ok(updated) => updated,
            Err(PaymentError::InvalidTransition { from, to }) => {
                tracing::info!(transaction_id = %tx.id(), current = %from, attempted = %to, "stale or duplicate delivery");
                return Ok(WebhookOutcome::Stale);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(transaction_id = %updated.id(), status = %updated.status(), "webhook applied");

        let status = updated.status();
        if let Some(outcome) = PaymentOutcome::from_status(status) {
            notify_order(self.orders.clone(), updated, outcome, self.call_timeout).await;
        }
        Ok(WebhookOutcome::Applied(status))
    }
}
