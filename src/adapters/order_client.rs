use {
    crate::domain::{
        error::PaymentError,
        id::{OrderId, TransactionId},
        order::OrderService,
        store::BoxFuture,
        transaction::PaymentOutcome,
    },
    serde::Serialize,
    std::time::Duration,
};

/// Notifies the order service over HTTP:
/// `POST {base}/orders/{order_id}/payment-outcome`.
pub struct HttpOrderService {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeBody {
    transaction_id: TransactionId,
    outcome: PaymentOutcome,
}

impl HttpOrderService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::OrderService(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn notify(
        &self,
        order_id: &OrderId,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> Result<(), PaymentError> {
        let response = self
            .client
            .post(format!(
                "{}/orders/{}/payment-outcome",
                self.base_url,
                order_id.as_str()
            ))
            .json(&OutcomeBody {
                transaction_id,
                outcome,
            })
            .send()
            .await
            .map_err(|e| PaymentError::OrderService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::OrderService(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

impl OrderService for HttpOrderService {
    fn apply_payment_outcome<'a>(
        &'a self,
        order_id: &'a OrderId,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> BoxFuture<'a, Result<(), PaymentError>> {
        Box::pin(self.notify(order_id, transaction_id, outcome))
    }
}

/// Used when no order service URL is configured.
pub struct LogOrderService;

impl OrderService for LogOrderService {
    fn apply_payment_outcome<'a>(
        &'a self,
        order_id: &'a OrderId,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> BoxFuture<'a, Result<(), PaymentError>> {
        Box::pin(async move {
            tracing::info!(%order_id, %transaction_id, %outcome, "payment outcome");
            Ok(())
        })
    }
}
