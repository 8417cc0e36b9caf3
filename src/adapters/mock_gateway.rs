use {
    crate::domain::{
        error::PaymentError,
        gateway::{GatewayClient, GatewayCreateResult, GatewayPaymentRequest, NextAction},
        id::{GatewayReference, PaymentMethod},
        store::BoxFuture,
    },
    std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    },
    tokio::sync::Mutex,
};

#[derive(Debug, Clone)]
pub enum MockBehavior {
    Accept { reference: String },
    AcceptWithClientSecret { reference: String, secret: String },
    Reject(String),
    Unavailable,
    /// Sleeps before accepting; used to trip the caller's timeout.
    Hang(Duration),
    /// Accepts with `reference` once `delay` has passed.
    AcceptAfter { reference: String, delay: Duration },
}

/// Scripted gateway. Behaviors are consumed in order; once the script is
/// exhausted every call is accepted with a generated reference.
pub struct MockGateway {
    method: PaymentMethod,
    script: Mutex<VecDeque<MockBehavior>>,
    calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_script(method: PaymentMethod, script: impl IntoIterator<Item = MockBehavior>) -> Self {
        Self {
            method,
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn push(&self, behavior: MockBehavior) {
        self.script.lock().await.push_back(behavior);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn create_payment_inner(
        &self,
        request: &GatewayPaymentRequest,
    ) -> Result<GatewayCreateResult, PaymentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = self.script.lock().await.pop_front();

        let (reference, next_action) = match behavior {
            Some(MockBehavior::Reject(reason)) => return Err(PaymentError::GatewayRejected(reason)),
            Some(MockBehavior::Unavailable) => {
                return Err(PaymentError::GatewayUnavailable(
                    "mock gateway unavailable".into(),
                ));
            }
            Some(MockBehavior::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                (format!("mock_{call}"), default_redirect(request))
            }
            Some(MockBehavior::AcceptAfter { reference, delay }) => {
                tokio::time::sleep(delay).await;
                (reference, default_redirect(request))
            }
            Some(MockBehavior::Accept { reference }) => (reference, default_redirect(request)),
            Some(MockBehavior::AcceptWithClientSecret { reference, secret }) => {
                (reference, NextAction::ClientSecret(secret))
            }
            None => (
                format!("mock_{}", request.transaction_id.as_uuid().simple()),
                default_redirect(request),
            ),
        };

        let raw_response = serde_json::json!({
            "id": reference,
            "amount": request.money.amount().minor_units(),
            "currency": request.money.currency().as_str(),
            "next_action": next_action,
        });

        Ok(GatewayCreateResult {
            reference: GatewayReference::new(reference)?,
            next_action,
            raw_response,
        })
    }
}

fn default_redirect(request: &GatewayPaymentRequest) -> NextAction {
    NextAction::Redirect(format!(
        "https://mock-gateway.invalid/pay/{}",
        request.transaction_id
    ))
}

impl GatewayClient for MockGateway {
    fn method(&self) -> &PaymentMethod {
        &self.method
    }

    fn create_payment<'a>(
        &'a self,
        request: &'a GatewayPaymentRequest,
    ) -> BoxFuture<'a, Result<GatewayCreateResult, PaymentError>> {
        Box::pin(self.create_payment_inner(request))
    }
}
