#![allow(dead_code)]

use checkout_pay::AppState;
use checkout_pay::adapters::mock_gateway::{MockBehavior, MockGateway};
use checkout_pay::domain::error::PaymentError;
use checkout_pay::domain::gateway::PayerContact;
use checkout_pay::domain::id::{OrderId, PaymentMethod, TransactionId};
use checkout_pay::domain::order::OrderService;
use checkout_pay::domain::store::{BoxFuture, TransactionStore};
use checkout_pay::domain::transaction::PaymentOutcome;
use checkout_pay::infra::memory::InMemoryTransactionStore;
use checkout_pay::services::gateway_registry::GatewayRegistry;
use checkout_pay::services::orchestrator::{
    CheckoutRequest, OrchestratorSettings, PaymentOrchestrator,
};
use checkout_pay::services::webhook_handler::WebhookHandler;
use checkout_pay::services::webhook_verifier::{WebhookVerifier, signature_header};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const METHOD: &str = "card";

/// Records every outcome it is told about.
#[derive(Default)]
pub struct RecordingOrderService {
    calls: Mutex<Vec<(OrderId, TransactionId, PaymentOutcome)>>,
    fail: bool,
    delay: Duration,
}

impl RecordingOrderService {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Records each outcome only after `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(OrderId, TransactionId, PaymentOutcome)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl OrderService for RecordingOrderService {
    fn apply_payment_outcome<'a>(
        &'a self,
        order_id: &'a OrderId,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> BoxFuture<'a, Result<(), PaymentError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.calls
                .lock()
                .unwrap()
                .push((order_id.clone(), transaction_id, outcome));
            if self.fail {
                return Err(PaymentError::OrderService("order service down".into()));
            }
            Ok(())
        })
    }
}

/// Everything a checkout/webhook test needs, wired over the in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryTransactionStore>,
    pub gateway: Arc<MockGateway>,
    pub orders: Arc<RecordingOrderService>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub webhooks: Arc<WebhookHandler>,
}

pub fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        public_base_url: "https://shop.example".into(),
        gateway_timeout: Duration::from_secs(10),
        store_timeout: Duration::from_secs(5),
        max_creation_retries: 2,
        retry_backoff: Duration::from_millis(500),
    }
}

pub fn method() -> PaymentMethod {
    PaymentMethod::new(METHOD).unwrap()
}

pub fn harness(script: impl IntoIterator<Item = MockBehavior>) -> Harness {
    harness_with(script, RecordingOrderService::default())
}

/// Gateway with no script: every call is accepted with a generated reference.
pub fn idle_harness() -> Harness {
    harness(Vec::<MockBehavior>::new())
}

pub fn harness_with(
    script: impl IntoIterator<Item = MockBehavior>,
    orders: RecordingOrderService,
) -> Harness {
    let store = Arc::new(InMemoryTransactionStore::new());
    let gateway = Arc::new(MockGateway::with_script(method(), script));
    let orders = Arc::new(orders);

    let dyn_store: Arc<dyn TransactionStore> = store.clone();
    let dyn_orders: Arc<dyn OrderService> = orders.clone();

    let orchestrator = PaymentOrchestrator::new(
        dyn_store.clone(),
        GatewayRegistry::new().with(gateway.clone()),
        dyn_orders.clone(),
        settings(),
    );
    let webhooks = WebhookHandler::new(
        dyn_store,
        dyn_orders,
        WebhookVerifier::new(WEBHOOK_SECRET, Duration::from_secs(300)),
        Duration::from_secs(5),
    );

    Harness {
        store,
        gateway,
        orders,
        orchestrator: Arc::new(orchestrator),
        webhooks: Arc::new(webhooks),
    }
}

impl Harness {
    pub fn app_state(&self) -> AppState {
        AppState {
            orchestrator: self.orchestrator.clone(),
            webhooks: self.webhooks.clone(),
        }
    }
}

pub fn accept(reference: &str) -> MockBehavior {
    MockBehavior::Accept {
        reference: reference.to_string(),
    }
}

pub fn checkout_request(order_id: &str, amount_minor_units: i64) -> CheckoutRequest {
    CheckoutRequest {
        order_id: order_id.to_string(),
        payer_id: Some("user_42".into()),
        amount_minor_units,
        currency: "MYR".into(),
        method: METHOD.into(),
        payer: PayerContact {
            name: "Aisha Rahman".into(),
            email: "aisha@example.com".into(),
            phone: None,
        },
        billing_address: None,
        description: None,
    }
}

pub fn event_body(event_id: &str, kind: &str, reference: &str, amount: i64, currency: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "type": kind,
        "data": {"reference": reference, "amount": amount, "currency": currency}
    }))
    .unwrap()
}

pub fn success_event(event_id: &str, reference: &str, amount: i64) -> Vec<u8> {
    event_body(event_id, "payment.succeeded", reference, amount, "MYR")
}

pub fn failure_event(event_id: &str, reference: &str, amount: i64, reason: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "type": "payment.failed",
        "data": {
            "reference": reference,
            "amount": amount,
            "currency": "MYR",
            "failure_reason": reason
        }
    }))
    .unwrap()
}

/// Header value as the gateway would send it right now.
pub fn sign_now(payload: &[u8]) -> String {
    signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload).unwrap()
}
