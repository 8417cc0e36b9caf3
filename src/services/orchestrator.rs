use {
    super::{gateway_registry::GatewayRegistry, notify_order, store_call},
    crate::domain::{
        error::PaymentError,
        gateway::{
            BillingAddress, GatewayClient, GatewayCreateResult, GatewayPaymentRequest, NextAction,
            PayerContact,
        },
        id::{OrderId, PayerId, PaymentMethod, TransactionId},
        money::{Currency, Money, MoneyAmount},
        order::OrderService,
        store::TransactionStore,
        transaction::{
            NewTransaction, PaymentOutcome, PaymentTransaction, TransactionPatch,
            TransactionStatus,
        },
    },
    serde::{Deserialize, Serialize},
    std::{sync::Arc, time::Duration},
};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub public_base_url: String,
    pub gateway_timeout: Duration,
    pub store_timeout: Duration,
    pub max_creation_retries: u32,
    pub retry_backoff: Duration,
}

impl OrchestratorSettings {
    /// Longest a checkout can take: every gateway attempt with its backoff,
    /// three store calls and the order notification.
    pub fn checkout_budget(&self) -> Duration {
        let attempts = self.max_creation_retries.saturating_add(1);
        let backoff = self
            .retry_backoff
            .saturating_mul(2_u32.saturating_pow(self.max_creation_retries));
        self.gateway_timeout
            .saturating_mul(attempts)
            .saturating_add(backoff)
            .saturating_add(self.store_timeout.saturating_mul(3))
            .saturating_add(self.gateway_timeout)
    }
}

/// Inbound checkout call, as received at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub order_id: String,
    /// Absent for guest checkout.
    #[serde(default)]
    pub payer_id: Option<String>,
    pub amount_minor_units: i64,
    pub currency: String,
    pub method: String,
    pub payer: PayerContact,
    #[serde(default)]
    pub billing_address: Option<BillingAddress>,
    #[serde(default)]
    pub description: Option<String>,
}

struct ValidatedCheckout {
    new: NewTransaction,
    payer: PayerContact,
    billing_address: Option<BillingAddress>,
    description: String,
}

impl CheckoutRequest {
    fn validate(self, gateways: &GatewayRegistry) -> Result<ValidatedCheckout, PaymentError> {
        let order_id = OrderId::new(self.order_id)?;
        let payer_id = match self.payer_id {
            Some(id) => PayerId::new(id)?,
            None => PayerId::guest(),
        };
        let money = Money::new(
            MoneyAmount::new(self.amount_minor_units)?,
            Currency::try_from(self.currency.as_str())?,
        );
        let method = PaymentMethod::new(self.method)?;
        gateways.get(&method)?;
        self.payer.validate()?;
        if let Some(address) = &self.billing_address {
            address.validate()?;
        }

        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Order {order_id}"));

        Ok(ValidatedCheckout {
            new: NewTransaction {
                order_id,
                payer_id,
                money,
                method,
            },
            payer: self.payer,
            billing_address: self.billing_address,
            description,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub transaction_id: TransactionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl CheckoutResponse {
    fn new(transaction_id: TransactionId, next_action: NextAction) -> Self {
        let (redirect_url, client_secret) = match next_action {
            NextAction::Redirect(url) => (Some(url), None),
            NextAction::ClientSecret(secret) => (None, Some(secret)),
        };
        Self {
            transaction_id,
            redirect_url,
            client_secret,
        }
    }
}

pub struct PaymentOrchestrator {
    store: Arc<dyn TransactionStore>,
    gateways: GatewayRegistry,
    orders: Arc<dyn OrderService>,
    settings: OrchestratorSettings,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateways: GatewayRegistry,
        orders: Arc<dyn OrderService>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            gateways,
            orders,
            settings,
        }
    }

    /// Runs one checkout attempt end to end: record, gateway call, initial
    /// status. Every attempt gets a fresh transaction.
    #[tracing::instrument(
        name = "checkout",
        skip_all,
        fields(order_id = %request.order_id, transaction_id = tracing::field::Empty)
    )]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResponse, PaymentError> {
        let checkout = request.validate(&self.gateways)?;
        let gateway = self.gateways.get(&checkout.new.method)?;

        let tx = self.create_pending_payment(checkout.new).await?;
        tracing::Span::current().record("transaction_id", tracing::field::display(tx.id()));

        let gateway_request = GatewayPaymentRequest {
            transaction_id: tx.id(),
            money: *tx.money(),
            payer: checkout.payer,
            billing_address: checkout.billing_address,
            description: checkout.description,
            redirect_url: format!(
                "{}/checkout/complete?transaction_id={}",
                self.settings.public_base_url,
                tx.id()
            ),
            callback_url: format!("{}/webhooks/{}", self.settings.public_base_url, tx.method()),
        };

        match self.create_with_retry(gateway.as_ref(), &gateway_request).await {
            Ok(created) => self.record_acceptance(&tx, created).await,
            Err(e) => {
                let reason = match &e {
                    PaymentError::GatewayUnavailable(msg) => format!(
                        "gateway unavailable after {} attempts: {msg}",
                        self.settings.max_creation_retries + 1
                    ),
                    other => other.to_string(),
                };
                tracing::warn!(error = %e, "gateway creation failed, marking transaction failed");
                self.fail_creation(&tx, reason).await;
                Err(e)
            }
        }
    }

    /// Moves the record to `processing` with the gateway's reference. When a
    /// cancel committed first the status stays, but the reference is still
    /// recorded so the gateway's later webhooks resolve.
    async fn record_acceptance(
        &self,
        tx: &PaymentTransaction,
        created: GatewayCreateResult,
    ) -> Result<CheckoutResponse, PaymentError> {
        let patch =
            TransactionPatch::transition(TransactionStatus::Created, TransactionStatus::Processing)
                .with_reference(created.reference.clone())
                .with_response(created.raw_response.clone())
                .by("checkout");

        match store_call(self.settings.store_timeout, self.store.update(tx.id(), patch)).await {
            Ok(updated) => {
                tracing::info!(
                    reference = %created.reference,
                    money = %updated.money(),
                    "payment processing"
                );
                Ok(CheckoutResponse::new(updated.id(), created.next_action))
            }
            Err(PaymentError::InvalidTransition { from, to }) => {
                tracing::warn!(
                    current = %from,
                    reference = %created.reference,
                    "orphaned gateway payment: transaction already final"
                );
                let annotation = TransactionPatch::annotate(from)
                    .with_reference(created.reference.clone())
                    .with_response(created.raw_response)
                    .by("checkout");
                if let Err(e) =
                    store_call(self.settings.store_timeout, self.store.update(tx.id(), annotation)).await
                {
                    tracing::error!(error = %e, reference = %created.reference, "could not record reference of orphaned gateway payment");
                }
                Err(PaymentError::InvalidTransition { from, to })
            }
            Err(e @ PaymentError::ReferenceConflict(_)) => {
                tracing::error!(reference = %created.reference, "gateway returned a reference owned by another transaction");
                self.fail_creation(tx, e.to_string()).await;
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, reference = %created.reference, "could not record gateway acceptance");
                Err(e)
            }
        }
    }

    /// Allocates the transaction record in `created`. This is the core's side
    /// of the order service's `createPendingPayment`.
    pub async fn create_pending_payment(
        &self,
        new: NewTransaction,
    ) -> Result<PaymentTransaction, PaymentError> {
        let tx = store_call(self.settings.store_timeout, self.store.create(new)).await?;
        tracing::info!(transaction_id = %tx.id(), order_id = %tx.order_id(), money = %tx.money(), "transaction created");
        Ok(tx)
    }

    /// Calls the gateway, retrying in-doubt failures for the same transaction
    /// id with exponential backoff. Rejections are returned immediately.
    async fn create_with_retry(
        &self,
        gateway: &dyn GatewayClient,
        request: &GatewayPaymentRequest,
    ) -> Result<GatewayCreateResult, PaymentError> {
        let mut attempt: u32 = 0;
        loop {
            let result = tokio::time::timeout(
                self.settings.gateway_timeout,
                gateway.create_payment(request),
            )
            .await
            .unwrap_or_else(|_| {
                Err(PaymentError::GatewayUnavailable(format!(
                    "no response within {:?}",
                    self.settings.gateway_timeout
                )))
            });

            match result {
                Err(PaymentError::GatewayUnavailable(msg))
                    if attempt < self.settings.max_creation_retries =>
                {
                    let delay = self
                        .settings
                        .retry_backoff
                        .saturating_mul(2_u32.saturating_pow(attempt));
                    attempt += 1;
                    tracing::warn!(attempt, ?delay, error = %msg, "gateway unavailable, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn fail_creation(&self, tx: &PaymentTransaction, reason: String) {
        let patch = TransactionPatch::transition(TransactionStatus::Created, TransactionStatus::Failed)
            .with_failure_reason(reason)
            .by("checkout");

        match store_call(self.settings.store_timeout, self.store.update(tx.id(), patch)).await {
            Ok(failed) => {
                notify_order(
                    self.orders.clone(),
                    failed,
                    PaymentOutcome::Failed,
                    self.settings.gateway_timeout,
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(transaction_id = %tx.id(), error = %e, "could not mark transaction failed");
            }
        }
    }

    /// Explicit cancellation; honored only while the transaction is not
    /// terminal. Races webhooks through the store's conditional update.
    #[tracing::instrument(name = "cancel", skip(self))]
    pub async fn cancel(&self, id: TransactionId) -> Result<PaymentTransaction, PaymentError> {
        let current = store_call(self.settings.store_timeout, self.store.get(id)).await?;
        let status = current.status();
        if status.is_terminal() {
            return Err(PaymentError::InvalidTransition {
                from: status,
                to: TransactionStatus::Cancelled,
            });
        }

        let patch =
            TransactionPatch::transition(status, TransactionStatus::Cancelled).by("cancel");
        let cancelled = store_call(self.settings.store_timeout, self.store.update(id, patch))
            .await
            .inspect_err(|e| {
                if let PaymentError::InvalidTransition { from, .. } = e {
                    tracing::info!(current = %from, "cancel lost race to a concurrent update");
                }
            })?;

        notify_order(
            self.orders.clone(),
            cancelled.clone(),
            PaymentOutcome::Cancelled,
            self.settings.gateway_timeout,
        )
        .await;
        Ok(cancelled)
    }

    pub async fn transaction(&self, id: TransactionId) -> Result<PaymentTransaction, PaymentError> {
        store_call(self.settings.store_timeout, self.store.get(id)).await
    }
}
