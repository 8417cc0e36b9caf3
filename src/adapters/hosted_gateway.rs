use {
    crate::domain::{
        error::PaymentError,
        gateway::{
            BillingAddress, GatewayClient, GatewayCreateResult, GatewayPaymentRequest, NextAction,
        },
        id::{GatewayReference, PaymentMethod},
        store::BoxFuture,
    },
    reqwest::StatusCode,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// REST gateway with a hosted payment page: `POST {base}/v1/payments`,
/// basic auth with the key pair, JSON in both directions.
pub struct HostedCheckoutGateway {
    method: PaymentMethod,
    base_url: String,
    key_id: String,
    key_secret: String,
    /// Decimal places the gateway expects; `None` means ISO 4217.
    amount_exponent: Option<u32>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    reference: String,
    amount: i64,
    currency: &'static str,
    description: &'a str,
    customer: CustomerBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_address: Option<&'a BillingAddress>,
    redirect_url: &'a str,
    callback_url: &'a str,
}

#[derive(Debug, Serialize)]
struct CustomerBody<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    id: String,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl HostedCheckoutGateway {
    pub fn new(
        method: PaymentMethod,
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                PaymentError::GatewayUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            method,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            amount_exponent: None,
            client,
        })
    }

    pub fn with_amount_exponent(mut self, exponent: u32) -> Self {
        self.amount_exponent = Some(exponent);
        self
    }

    async fn create_payment_inner(
        &self,
        request: &GatewayPaymentRequest,
    ) -> Result<GatewayCreateResult, PaymentError> {
        let currency = request.money.currency();
        let amount = currency.convert_minor_units(
            request.money.amount(),
            self.amount_exponent.unwrap_or_else(|| currency.exponent()),
        )?;

        let body = CreatePaymentBody {
            reference: request.transaction_id.to_string(),
            amount,
            currency: currency.as_str(),
            description: &request.description,
            customer: CustomerBody {
                name: &request.payer.name,
                email: &request.payer.email,
                phone: request.payer.phone.as_deref(),
            },
            billing_address: request.billing_address.as_ref(),
            redirect_url: &request.redirect_url,
            callback_url: &request.callback_url,
        };

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Idempotency-Key", request.transaction_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timeout" } else { "transport" };
                PaymentError::GatewayUnavailable(format!("{kind}: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(format!("reading response: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        // The gateway accepted the call; an unreadable body leaves the outcome in doubt.
        let raw: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            PaymentError::GatewayUnavailable(format!("unreadable gateway response: {e}"))
        })?;
        let parsed: CreatePaymentResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            PaymentError::GatewayUnavailable(format!("unexpected gateway response: {e}"))
        })?;

        let next_action = match (parsed.redirect_url, parsed.client_secret) {
            (Some(url), _) => NextAction::Redirect(url),
            (None, Some(secret)) => NextAction::ClientSecret(secret),
            (None, None) => {
                return Err(PaymentError::GatewayUnavailable(
                    "gateway response has neither redirect_url nor client_secret".into(),
                ));
            }
        };

        tracing::info!(
            method = %self.method,
            transaction_id = %request.transaction_id,
            reference = %parsed.id,
            "gateway payment created"
        );

        Ok(GatewayCreateResult {
            reference: GatewayReference::new(parsed.id)?,
            next_action,
            raw_response: raw,
        })
    }
}

/// 408, 429 and 5xx leave the outcome unknown; other failures are refusals.
fn classify_failure(status: StatusCode, body: &str) -> PaymentError {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        return PaymentError::GatewayUnavailable(format!("HTTP {}", status.as_u16()));
    }

    let reason = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorBody {
                code: Some(code),
                message,
            },
        }) => format!("{code}: {message}"),
        Ok(ErrorResponse { error }) => error.message,
        Err(_) => format!("HTTP {}", status.as_u16()),
    };
    PaymentError::GatewayRejected(reason)
}

impl GatewayClient for HostedCheckoutGateway {
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
