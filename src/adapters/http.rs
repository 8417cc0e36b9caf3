use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::PaymentError,
            id::{PaymentMethod, TransactionId},
            transaction::{PaymentTransaction, TransactionStatus},
        },
        services::{
            orchestrator::{CheckoutRequest, CheckoutResponse},
            webhook_verifier::SIGNATURE_HEADER,
        },
    },
    axum::{
        Json, Router,
        body::Bytes,
        extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::time::Duration,
    tower_http::timeout::TimeoutLayer,
};

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/checkout", post(checkout_handler))
        .route("/webhooks/{method}", post(webhook_handler))
        .route("/transactions/{id}", get(transaction_handler))
        .route("/transactions/{id}/cancel", post(cancel_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

#[derive(Serialize)]
pub struct CheckoutBody {
    success: bool,
    #[serde(flatten)]
    response: CheckoutResponse,
}

pub async fn checkout_handler(
    State(state): State<AppState>,
    request: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutBody>, ApiError> {
    let Json(request) = request.map_err(|e| PaymentError::Validation(e.body_text()))?;
    let response = state.orchestrator.checkout(request).await?;
    Ok(Json(CheckoutBody {
        success: true,
        response,
    }))
}

/// Acknowledges with 200 only after the store write has committed.
pub async fn webhook_handler(
    State(state): State<AppState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let method = PaymentMethod::new(method)?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.webhooks.handle(&method, &body, signature).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"status": outcome.as_str()})),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    id: TransactionId,
    order_id: String,
    payer_id: String,
    amount_minor_units: i64,
    currency: &'static str,
    method: String,
    status: TransactionStatus,
    gateway_reference: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentTransaction> for TransactionView {
    fn from(tx: PaymentTransaction) -> Self {
        Self {
            id: tx.id(),
            order_id: tx.order_id().to_string(),
            payer_id: tx.payer_id().to_string(),
            amount_minor_units: tx.money().amount().minor_units(),
            currency: tx.money().currency().as_str(),
            method: tx.method().to_string(),
            status: tx.status(),
            gateway_reference: tx.gateway_reference().map(|r| r.to_string()),
            failure_reason: tx.failure_reason().map(str::to_string),
            created_at: tx.created_at(),
            updated_at: tx.updated_at(),
        }
    }
}

pub async fn transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionView>, ApiError> {
    let id: TransactionId = id.parse()?;
    let tx = state.orchestrator.transaction(id).await?;
    Ok(Json(tx.into()))
}

pub async fn cancel_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionView>, ApiError> {
    let id: TransactionId = id.parse()?;
    let tx = state.orchestrator.cancel(id).await?;
    Ok(Json(tx.into()))
}
