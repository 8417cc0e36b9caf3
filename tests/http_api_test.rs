mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use checkout_pay::adapters::http::router;
use checkout_pay::adapters::mock_gateway::MockBehavior;
use checkout_pay::domain::transaction::PaymentOutcome;
use checkout_pay::services::webhook_verifier::SIGNATURE_HEADER;
use common::*;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    router(h.app_state(), Duration::from_secs(30))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn checkout_body(order_id: &str, amount: i64) -> Value {
    json!({
        "orderId": order_id,
        "payerId": "user_42",
        "amountMinorUnits": amount,
        "currency": "MYR",
        "method": METHOD,
        "payer": {"name": "Aisha Rahman", "email": "aisha@example.com"}
    })
}

fn webhook_request(payload: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post(format!("/webhooks/{METHOD}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

#[tokio::test]
async fn health() {
    let h = idle_harness();
    let response = app(&h)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn checkout_webhook_and_lookup() {
    let h = harness([accept("G1")]);

    let (status, body) = send(app(&h), post_json("/checkout", &checkout_body("O1", 4999))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["redirectUrl"].is_string());
    let id = body["transactionId"].as_str().unwrap().to_string();

    let (status, body) = send(
        app(&h),
        Request::get(format!("/transactions/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["gatewayReference"], "G1");
    assert_eq!(body["amountMinorUnits"], 4999);
    assert_eq!(body["currency"], "MYR");

    let payload = success_event("evt_1", "G1", 4999);
    let signature = sign_now(&payload);
    let (status, body) = send(app(&h), webhook_request(payload, Some(signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");

    let (_, body) = send(
        app(&h),
        Request::get(format!("/transactions/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["status"], "succeeded");
    assert_eq!(h.orders.count(), 1);
}

#[tokio::test]
async fn invalid_checkout_is_unprocessable() {
    let h = idle_harness();

    let (status, body) = send(app(&h), post_json("/checkout", &checkout_body("O2", 0))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "validation_error");
    assert_eq!(body["retryable"], false);

    let (status, body) = send(app(&h), post_json("/checkout", &json!({"orderId": "O2"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errorCode"], "validation_error");

    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn rejected_gateway_is_bad_gateway() {
    let h = harness([MockBehavior::Reject("card_declined".into())]);

    let (status, body) = send(app(&h), post_json("/checkout", &checkout_body("O3", 4999))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["errorCode"], "gateway_rejected");
    assert_eq!(body["retryable"], false);
}

// The order service takes 8s but the request is cut off at 2s. The failure
// must still reach the order service.
#[tokio::test(start_paused = true)]
async fn order_notification_outlives_request_timeout() {
    let h = harness_with(
        [MockBehavior::Reject("card_declined".into())],
        RecordingOrderService::slow(Duration::from_secs(8)),
    );
    let app = router(h.app_state(), Duration::from_secs(2));

    let (status, _) = send(app, post_json("/checkout", &checkout_body("O8", 4999))).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(h.orders.count(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let calls = h.orders.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_str(), "O8");
    assert_eq!(calls[0].2, PaymentOutcome::Failed);
}

#[tokio::test]
async fn forged_webhook_is_unauthorized() {
    let h = harness([accept("G4")]);
    send(app(&h), post_json("/checkout", &checkout_body("O4", 4999))).await;

    let payload = success_event("evt_4", "G4", 4999);
    let (status, body) =
        send(app(&h), webhook_request(payload.clone(), Some("t=1,v1=deadbeef".into()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "verification_failed");

    let (status, _) = send(app(&h), webhook_request(payload, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.orders.count(), 0);
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_not_found() {
    let h = idle_harness();
    let payload = success_event("evt_5", "G_missing", 4999);
    let signature = sign_now(&payload);

    let (status, body) = send(app(&h), webhook_request(payload, Some(signature))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "unknown_reference");
}

#[tokio::test]
async fn cancel_endpoint() {
    let h = harness([accept("G6")]);
    let (_, body) = send(app(&h), post_json("/checkout", &checkout_body("O6", 4999))).await;
    let id = body["transactionId"].as_str().unwrap().to_string();

    let cancel = || {
        Request::post(format!("/transactions/{id}/cancel"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(app(&h), cancel()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send(app(&h), cancel()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errorCode"], "invalid_transition");
}

#[tokio::test]
async fn unknown_or_malformed_transaction_ids() {
    let h = idle_harness();

    let (status, _) = send(
        app(&h),
        Request::get(format!("/transactions/{}", uuid::Uuid::now_v7()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&h),
        Request::get("/transactions/not-a-uuid").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
