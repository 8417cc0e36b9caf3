use crate::domain::error::PaymentError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype so the domain error can implement axum's `IntoResponse`.
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PaymentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::Persistence(_)
            | PaymentError::StoreTimeout(_)
            | PaymentError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::GatewayRejected(_) | PaymentError::ReferenceConflict(_) => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::Verification(_) => StatusCode::UNAUTHORIZED,
            PaymentError::NotFound(_) | PaymentError::UnknownReference(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PaymentError::Serialization(_) | PaymentError::OrderService(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            PaymentError::Persistence(err) => {
                tracing::error!("persistence error: {err}");
                "temporarily unavailable, retry later".to_string()
            }
            PaymentError::StoreTimeout(limit) => {
                tracing::error!("store call exceeded {limit:?}");
                "temporarily unavailable, retry later".to_string()
            }
            PaymentError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                "internal error".to_string()
            }
            PaymentError::OrderService(err) => {
                tracing::error!("order service error: {err}");
                "internal error".to_string()
            }
            // Never echo why a signature failed back to the sender.
            PaymentError::Verification(_) => "invalid webhook signature".to_string(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "errorCode": self.0.code(),
            "message": message,
            "retryable": self.0.is_retryable(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionStatus;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        let cases = [
            (PaymentError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (PaymentError::GatewayUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (PaymentError::StoreTimeout(Duration::from_secs(5)), StatusCode::SERVICE_UNAVAILABLE),
            (PaymentError::GatewayRejected("x".into()), StatusCode::BAD_GATEWAY),
            (PaymentError::ReferenceConflict("x".into()), StatusCode::BAD_GATEWAY),
            (PaymentError::Verification("x".into()), StatusCode::UNAUTHORIZED),
            (PaymentError::UnknownReference("x".into()), StatusCode::NOT_FOUND),
            (
                PaymentError::InvalidTransition {
                    from: TransactionStatus::Succeeded,
                    to: TransactionStatus::Cancelled,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn store_timeout_is_retryable() {
        let err = PaymentError::StoreTimeout(Duration::from_secs(5));
        assert_eq!(err.code(), "store_timeout");
        assert!(err.is_retryable());
        assert!(!PaymentError::ReferenceConflict("G1".into()).is_retryable());
    }
}
