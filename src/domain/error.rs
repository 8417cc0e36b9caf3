use {
    super::{id::TransactionId, transaction::TransactionStatus},
    std::time::Duration,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("persistence: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("store call exceeded {0:?}")]
    StoreTimeout(Duration),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transaction not found: {0}")]
    NotFound(TransactionId),

    /// Transport-level failure; the gateway may or may not have created the payment.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("gateway rejected payment: {0}")]
    GatewayRejected(String),

    #[error("webhook verification: {0}")]
    Verification(String),

    #[error("no transaction for gateway reference: {0}")]
    UnknownReference(String),

    /// The gateway handed out a reference another transaction already owns.
    #[error("gateway reference already belongs to another transaction: {0}")]
    ReferenceConflict(String),

    #[error("invalid status transition: {from} → {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("order service: {0}")]
    OrderService(String),
}

impl PaymentError {
    /// Stable code returned to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
            Self::StoreTimeout(_) => "store_timeout",
            Self::Serialization(_) => "internal_error",
            Self::NotFound(_) => "not_found",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::GatewayRejected(_) => "gateway_rejected",
            Self::Verification(_) => "verification_failed",
            Self::UnknownReference(_) => "unknown_reference",
            Self::ReferenceConflict(_) => "reference_conflict",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::OrderService(_) => "order_service_error",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::StoreTimeout(_) | Self::GatewayUnavailable(_)
        )
    }
}
