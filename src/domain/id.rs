use {
    super::error::PaymentError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::str::FromStr,
    uuid::Uuid,
};

/// Internal transaction identifier, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for TransactionId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| PaymentError::Validation(format!("invalid transaction id: {s}")))
    }
}

/// Order reference owned by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::Validation("order id must not be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Paying party, or [`PayerId::GUEST`] for unauthenticated checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayerId(String);

impl PayerId {
    pub const GUEST: &'static str = "guest";

    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::Validation("payer id must not be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn guest() -> Self {
        Self(Self::GUEST.to_string())
    }

    pub fn is_guest(&self) -> bool {
        self.0 == Self::GUEST
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment method; selects the gateway that collects the payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    pub fn new(method: impl Into<String>) -> Result<Self, PaymentError> {
        let method = method.into();
        let well_formed = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !well_formed {
            return Err(PaymentError::Validation(format!(
                "payment method must be lowercase alphanumeric, got: {method}"
            )));
        }
        Ok(Self(method))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway-side identifier for a payment, returned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayReference(String);

impl GatewayReference {
    pub fn new(reference: impl Into<String>) -> Result<Self, PaymentError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(PaymentError::Validation(
                "gateway reference must not be empty".into(),
            ));
        }
        Ok(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
