use {
    super::error::PaymentError,
    super::id::GatewayReference,
    super::money::{Currency, Money, MoneyAmount},
    serde::Deserialize,
};

/// Gateway callback body. Unknown event types fail to parse and are treated as
/// verification failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    #[serde(rename = "payment.succeeded")]
    PaymentSucceeded { id: String, data: GatewayEventData },

    #[serde(rename = "payment.failed")]
    PaymentFailed { id: String, data: GatewayEventData },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedResult {
    Succeeded,
    Failed,
}

/// An event whose signature and freshness have been checked.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub event_id: String,
    pub reference: GatewayReference,
    pub result: ReportedResult,
    pub money: Money,
    pub failure_reason: Option<String>,
    pub raw: serde_json::Value,
}

impl VerifiedEvent {
    pub fn from_gateway_event(
        event: GatewayEvent,
        raw: serde_json::Value,
    ) -> Result<Self, PaymentError> {
        let (event_id, data, result) = match event {
            GatewayEvent::PaymentSucceeded { id, data } => (id, data, ReportedResult::Succeeded),
            GatewayEvent::PaymentFailed { id, data } => (id, data, ReportedResult::Failed),
        };
        let money = Money::new(
            MoneyAmount::new(data.amount)?,
            Currency::try_from(data.currency.as_str())?,
        );
        Ok(Self {
            event_id,
            reference: GatewayReference::new(data.reference)?,
            result,
            money,
            failure_reason: data.failure_reason,
            raw,
        })
    }
}

/// What the webhook handler did with a verified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Won the conditional update; the status moved to the given value.
    Applied(super::transaction::TransactionStatus),
    /// Transaction was already terminal; acknowledged without side effects.
    AlreadyFinal,
    /// Lost a race against a concurrent writer.
    Stale,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::AlreadyFinal => "already_final",
            Self::Stale => "stale",
        }
    }
}
