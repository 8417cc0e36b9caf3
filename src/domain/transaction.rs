use {
    super::audit::AuditEntry,
    super::error::PaymentError,
    super::id::{GatewayReference, OrderId, PayerId, PaymentMethod, TransactionId},
    super::money::Money,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Created,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 5] = [
        Self::Created,
        Self::Processing,
        Self::Succeeded,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: &TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Created, Processing)
                | (Created, Failed)
                | (Created, Cancelled)
                | (Processing, Succeeded)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PaymentError::Validation(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// Final result reported to the order service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl PaymentOutcome {
    pub fn from_status(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::Succeeded => Some(Self::Succeeded),
            TransactionStatus::Failed => Some(Self::Failed),
            TransactionStatus::Cancelled => Some(Self::Cancelled),
            TransactionStatus::Created | TransactionStatus::Processing => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payment attempt for one order. Never deleted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentTransaction {
    pub(crate) id: TransactionId,
    pub(crate) order_id: OrderId,
    pub(crate) payer_id: PayerId,
    pub(crate) money: Money,
    pub(crate) method: PaymentMethod,
    pub(crate) status: TransactionStatus,
    pub(crate) gateway_reference: Option<GatewayReference>,
    pub(crate) gateway_response: Option<serde_json::Value>,
    pub(crate) failure_reason: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn payer_id(&self) -> &PayerId {
        &self.payer_id
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn method(&self) -> &PaymentMethod {
        &self.method
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn gateway_reference(&self) -> Option<&GatewayReference> {
        self.gateway_reference.as_ref()
    }

    pub fn gateway_response(&self) -> Option<&serde_json::Value> {
        self.gateway_response.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Compare-and-swap against the in-memory copy. Leaves `self` untouched
    /// on error.
    pub fn apply(&mut self, patch: &TransactionPatch, now: DateTime<Utc>) -> Result<(), PaymentError> {
        if self.status != patch.expected {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to: patch.status,
            });
        }
        patch.validate()?;

        self.status = patch.status;
        if let Some(reference) = &patch.gateway_reference {
            self.gateway_reference = Some(reference.clone());
        }
        if let Some(response) = &patch.gateway_response {
            self.gateway_response = Some(response.clone());
        }
        if let Some(reason) = &patch.failure_reason {
            self.failure_reason = Some(reason.clone());
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Input for `TransactionStore::create`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_id: OrderId,
    pub payer_id: PayerId,
    pub money: Money,
    pub method: PaymentMethod,
}

impl NewTransaction {
    pub fn into_transaction(self, id: TransactionId, now: DateTime<Utc>) -> PaymentTransaction {
        PaymentTransaction {
            id,
            order_id: self.order_id,
            payer_id: self.payer_id,
            money: self.money,
            method: self.method,
            status: TransactionStatus::Created,
            gateway_reference: None,
            gateway_response: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Conditional partial update: applied only while the stored status equals
/// `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPatch {
    pub expected: TransactionStatus,
    pub status: TransactionStatus,
    pub gateway_reference: Option<GatewayReference>,
    pub gateway_response: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    pub actor: String,
    /// Records gateway fields without moving the status. Allowed on terminal
    /// rows too.
    pub annotation: bool,
}

impl TransactionPatch {
    pub fn transition(expected: TransactionStatus, status: TransactionStatus) -> Self {
        Self {
            expected,
            status,
            gateway_reference: None,
            gateway_response: None,
            failure_reason: None,
            actor: "system".to_string(),
            annotation: false,
        }
    }

    /// Attaches gateway fields to a row whose status is still `current`.
    pub fn annotate(current: TransactionStatus) -> Self {
        Self {
            annotation: true,
            ..Self::transition(current, current)
        }
    }

    pub fn with_reference(mut self, reference: GatewayReference) -> Self {
        self.gateway_reference = Some(reference);
        self
    }

    pub fn with_response(mut self, response: serde_json::Value) -> Self {
        self.gateway_response = Some(response);
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.annotation {
            if self.expected != self.status || self.failure_reason.is_some() {
                return Err(PaymentError::Validation(
                    "an annotation may only record gateway fields".into(),
                ));
            }
            return Ok(());
        }
        if !self.expected.can_transition_to(&self.status) {
            return Err(PaymentError::InvalidTransition {
                from: self.expected,
                to: self.status,
            });
        }
        Ok(())
    }

    pub fn audit_entry(&self, transaction_id: TransactionId, now: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            transaction_id,
            action: if self.annotation {
                "reference_recorded"
            } else {
                "status_changed"
            }
            .to_string(),
            from_status: Some(self.expected),
            to_status: self.status,
            actor: self.actor.clone(),
            detail: serde_json::json!({
                "gateway_reference": self.gateway_reference.as_ref().map(|r| r.as_str()),
                "failure_reason": self.failure_reason,
            }),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, MoneyAmount};

    fn sample() -> PaymentTransaction {
        NewTransaction {
            order_id: OrderId::new("O1").unwrap(),
            payer_id: PayerId::guest(),
            money: Money::new(MoneyAmount::new(4999).unwrap(), Currency::Myr),
            method: PaymentMethod::new("hosted").unwrap(),
        }
        .into_transaction(TransactionId::generate(), Utc::now())
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for from in TransactionStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in TransactionStatus::ALL {
                assert!(!from.can_transition_to(&to), "{from} → {to}");
            }
        }
    }

    #[test]
    fn apply_sets_reference_and_status() {
        let mut tx = sample();
        let patch = TransactionPatch::transition(TransactionStatus::Created, TransactionStatus::Processing)
            .with_reference(GatewayReference::new("G1").unwrap())
            .with_response(serde_json::json!({"id": "G1"}));

        tx.apply(&patch, Utc::now()).unwrap();
        assert_eq!(tx.status(), TransactionStatus::Processing);
        assert_eq!(tx.gateway_reference().unwrap().as_str(), "G1");
    }

    #[test]
    fn apply_rejects_stale_precondition_without_mutation() {
        let mut tx = sample();
        let before = tx.clone();
        let patch = TransactionPatch::transition(TransactionStatus::Processing, TransactionStatus::Succeeded);

        let err = tx.apply(&patch, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InvalidTransition {
                from: TransactionStatus::Created,
                to: TransactionStatus::Succeeded
            }
        ));
        assert_eq!(tx, before);
    }

    #[test]
    fn apply_rejects_illegal_edge_even_when_precondition_matches() {
        let mut tx = sample();
        let patch = TransactionPatch::transition(TransactionStatus::Created, TransactionStatus::Succeeded);
        assert!(tx.apply(&patch, Utc::now()).is_err());
        assert_eq!(tx.status(), TransactionStatus::Created);
    }

    #[test]
    fn annotation_records_reference_on_terminal_row() {
        let mut tx = sample();
        tx.apply(
            &TransactionPatch::transition(TransactionStatus::Created, TransactionStatus::Cancelled),
            Utc::now(),
        )
        .unwrap();

        let patch = TransactionPatch::annotate(TransactionStatus::Cancelled)
            .with_reference(GatewayReference::new("G9").unwrap())
            .with_response(serde_json::json!({"id": "G9"}));
        tx.apply(&patch, Utc::now()).unwrap();
        assert_eq!(tx.status(), TransactionStatus::Cancelled);
        assert_eq!(tx.gateway_reference().unwrap().as_str(), "G9");
        assert_eq!(patch.audit_entry(tx.id(), Utc::now()).action, "reference_recorded");

        let stale = TransactionPatch::annotate(TransactionStatus::Processing);
        assert!(matches!(
            tx.apply(&stale, Utc::now()),
            Err(PaymentError::InvalidTransition { .. })
        ));
        let with_reason =
            TransactionPatch::annotate(TransactionStatus::Cancelled).with_failure_reason("x");
        assert!(matches!(
            tx.apply(&with_reason, Utc::now()),
            Err(PaymentError::Validation(_))
        ));
    }
}
