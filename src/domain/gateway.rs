use {
    super::error::PaymentError,
    super::id::{GatewayReference, PaymentMethod, TransactionId},
    super::money::Money,
    super::store::BoxFuture,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl PayerContact {
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.name.trim().is_empty() {
            return Err(PaymentError::Validation("payer name is required".into()));
        }
        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(PaymentError::Validation(format!(
                "payer email is invalid: {email}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country: String,
}

impl BillingAddress {
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.line1.trim().is_empty() || self.city.trim().is_empty() {
            return Err(PaymentError::Validation(
                "billing address needs line1 and city".into(),
            ));
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::Validation(format!(
                "billing country must be a 2-letter code, got: {}",
                self.country
            )));
        }
        Ok(())
    }
}

/// What the orchestrator hands a gateway.
#[derive(Debug, Clone)]
pub struct GatewayPaymentRequest {
    pub transaction_id: TransactionId,
    pub money: Money,
    pub payer: PayerContact,
    pub billing_address: Option<BillingAddress>,
    pub description: String,
    /// Browser-facing page after payment.
    pub redirect_url: String,
    /// Server-facing webhook endpoint.
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NextAction {
    Redirect(String),
    ClientSecret(String),
}

#[derive(Debug, Clone)]
pub struct GatewayCreateResult {
    pub reference: GatewayReference,
    pub next_action: NextAction,
    pub raw_response: serde_json::Value,
}

/// One implementation per gateway, selected by the transaction's method.
///
/// Errors are normalized: [`PaymentError::GatewayUnavailable`] when the outcome
/// is unknown (transport failure, timeout, 5xx) and
/// [`PaymentError::GatewayRejected`] for a deterministic refusal.
pub trait GatewayClient: Send + Sync {
    fn method(&self) -> &PaymentMethod;

    fn create_payment<'a>(
        &'a self,
        request: &'a GatewayPaymentRequest,
    ) -> BoxFuture<'a, Result<GatewayCreateResult, PaymentError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: &str) -> PayerContact {
        PayerContact {
            name: "Aminah".into(),
            email: email.into(),
            phone: None,
        }
    }

    #[test]
    fn payer_email_must_look_like_an_address() {
        assert!(contact("aminah@example.my").validate().is_ok());
        assert!(contact("aminah").validate().is_err());
        assert!(contact("@example.my").validate().is_err());
        assert!(contact("aminah@localhost").validate().is_err());
    }

    #[test]
    fn billing_country_is_two_letters() {
        let mut address = BillingAddress {
            line1: "1 Jalan Ampang".into(),
            line2: None,
            city: "Kuala Lumpur".into(),
            state: None,
            postal_code: "50450".into(),
            country: "MY".into(),
        };
        assert!(address.validate().is_ok());
        address.country = "MYS".into();
        assert!(address.validate().is_err());
    }
}
