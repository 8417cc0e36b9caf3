use {
    crate::domain::{
        error::PaymentError,
        id::PaymentMethod,
        store::TransactionStore,
        transaction::PaymentTransaction,
        webhook::{GatewayEvent, VerifiedEvent},
    },
    chrono::{DateTime, Utc},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::time::Duration,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Checks that a callback was signed with the shared secret and is recent.
///
/// Header format: `t=<unix seconds>,v1=<hex hmac-sha256 of "<t>.<body>">`.
/// Several `v1` entries may be present while a secret is being rotated.
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    PaymentError::Verification(format!("invalid timestamp: {value}"))
                })?);
            }
            "v1" => {
                // Undecodable entries can never match; skip them.
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::Verification("signature has no timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::Verification("signature has no v1 entry".into()));
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Verification(format!("unusable secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex signature over `payload` as the gateway computes it.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Full header value for `payload`.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    Ok(format!("t={timestamp},v1={}", sign(secret, timestamp, payload)?))
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Verifies signature and freshness, then parses the body. Nothing in the
    /// body is looked at before the signature matches.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedEvent, PaymentError> {
        let header = parse_header(signature_header)?;

        let age = now.timestamp().abs_diff(header.timestamp);
        if age > self.tolerance.as_secs() {
            return Err(PaymentError::Verification(format!(
                "timestamp {} outside tolerance of {}s",
                header.timestamp,
                self.tolerance.as_secs()
            )));
        }

        let matched = header.signatures.iter().any(|candidate| {
            mac_for(&self.secret, header.timestamp, payload)
                .map(|mac| mac.verify_slice(candidate).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            return Err(PaymentError::Verification("signature mismatch".into()));
        }

        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::Verification(format!("malformed payload: {e}")))?;
        let event: GatewayEvent = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::Verification(format!("unrecognised event: {e}")))?;
        VerifiedEvent::from_gateway_event(event, raw)
            .map_err(|e| PaymentError::Verification(format!("invalid event data: {e}")))
    }

    /// Maps the event's gateway reference to a stored transaction.
    pub async fn resolve(
        &self,
        store: &dyn TransactionStore,
        method: &PaymentMethod,
        event: &VerifiedEvent,
    ) -> Result<PaymentTransaction, PaymentError> {
        store
            .find_by_gateway_reference(method, &event.reference)
            .await?
            .ok_or_else(|| PaymentError::UnknownReference(event.reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::ReportedResult;

    const SECRET: &str = "whsec_test";

    fn body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment.succeeded",
            "data": {"reference": "G1", "amount": 4999, "currency": "MYR"}
        }))
        .unwrap()
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET, Duration::from_secs(300))
    }

    #[test]
    fn accepts_valid_signature() {
        let now = Utc::now();
        let payload = body();
        let header = signature_header(SECRET, now.timestamp(), &payload).unwrap();

        let event = verifier().verify(&payload, &header, now).unwrap();
        assert_eq!(event.event_id, "evt_1");
        assert_eq!(event.reference.as_str(), "G1");
        assert_eq!(event.result, ReportedResult::Succeeded);
        assert_eq!(event.money.amount().minor_units(), 4999);
    }

    #[test]
    fn rejects_tampered_body() {
        let now = Utc::now();
        let payload = body();
        let header = signature_header(SECRET, now.timestamp(), &payload).unwrap();
        let tampered = String::from_utf8(payload).unwrap().replace("4999", "1");

        let err = verifier().verify(tampered.as_bytes(), &header, now).unwrap_err();
        assert!(matches!(err, PaymentError::Verification(_)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let payload = body();
        let header = signature_header("other", now.timestamp(), &payload).unwrap();
        assert!(verifier().verify(&payload, &header, now).is_err());
    }

    #[test]
    fn rejects_replayed_timestamp() {
        let now = Utc::now();
        let payload = body();
        let old = now.timestamp() - 301;
        let header = signature_header(SECRET, old, &payload).unwrap();
        assert!(verifier().verify(&payload, &header, now).is_err());
    }

    #[test]
    fn accepts_any_matching_entry_during_rotation() {
        let now = Utc::now();
        let payload = body();
        let good = sign(SECRET, now.timestamp(), &payload).unwrap();
        let stale = sign("previous", now.timestamp(), &payload).unwrap();
        let header = format!("t={},v1={stale},v1={good}", now.timestamp());
        assert!(verifier().verify(&payload, &header, now).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let now = Utc::now();
        let payload = body();
        let missing_signature = format!("t={}", now.timestamp());
        for header in ["", "v1=abcd", "t=abc,v1=abcd", missing_signature.as_str()] {
            assert!(verifier().verify(&payload, header, now).is_err(), "{header}");
        }
    }

    #[test]
    fn signed_but_unknown_event_type_is_rejected() {
        let now = Utc::now();
        let payload = br#"{"id":"evt_2","type":"payment.refunded","data":{}}"#;
        let header = signature_header(SECRET, now.timestamp(), payload).unwrap();
        assert!(matches!(
            verifier().verify(payload, &header, now),
            Err(PaymentError::Verification(_))
        ));
    }
}
