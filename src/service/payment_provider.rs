// service/payment_provider.rs
//
// Thin client over the external payment gateway. The engine never stores
// gateway credentials alongside bookings, only the opaque intent references
// the gateway hands back. Mutating calls run with a bounded timeout and are
// never retried (a retried charge is a double charge); read-only status
// polls retry once with a short backoff.
use hmac::{Hmac, Mac};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::service::error::ServiceError;

const GATEWAY_TIMEOUT_SECS: u64 = 15;
const STATUS_POLL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct PaymentProviderService {
    api_key: String,
    base_url: String,
    webhook_secret: String,
    client: reqwest::Client,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: config.payment_api_key.clone(),
            base_url: config.payment_base_url.clone(),
            webhook_secret: config.payment_webhook_secret.clone(),
            client,
        }
    }

    /// Create a payment intent for the given amount. Mutating: no retry.
    pub async fn create_payment_intent(
        &self,
        amount: f64,
        currency: &str,
        metadata: serde_json::Value,
    ) -> Result<PaymentIntent, ServiceError> {
        let amount_minor = (amount * 100.0).round() as i64;
        let payload = serde_json::json!({
            "amount": amount_minor,
            "currency": currency.to_lowercase(),
            "metadata": metadata,
        });

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Idempotency-Key", Self::idempotency_key())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Payment(format!("intent creation failed: {}", e)))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Payment(format!("invalid gateway response: {}", e)))?;

        if let Some(message) = body.pointer("/error/message").and_then(|m| m.as_str()) {
            return Err(ServiceError::Payment(message.to_string()));
        }

        Ok(PaymentIntent {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            client_secret: body["client_secret"].as_str().unwrap_or_default().to_string(),
            status: body["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// Confirm an intent on behalf of the client. Mutating: no retry.
    pub async fn confirm(&self, intent_id: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/payment_intents/{}/confirm",
                self.base_url, intent_id
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ServiceError::Payment(format!("intent confirmation failed: {}", e)))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Payment(format!("invalid gateway response: {}", e)))?;

        if let Some(message) = body.pointer("/error/message").and_then(|m| m.as_str()) {
            return Err(ServiceError::Payment(message.to_string()));
        }

        Ok(body["status"].as_str().unwrap_or_default().to_string())
    }

    /// Read-only status poll; safe to retry once on transport errors.
    pub async fn get_intent_status(&self, intent_id: &str) -> Result<String, ServiceError> {
        let url = format!("{}/v1/payment_intents/{}", self.base_url, intent_id);

        let mut last_err = None;
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(STATUS_POLL_BACKOFF_MS)).await;
            }
            match self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .send()
                .await
            {
                Ok(response) => {
                    let body: serde_json::Value = response.json().await.map_err(|e| {
                        ServiceError::Payment(format!("invalid gateway response: {}", e))
                    })?;
                    return Ok(body["status"].as_str().unwrap_or_default().to_string());
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(ServiceError::Payment(format!(
            "status poll failed: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// HMAC-SHA256 webhook signature check with a constant-time comparison.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(signature_hex.trim()) else {
            return false;
        };

        let mut mac = match Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload);
        let computed = mac.finalize().into_bytes();

        computed.ct_eq(expected.as_slice()).into()
    }

    fn idempotency_key() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_secret(secret: &str) -> PaymentProviderService {
        PaymentProviderService {
            api_key: "sk_test_x".to_string(),
            base_url: "https://gateway.invalid".to_string(),
            webhook_secret: secret.to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn webhook_signature_round_trip() {
        let service = service_with_secret("whsec_123");
        let payload = br#"{"event":"payment_intent.succeeded","intent_ref":"pi_1"}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec_123").unwrap();
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(service.verify_webhook_signature(payload, &signature));
        assert!(!service.verify_webhook_signature(b"tampered", &signature));
        assert!(!service.verify_webhook_signature(payload, "deadbeef"));
        assert!(!service.verify_webhook_signature(payload, "not-hex"));
    }

    #[test]
    fn idempotency_keys_are_unique_enough() {
        let a = PaymentProviderService::idempotency_key();
        let b = PaymentProviderService::idempotency_key();
        assert_eq!(a.len(), 24);
        assert_ne!(a, b);
    }
}
