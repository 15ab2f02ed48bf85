use crate::config::RazorpaySettings;
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{PaymentIntent, PaymentMethod, ProviderOutcome};
use crate::domain::ports::PaymentProvider;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Order style provider.
///
/// Checkout signs a successful payment as
/// `HMAC-SHA256(order_id + "|" + payment_id, key_secret)`; confirmation
/// payloads are accepted only when that signature matches.
pub struct RazorpayLikeProvider {
    key_id: Option<String>,
    key_secret: Option<SecretString>,
    currency: Currency,
}

impl RazorpayLikeProvider {
    pub fn new(settings: &RazorpaySettings) -> Self {
        Self {
            key_id: settings.key_id.clone(),
            key_secret: settings.key_secret.clone(),
            currency: settings.currency.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        self.key_id.as_ref().is_some_and(|id| !id.is_empty())
            && self
                .key_secret
                .as_ref()
                .is_some_and(|secret| !secret.expose_secret().is_empty())
    }

    /// Hex signature for an order/payment pair, `None` without a secret.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Option<String> {
        let secret = self.key_secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentProvider for RazorpayLikeProvider {
    fn currency(&self) -> Currency {
        self.currency.clone()
    }

    async fn create_payment(
        &self,
        amount: Amount,
        currency: &Currency,
        _method: PaymentMethod,
    ) -> ProviderOutcome {
        if !self.is_configured() {
            return ProviderOutcome::Failed {
                error: "razorpay credentials are not configured".to_string(),
            };
        }
        let Some(minor) = amount.minor_units() else {
            return ProviderOutcome::Failed {
                error: format!("amount {} cannot be charged in minor units", amount),
            };
        };

        let order_id = format!("order_{}", &Uuid::new_v4().simple().to_string()[..14]);
        ProviderOutcome::Created(PaymentIntent {
            reference: order_id.clone(),
            client_secret_or_approval_url: None,
            raw: json!({
                "success": true,
                "id": order_id,
                "order_id": order_id,
                "entity": "order",
                "amount": minor,
                "amount_paid": 0,
                "amount_due": minor,
                "currency": currency.code(),
                "status": "created",
                "payment_capture": 1,
            }),
        })
    }

    async fn verify_payment(&self, payload: &Value) -> bool {
        let field = |name: &str| payload.get(name).and_then(Value::as_str);
        let (Some(order_id), Some(payment_id), Some(signature)) = (
            field("razorpay_order_id"),
            field("razorpay_payment_id"),
            field("razorpay_signature"),
        ) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let Some(secret) = self.key_secret.as_ref() else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
            return false;
        };
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn transaction_id(&self, payload: &Value) -> Option<String> {
        payload
            .get("razorpay_payment_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    fn reference(&self, payload: &Value) -> Option<String> {
        payload
            .get("razorpay_order_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}
