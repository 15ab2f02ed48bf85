use crate::config::{PayPalMode, PayPalSettings};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{PaymentIntent, PaymentMethod, ProviderOutcome};
use crate::domain::ports::PaymentProvider;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use uuid::Uuid;

/// Redirect style provider: the customer approves the payment on the
/// provider's site and comes back with `paymentId` and `PayerID`.
pub struct PayPalLikeProvider {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    mode: PayPalMode,
    currency: Currency,
}

impl PayPalLikeProvider {
    pub fn new(settings: &PayPalSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            mode: settings.mode,
            currency: settings.currency.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        self.client_id.as_ref().is_some_and(|id| !id.is_empty())
            && self
                .client_secret
                .as_ref()
                .is_some_and(|secret| !secret.expose_secret().is_empty())
    }

    fn checkout_host(&self) -> &'static str {
        match self.mode {
            PayPalMode::Sandbox => "https://www.sandbox.paypal.com",
            PayPalMode::Live => "https://www.paypal.com",
        }
    }
}

#[async_trait]
impl PaymentProvider for PayPalLikeProvider {
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
                error: "Failed to create PayPal payment: client credentials are not configured"
                    .to_string(),
            };
        }

        let token = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        let payment_id = format!("PAYID-{}", &token[..24]);
        let approval_url = format!(
            "{}/checkoutnow?token=EC-{}",
            self.checkout_host(),
            &token[..17]
        );
        ProviderOutcome::Created(PaymentIntent {
            reference: payment_id.clone(),
            client_secret_or_approval_url: Some(approval_url.clone()),
            raw: json!({
                "success": true,
                "payment_id": payment_id,
                "intent": "sale",
                "state": "created",
                "transactions": [{
                    "amount": {
                        "total": amount.value().to_string(),
                        "currency": currency.code(),
                    },
                    "description": "CarWash Service Payment",
                }],
                "approval_url": approval_url,
            }),
        })
    }

    async fn verify_payment(&self, payload: &Value) -> bool {
        let payer = payload
            .get("PayerID")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        payer && self.transaction_id(payload).is_some()
    }

    fn transaction_id(&self, payload: &Value) -> Option<String> {
        payload
            .get("paymentId")
            .and_then(Value::as_str)
            .filter(|id| id.starts_with("PAYID-"))
            .map(str::to_string)
    }

    fn reference(&self, payload: &Value) -> Option<String> {
        self.transaction_id(payload)
    }
}
