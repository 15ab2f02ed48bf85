use crate::config::StripeSettings;
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{PaymentIntent, PaymentMethod, ProviderOutcome};
use crate::domain::ports::PaymentProvider;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use uuid::Uuid;

/// Payment-intent style provider.
///
/// Intents are created in minor units and start out waiting for a payment
/// method; a confirmation payload is accepted once it reports the intent as
/// `succeeded`.
pub struct StripeLikeProvider {
    secret_key: Option<SecretString>,
    currency: Currency,
}

impl StripeLikeProvider {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            secret_key: settings.secret_key.clone(),
            currency: settings.currency.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        self.secret_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }
}

#[async_trait]
impl PaymentProvider for StripeLikeProvider {
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
                error: "stripe secret key is not configured".to_string(),
            };
        }
        let Some(minor) = amount.minor_units() else {
            return ProviderOutcome::Failed {
                error: format!("amount {} cannot be charged in minor units", amount),
            };
        };

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{}_secret_{}", id, Uuid::new_v4().simple());
        ProviderOutcome::Created(PaymentIntent {
            reference: id.clone(),
            client_secret_or_approval_url: Some(client_secret.clone()),
            raw: json!({
                "success": true,
                "id": id,
                "object": "payment_intent",
                "amount": minor,
                "currency": currency.code().to_ascii_lowercase(),
                "status": "requires_payment_method",
                "confirmation_method": "manual",
                "client_secret": client_secret,
            }),
        })
    }

    async fn verify_payment(&self, payload: &Value) -> bool {
        self.transaction_id(payload).is_some()
            && payload.get("status").and_then(Value::as_str) == Some("succeeded")
    }

    fn transaction_id(&self, payload: &Value) -> Option<String> {
        payload
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| id.starts_with("pi_"))
            .map(str::to_string)
    }

    /// The intent id settles itself.
    fn reference(&self, payload: &Value) -> Option<String> {
        self.transaction_id(payload)
    }
}
