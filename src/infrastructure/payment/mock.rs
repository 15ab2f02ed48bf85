use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{PaymentIntent, PaymentMethod, ProviderOutcome};
use crate::domain::ports::PaymentProvider;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process provider for environments without live credentials.
///
/// Always succeeds and hands out sequential references
/// (`mock_<method>_<n>`), so runs are reproducible. Confirmation payloads are
/// accepted when they carry a non-empty `transaction_id`; the intent they
/// settle is named by `reference`.
#[derive(Debug)]
pub struct MockProvider {
    currency: Currency,
    issued: AtomicU64,
}

impl MockProvider {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            issued: AtomicU64::new(0),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Currency::usd())
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    fn currency(&self) -> Currency {
        self.currency.clone()
    }

    async fn create_payment(
        &self,
        amount: Amount,
        currency: &Currency,
        method: PaymentMethod,
    ) -> ProviderOutcome {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("mock_{}_{:06}", method, n);
        let client_secret = format!("{}_secret", reference);
        ProviderOutcome::Created(PaymentIntent {
            reference: reference.clone(),
            client_secret_or_approval_url: Some(client_secret.clone()),
            raw: json!({
                "success": true,
                "id": reference,
                "client_secret": client_secret,
                "amount": amount.value().to_string(),
                "currency": currency.code(),
                "method": method.as_str(),
            }),
        })
    }

    async fn verify_payment(&self, payload: &Value) -> bool {
        self.transaction_id(payload).is_some()
    }

    fn transaction_id(&self, payload: &Value) -> Option<String> {
        payload
            .get("transaction_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    fn reference(&self, payload: &Value) -> Option<String> {
        payload
            .get("reference")
            .and_then(Value::as_str)
            .filter(|reference| !reference.is_empty())
            .map(str::to_string)
    }
}
