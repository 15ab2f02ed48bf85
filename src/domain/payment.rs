use super::booking::BookingId;
use super::catalog::entity_id;
use super::money::{Amount, Currency};
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

entity_id!(PaymentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Razorpay,
    PayPal,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Stripe,
        PaymentMethod::Razorpay,
        PaymentMethod::PayPal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::PayPal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s.trim())
            .ok_or_else(|| {
                BookingError::ValidationFailed(format!("unknown payment method '{}'", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully created provider-side payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's id for the intent, order or payment.
    pub reference: String,
    /// Stripe client secret or PayPal approval URL, when the provider has one.
    pub client_secret_or_approval_url: Option<String>,
    pub raw: Value,
}

/// Result of `PaymentProvider::create_payment`. Providers never error across
/// the boundary; failures come back tagged.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Created(PaymentIntent),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Amount,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub provider_reference: Option<String>,
    /// Unique across payments once set.
    pub transaction_id: Option<String>,
    /// Last provider payload, stored verbatim.
    pub payment_response: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        booking_id: BookingId,
        amount: Amount,
        currency: Currency,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            booking_id,
            amount,
            currency,
            payment_method,
            payment_status: PaymentStatus::Pending,
            provider_reference: None,
            transaction_id: None,
            payment_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_intent(&mut self, intent: &PaymentIntent, now: DateTime<Utc>) {
        self.provider_reference = Some(intent.reference.clone());
        self.payment_response = Some(intent.raw.clone());
        self.updated_at = now;
    }

    /// Keeps the payment `pending` so initiation can be retried.
    pub fn record_initiation_failure(&mut self, error: &str, kind: &str, now: DateTime<Utc>) {
        self.payment_response = Some(json!({
            "success": false,
            "kind": kind,
            "error": error,
        }));
        self.updated_at = now;
    }

    /// The intent stored by a previous successful initiation.
    pub fn stored_intent(&self) -> Option<PaymentIntent> {
        let reference = self.provider_reference.clone()?;
        let raw = self.payment_response.clone().unwrap_or(Value::Null);
        let client_secret_or_approval_url = ["client_secret", "approval_url"]
            .into_iter()
            .find_map(|key| raw.get(key).and_then(Value::as_str).map(str::to_string));
        Some(PaymentIntent {
            reference,
            client_secret_or_approval_url,
            raw,
        })
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Completed;
        self.updated_at = now;
    }
}
