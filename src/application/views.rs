//! Fixed result shapes handed back to the routing layer.

use crate::domain::booking::{BookingId, BookingStatus};
use crate::domain::catalog::{ServiceSummary, UserSummary, VehicleSummary};
use crate::domain::money::{Amount, Currency, Price};
use crate::domain::payment::{PaymentId, PaymentIntent, PaymentMethod, PaymentStatus};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingResult {
    pub booking_id: BookingId,
    pub payment_id: PaymentId,
    pub status: BookingStatus,
    pub total_amount: Price,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub intent: PaymentIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    pub id: BookingId,
    pub customer: UserSummary,
    pub service: ServiceSummary,
    pub vehicle: VehicleSummary,
    pub date: NaiveDate,
    pub time_from: NaiveTime,
    pub time_to: NaiveTime,
    pub duration: u32,
    pub total_amount: Price,
    pub status: BookingStatus,
    /// `None` when the booking has no payment.
    pub payment_status: Option<PaymentStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentDetail {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub amount: Amount,
    pub currency: Currency,
    pub provider_reference: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub summary: BookingSummary,
    pub payment: Option<PaymentDetail>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub booking_id: BookingId,
    pub old_status: BookingStatus,
    pub new_status: BookingStatus,
    pub payment_status: Option<PaymentStatus>,
    pub service: ServiceSummary,
    pub vehicle: VehicleSummary,
    pub customer: UserSummary,
    pub updated_by: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelAck {
    pub booking_id: BookingId,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentConfirmation {
    pub booking_id: BookingId,
    pub verified: bool,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
}
