use super::ledger::{BookingGuard, BookingLedger};
use super::providers::ProviderRegistry;
use super::views::{
    BookingDetail, BookingResult, BookingSummary, CancelAck, PaymentConfirmation, PaymentDetail,
    TransitionOutcome,
};
use crate::domain::booking::{Booking, BookingId, BookingRecord, BookingStatus};
use crate::domain::catalog::{Service, ServiceId, User, Vehicle, VehicleId};
use crate::domain::identity::{ADMIN_ONLY, Identity, Role, STAFF_OR_ADMIN, UserId};
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentIntent, PaymentMethod, PaymentStatus, ProviderOutcome};
use crate::domain::ports::{CatalogStoreBox, PaymentProviderRef};
use crate::error::{BookingError, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// A booking request as received from the routing layer.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_id: ServiceId,
    pub vehicle_id: VehicleId,
    pub date: NaiveDate,
    pub time_from: NaiveTime,
    pub time_to: NaiveTime,
    /// Falls back to [`BookingSettings::default_method`].
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Copy)]
pub struct BookingSettings {
    /// Upper bound on any single provider call.
    pub provider_timeout: Duration,
    pub default_method: PaymentMethod,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            default_method: PaymentMethod::Stripe,
        }
    }
}

/// Use cases of the booking core.
///
/// Domain records are committed before the payment provider is contacted.
/// A provider failure leaves the booking and its pending payment in place and
/// is reported with the booking id, so initiation can be retried with
/// [`BookingService::retry_payment`] instead of booking again.
pub struct BookingService {
    ledger: BookingLedger,
    catalog: CatalogStoreBox,
    providers: ProviderRegistry,
    settings: BookingSettings,
}

impl BookingService {
    pub fn new(
        ledger: BookingLedger,
        catalog: CatalogStoreBox,
        providers: ProviderRegistry,
        settings: BookingSettings,
    ) -> Self {
        Self {
            ledger,
            catalog,
            providers,
            settings,
        }
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &CatalogStoreBox {
        &self.catalog
    }

    pub async fn create_booking(
        &self,
        caller: &Identity,
        request: NewBooking,
    ) -> Result<BookingResult> {
        let service = self.service(request.service_id).await?;
        let vehicle = self.vehicle(request.vehicle_id).await?;

        if !caller.is_owner_of(vehicle.user_id) {
            return Err(BookingError::Forbidden(
                "vehicle does not belong to the caller".to_string(),
            ));
        }
        if request.time_from >= request.time_to {
            return Err(BookingError::ValidationFailed(
                "time_from must be before time_to".to_string(),
            ));
        }
        if vehicle.vehicle_type != service.vehicle_type {
            return Err(BookingError::ValidationFailed(format!(
                "service '{}' is for {} vehicles, not {}",
                service.name, service.vehicle_type, vehicle.vehicle_type
            )));
        }
        let amount = Amount::try_from(service.price)?;
        let method = request
            .payment_method
            .unwrap_or(self.settings.default_method);
        let provider = self.providers.get(method)?;

        let now = Utc::now();
        let booking = Booking {
            id: BookingId::new(),
            user_id: caller.user_id,
            service_id: service.id,
            vehicle_id: vehicle.id,
            date: request.date,
            time_from: request.time_from,
            time_to: request.time_to,
            duration: service.duration,
            total_amount: service.price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment::pending(booking.id, amount, provider.currency(), method, now);
        let record = BookingRecord {
            booking,
            payment: Some(payment),
        };
        let id = record.id();

        let guard = self.ledger.lock(id).await;
        self.ledger.open(record.clone()).await?;
        info!(booking = %id, user = %caller.user_id, %amount, %method, "booking created");

        let (record, intent) = self.initiate(&guard, record, &provider).await?;
        result_for(&record, intent)
    }

    /// Re-runs provider initiation for an existing booking.
    ///
    /// Returns the stored intent without contacting the provider when an
    /// earlier attempt already succeeded.
    pub async fn retry_payment(&self, caller: &Identity, id: BookingId) -> Result<BookingResult> {
        let guard = self.ledger.lock(id).await;
        let mut record = self.ledger.get(id).await?;
        ensure_owner_or_admin(caller, &record)?;

        if record.booking.status.is_terminal() {
            return Err(BookingError::ValidationFailed(format!(
                "booking is {}; payment can no longer be initiated",
                record.booking.status
            )));
        }
        let payment = payment_of(&mut record)?;
        match payment.payment_status {
            PaymentStatus::Pending => {
                if let Some(intent) = payment.stored_intent() {
                    return result_for(&record, intent);
                }
            }
            PaymentStatus::Failed => {
                payment.payment_status = PaymentStatus::Pending;
                payment.provider_reference = None;
            }
            PaymentStatus::Completed | PaymentStatus::Refunded => {
                return Err(BookingError::ValidationFailed(format!(
                    "payment is already {}",
                    payment.payment_status
                )));
            }
        }

        let provider = self.providers.get(payment.payment_method)?;
        info!(booking = %id, "retrying payment initiation");
        let (record, intent) = self.initiate(&guard, record, &provider).await?;
        result_for(&record, intent)
    }

    /// Handles a provider confirmation callback for a booking's payment.
    pub async fn confirm_payment(
        &self,
        caller: &Identity,
        id: BookingId,
        payload: Value,
    ) -> Result<PaymentConfirmation> {
        let guard = self.ledger.lock(id).await;
        let mut record = self.ledger.get(id).await?;
        ensure_owner_or_admin(caller, &record)?;
        if record.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::ValidationFailed(
                "booking is cancelled; payment can no longer be confirmed".to_string(),
            ));
        }

        let payment = payment_of(&mut record)?;
        let provider = self.providers.get(payment.payment_method)?;
        let settles = provider.reference(&payload);
        if settles.is_none() || settles != payment.provider_reference {
            return Err(BookingError::ValidationFailed(
                "confirmation payload does not match this payment".to_string(),
            ));
        }
        let claimed = provider.transaction_id(&payload);

        match payment.payment_status {
            PaymentStatus::Completed if payment.transaction_id.is_some() => {
                if claimed.is_some() && claimed == payment.transaction_id {
                    return Ok(PaymentConfirmation {
                        booking_id: id,
                        verified: true,
                        payment_status: payment.payment_status,
                        transaction_id: payment.transaction_id.clone(),
                    });
                }
                return Err(BookingError::Conflict(
                    "payment is already settled by another transaction".to_string(),
                ));
            }
            PaymentStatus::Refunded => {
                return Err(BookingError::ValidationFailed(
                    "payment has been refunded".to_string(),
                ));
            }
            _ => {}
        }

        let verified = timeout(
            self.settings.provider_timeout,
            provider.verify_payment(&payload),
        )
        .await
        .map_err(|_| BookingError::ProviderTimeout {
            booking: Some(id),
            after: self.settings.provider_timeout,
        })?;

        if !verified && payment.payment_status == PaymentStatus::Completed {
            return Err(BookingError::ValidationFailed(
                "payment is already completed".to_string(),
            ));
        }

        let now = Utc::now();
        if verified {
            let transaction_id = claimed.ok_or_else(|| {
                BookingError::ValidationFailed(
                    "confirmation payload carries no transaction id".to_string(),
                )
            })?;
            payment.transaction_id = Some(transaction_id);
            payment.mark_completed(now);
        } else {
            payment.payment_status = PaymentStatus::Failed;
            payment.updated_at = now;
        }
        payment.payment_response = Some(payload);

        let confirmation = PaymentConfirmation {
            booking_id: id,
            verified,
            payment_status: payment.payment_status,
            transaction_id: payment.transaction_id.clone(),
        };
        self.ledger.save(&guard, record).await?;

        if verified {
            info!(booking = %id, "payment confirmed");
        } else {
            warn!(booking = %id, "payment confirmation rejected by provider");
        }
        Ok(confirmation)
    }

    pub async fn transition_booking(
        &self,
        caller: &Identity,
        id: BookingId,
        target: BookingStatus,
    ) -> Result<TransitionOutcome> {
        let record = self.ledger.get(id).await?;
        ensure_can_view(caller, &record)?;

        // Resolve everything the outcome needs before anything is written.
        let service = self.service(record.booking.service_id).await?;
        let vehicle = self.vehicle(record.booking.vehicle_id).await?;
        let customer = self.user(record.booking.user_id).await?;
        let actor = self.user(caller.user_id).await?;

        let applied = self.ledger.transition(caller, id, target).await?;
        Ok(TransitionOutcome {
            booking_id: id,
            old_status: applied.from,
            new_status: applied.record.booking.status,
            payment_status: applied.record.payment_status(),
            service: service.summary(),
            vehicle: vehicle.summary(),
            customer: customer.summary(),
            updated_by: actor.summary(),
        })
    }

    /// Self-service cancellation; only the owner, only while pending.
    pub async fn cancel_own_booking(&self, caller: &Identity, id: BookingId) -> Result<CancelAck> {
        let record = self.ledger.get(id).await?;
        if !caller.is_owner_of(record.booking.user_id) {
            return Err(BookingError::Forbidden(
                "only the owner can cancel this booking".to_string(),
            ));
        }

        let applied = self
            .ledger
            .transition_from(
                caller,
                id,
                BookingStatus::Pending,
                BookingStatus::Cancelled,
            )
            .await?;
        Ok(CancelAck {
            booking_id: id,
            status: applied.record.booking.status,
        })
    }

    pub async fn get_booking(&self, caller: &Identity, id: BookingId) -> Result<BookingDetail> {
        let record = self.ledger.get(id).await?;
        ensure_can_view(caller, &record)?;
        self.detail(&record).await
    }

    /// The caller's own bookings; admins see every booking.
    pub async fn list_my_bookings(&self, caller: &Identity) -> Result<Vec<BookingSummary>> {
        let records = if caller.role == Role::Admin {
            self.ledger.list_all().await?
        } else {
            self.ledger.list_by_user(caller.user_id).await?
        };
        self.summaries(&records).await
    }

    pub async fn list_all_bookings(&self, caller: &Identity) -> Result<Vec<BookingSummary>> {
        caller.require(ADMIN_ONLY)?;
        let records = self.ledger.list_all().await?;
        self.summaries(&records).await
    }

    async fn initiate(
        &self,
        guard: &BookingGuard,
        mut record: BookingRecord,
        provider: &PaymentProviderRef,
    ) -> Result<(BookingRecord, PaymentIntent)> {
        let id = record.id();
        let limit = self.settings.provider_timeout;
        let payment = payment_of(&mut record)?;

        let attempt = timeout(
            limit,
            provider.create_payment(payment.amount, &payment.currency, payment.payment_method),
        )
        .await;

        let now = Utc::now();
        let outcome = match attempt {
            Ok(ProviderOutcome::Created(intent)) => {
                payment.record_intent(&intent, now);
                Ok(intent)
            }
            Ok(ProviderOutcome::Failed { error }) => {
                warn!(booking = %id, %error, "payment initiation failed");
                payment.record_initiation_failure(&error, "provider_failure", now);
                Err(BookingError::ProviderFailure {
                    booking: Some(id),
                    reason: error,
                })
            }
            Err(_) => {
                warn!(booking = %id, ?limit, "payment initiation timed out");
                let error = format!("no answer within {:?}", limit);
                payment.record_initiation_failure(&error, "provider_timeout", now);
                Err(BookingError::ProviderTimeout {
                    booking: Some(id),
                    after: limit,
                })
            }
        };

        self.ledger.save(guard, record.clone()).await?;
        outcome.map(|intent| (record, intent))
    }

    async fn detail(&self, record: &BookingRecord) -> Result<BookingDetail> {
        let summary = self.summary(record).await?;
        let payment = record.payment.as_ref().map(|p| PaymentDetail {
            id: p.id,
            status: p.payment_status,
            method: p.payment_method,
            amount: p.amount,
            currency: p.currency.clone(),
            provider_reference: p.provider_reference.clone(),
            transaction_id: p.transaction_id.clone(),
        });
        Ok(BookingDetail {
            summary,
            payment,
            updated_at: record.booking.updated_at,
        })
    }

    async fn summaries(&self, records: &[BookingRecord]) -> Result<Vec<BookingSummary>> {
        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            summaries.push(self.summary(record).await?);
        }
        Ok(summaries)
    }

    async fn summary(&self, record: &BookingRecord) -> Result<BookingSummary> {
        let booking = &record.booking;
        let customer = self.user(booking.user_id).await?;
        let service = self.service(booking.service_id).await?;
        let vehicle = self.vehicle(booking.vehicle_id).await?;
        Ok(BookingSummary {
            id: booking.id,
            customer: customer.summary(),
            service: service.summary(),
            vehicle: vehicle.summary(),
            date: booking.date,
            time_from: booking.time_from,
            time_to: booking.time_to,
            duration: booking.duration,
            total_amount: booking.total_amount,
            status: booking.status,
            payment_status: record.payment_status(),
            created_at: booking.created_at,
        })
    }

    async fn service(&self, id: ServiceId) -> Result<Service> {
        self.catalog
            .service(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("service {}", id)))
    }

    async fn vehicle(&self, id: VehicleId) -> Result<Vehicle> {
        self.catalog
            .vehicle(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("vehicle {}", id)))
    }

    async fn user(&self, id: UserId) -> Result<User> {
        self.catalog
            .user(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("user {}", id)))
    }
}

fn payment_of(record: &mut BookingRecord) -> Result<&mut Payment> {
    let id = record.id();
    record
        .payment
        .as_mut()
        .ok_or_else(|| BookingError::NotFound(format!("payment for booking {}", id)))
}

fn result_for(record: &BookingRecord, intent: PaymentIntent) -> Result<BookingResult> {
    let payment = record.payment.as_ref().ok_or_else(|| {
        BookingError::NotFound(format!("payment for booking {}", record.id()))
    })?;
    Ok(BookingResult {
        booking_id: record.id(),
        payment_id: payment.id,
        status: record.booking.status,
        total_amount: record.booking.total_amount,
        currency: payment.currency.clone(),
        payment_method: payment.payment_method,
        intent,
    })
}

fn ensure_owner_or_admin(caller: &Identity, record: &BookingRecord) -> Result<()> {
    if caller.is_owner_of(record.booking.user_id) || caller.has_role(ADMIN_ONLY) {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "only the owner or an admin can do this".to_string(),
        ))
    }
}

/// Owners see their bookings; staff and admins see all of them.
fn ensure_can_view(caller: &Identity, record: &BookingRecord) -> Result<()> {
    if caller.is_owner_of(record.booking.user_id) || caller.has_role(STAFF_OR_ADMIN) {
        Ok(())
    } else {
        Err(BookingError::Forbidden("access denied".to_string()))
    }
}
