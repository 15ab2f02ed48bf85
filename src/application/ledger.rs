use crate::domain::booking::{BookingId, BookingRecord, BookingStatus, check_transition};
use crate::domain::identity::{Identity, UserId};
use crate::domain::ports::BookingStoreBox;
use crate::error::{BookingError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

type LockSlots = Arc<std::sync::Mutex<HashMap<BookingId, Arc<Mutex<()>>>>>;

/// Exclusive hold on one booking. Reads and writes made while it is alive
/// cannot interleave with another holder's.
pub struct BookingGuard {
    id: BookingId,
    slots: LockSlots,
    _lock: OwnedMutexGuard<()>,
}

impl BookingGuard {
    pub fn id(&self) -> BookingId {
        self.id
    }
}

impl Drop for BookingGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the slot: no one is waiting.
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            slots.remove(&self.id);
        }
    }
}

/// Result of an accepted transition.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub from: BookingStatus,
    pub record: BookingRecord,
}

/// The authoritative store and rules for bookings and their payments.
///
/// Every status change goes through [`BookingLedger::transition`], which holds
/// the booking's lock from the read of the current status to the write of the
/// new one.
pub struct BookingLedger {
    store: BookingStoreBox,
    locks: LockSlots,
}

impl BookingLedger {
    pub fn new(store: BookingStoreBox) -> Self {
        Self {
            store,
            locks: LockSlots::default(),
        }
    }

    /// Waits for exclusive access to `id`. The slot is dropped again once the
    /// last holder or waiter lets go.
    pub async fn lock(&self, id: BookingId) -> BookingGuard {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };
        BookingGuard {
            id,
            slots: self.locks.clone(),
            _lock: slot.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn lock_slots(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Persists a freshly created booking together with its payment.
    pub async fn open(&self, record: BookingRecord) -> Result<()> {
        if record.booking.status != BookingStatus::Pending {
            return Err(BookingError::ValidationFailed(
                "new bookings start in pending".to_string(),
            ));
        }
        if let Some(payment) = &record.payment
            && payment.booking_id != record.id()
        {
            return Err(BookingError::ValidationFailed(
                "payment belongs to a different booking".to_string(),
            ));
        }
        self.store.insert(record).await
    }

    pub async fn get(&self, id: BookingId) -> Result<BookingRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", id)))
    }

    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<BookingRecord>> {
        let mut records = self.store.list_by_user(user_id).await?;
        records.sort_by_key(|r| r.booking.created_at);
        Ok(records)
    }

    pub async fn list_all(&self) -> Result<Vec<BookingRecord>> {
        let mut records = self.store.list_all().await?;
        records.sort_by_key(|r| r.booking.created_at);
        Ok(records)
    }

    /// Writes a record read under `guard`.
    pub async fn save(&self, guard: &BookingGuard, record: BookingRecord) -> Result<()> {
        if guard.id() != record.id() {
            return Err(BookingError::internal(format!(
                "guard for booking {} used to save booking {}",
                guard.id(),
                record.id()
            )));
        }
        self.store.update(record).await
    }

    /// Moves a booking to `to` on behalf of `actor`.
    ///
    /// Completing a booking also completes its payment in the same write.
    pub async fn transition(
        &self,
        actor: &Identity,
        id: BookingId,
        to: BookingStatus,
    ) -> Result<AppliedTransition> {
        self.apply(actor, id, None, to).await
    }

    /// Like [`transition`](Self::transition), but only from `from`; any other
    /// current status is an `InvalidTransition`.
    pub async fn transition_from(
        &self,
        actor: &Identity,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<AppliedTransition> {
        self.apply(actor, id, Some(from), to).await
    }

    async fn apply(
        &self,
        actor: &Identity,
        id: BookingId,
        expected: Option<BookingStatus>,
        to: BookingStatus,
    ) -> Result<AppliedTransition> {
        let guard = self.lock(id).await;
        let mut record = self.get(id).await?;
        let from = record.booking.status;

        if let Some(expected) = expected
            && expected != from
        {
            return Err(BookingError::InvalidTransition {
                from,
                to,
                allowed: from.allowed_next(),
            });
        }
        check_transition(actor, record.booking.user_id, from, to)?;
        record.apply(to, Utc::now());
        self.save(&guard, record.clone()).await?;

        info!(booking = %id, %from, %to, actor = %actor.user_id, "booking status changed");
        debug!(payment_status = ?record.payment_status(), "payment state after transition");
        Ok(AppliedTransition { from, record })
    }
}
