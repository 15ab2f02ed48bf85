use super::booking::{BookingId, BookingRecord};
use super::catalog::{Service, ServiceId, User, Vehicle, VehicleId};
use super::identity::UserId;
use super::money::{Amount, Currency};
use super::payment::{PaymentMethod, ProviderOutcome};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Storage for bookings and their payments.
///
/// Implementations write a `BookingRecord` as one unit and enforce
/// transaction id uniqueness themselves.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Fails with `Conflict` if the booking id already exists.
    async fn insert(&self, record: BookingRecord) -> Result<()>;
    /// Fails with `NotFound` if the booking does not exist.
    async fn update(&self, record: BookingRecord) -> Result<()>;
    async fn get(&self, id: BookingId) -> Result<Option<BookingRecord>>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<BookingRecord>>;
    async fn list_all(&self) -> Result<Vec<BookingRecord>>;
}

/// Read side of users, vehicles and services, plus the registration writes
/// whose uniqueness rules live at the storage boundary.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate username.
    async fn add_user(&self, user: User) -> Result<()>;
    async fn user(&self, id: UserId) -> Result<Option<User>>;
    /// Fails with `Conflict` on a duplicate numberplate.
    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<()>;
    async fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>>;
    /// Inserts or replaces a service.
    async fn put_service(&self, service: Service) -> Result<()>;
    async fn service(&self, id: ServiceId) -> Result<Option<Service>>;
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Settlement currency used when the booking flow does not pick one.
    fn currency(&self) -> Currency;

    async fn create_payment(
        &self,
        amount: Amount,
        currency: &Currency,
        method: PaymentMethod,
    ) -> ProviderOutcome;

    /// Idempotent; repeated calls with the same payload give the same answer.
    async fn verify_payment(&self, payload: &Value) -> bool;

    /// Settled transaction id carried by a confirmation payload.
    fn transaction_id(&self, payload: &Value) -> Option<String>;

    /// The reference issued by `create_payment` that a confirmation payload
    /// claims to settle. Must match the payment's stored reference.
    fn reference(&self, payload: &Value) -> Option<String>;
}

pub type BookingStoreBox = Box<dyn BookingStore>;
pub type CatalogStoreBox = Box<dyn CatalogStore>;
pub type PaymentProviderRef = Arc<dyn PaymentProvider>;

pub type BookingStoreFactory = Box<dyn Fn() -> BookingStoreBox + Send + Sync>;
