use crate::domain::booking::{BookingId, BookingRecord};
use crate::domain::catalog::{Service, ServiceId, User, Vehicle, VehicleId};
use crate::domain::identity::UserId;
use crate::domain::ports::{BookingStore, CatalogStore};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct BookingTables {
    bookings: HashMap<BookingId, BookingRecord>,
    /// transaction_id -> owning booking, the uniqueness index.
    transactions: HashMap<String, BookingId>,
}

impl BookingTables {
    fn claim_transaction(&self, record: &BookingRecord) -> Result<Option<String>> {
        let Some(txn) = record
            .payment
            .as_ref()
            .and_then(|p| p.transaction_id.clone())
        else {
            return Ok(None);
        };
        match self.transactions.get(&txn) {
            Some(owner) if *owner != record.id() => Err(BookingError::Conflict(format!(
                "transaction id '{}' is already recorded",
                txn
            ))),
            _ => Ok(Some(txn)),
        }
    }

    fn release_transaction(&mut self, id: BookingId) {
        let previous = self
            .bookings
            .get(&id)
            .and_then(|r| r.payment.as_ref())
            .and_then(|p| p.transaction_id.clone());
        if let Some(txn) = previous {
            self.transactions.remove(&txn);
        }
    }
}

/// A thread-safe in-memory store for bookings and their payments.
///
/// Both tables sit behind one `RwLock`, so a record and the transaction id
/// index are always updated together.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    tables: Arc<RwLock<BookingTables>>,
}

impl InMemoryBookingStore {
    /// Creates a new, empty in-memory booking store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, record: BookingRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.bookings.contains_key(&record.id()) {
            return Err(BookingError::Conflict(format!(
                "booking {} already exists",
                record.id()
            )));
        }
        if let Some(txn) = tables.claim_transaction(&record)? {
            tables.transactions.insert(txn, record.id());
        }
        tables.bookings.insert(record.id(), record);
        Ok(())
    }

    async fn update(&self, record: BookingRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&record.id()) {
            return Err(BookingError::NotFound(format!("booking {}", record.id())));
        }
        let txn = tables.claim_transaction(&record)?;
        tables.release_transaction(record.id());
        if let Some(txn) = txn {
            tables.transactions.insert(txn, record.id());
        }
        tables.bookings.insert(record.id(), record);
        Ok(())
    }

    async fn get(&self, id: BookingId) -> Result<Option<BookingRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<BookingRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|r| r.booking.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<BookingRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().cloned().collect())
    }
}

#[derive(Default)]
struct CatalogTables {
    users: HashMap<UserId, User>,
    vehicles: HashMap<VehicleId, Vehicle>,
    services: HashMap<ServiceId, Service>,
}

/// A thread-safe in-memory catalog of users, vehicles and services.
///
/// Username and numberplate uniqueness are checked under the write lock.
#[derive(Default, Clone)]
pub struct InMemoryCatalogStore {
    tables: Arc<RwLock<CatalogTables>>,
}

impl InMemoryCatalogStore {
    /// Creates a new, empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn add_user(&self, user: User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(BookingError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .vehicles
            .values()
            .any(|v| v.numberplate == vehicle.numberplate)
        {
            return Err(BookingError::Conflict(format!(
                "numberplate '{}' is already registered",
                vehicle.numberplate
            )));
        }
        tables.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables.vehicles.get(&id).cloned())
    }

    async fn put_service(&self, service: Service) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.services.insert(service.id, service);
        Ok(())
    }

    async fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        let tables = self.tables.read().await;
        Ok(tables.services.get(&id).cloned())
    }
}
