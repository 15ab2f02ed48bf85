use crate::domain::booking::{BookingId, BookingRecord};
use crate::domain::catalog::{Service, ServiceId, User, Vehicle, VehicleId};
use crate::domain::identity::UserId;
use crate::domain::ports::{BookingStore, CatalogStore};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for booking records (booking + payment).
pub const CF_BOOKINGS: &str = "bookings";
/// Index: transaction id -> booking id.
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_USERS: &str = "users";
/// Index: username -> user id.
pub const CF_USERNAMES: &str = "usernames";
pub const CF_VEHICLES: &str = "vehicles";
/// Index: numberplate -> vehicle id.
pub const CF_NUMBERPLATES: &str = "numberplates";
pub const CF_SERVICES: &str = "services";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_BOOKINGS,
    CF_TRANSACTIONS,
    CF_USERS,
    CF_USERNAMES,
    CF_VEHICLES,
    CF_NUMBERPLATES,
    CF_SERVICES,
];

/// A persistent store implementation using RocksDB.
///
/// Each booking record is one value, so a booking and its payment are always
/// written together. Uniqueness indexes live in their own column families and
/// are updated in the same `WriteBatch` as the row they index. Writers are
/// serialised by `write_lock` so an index check and the batch that follows it
/// cannot interleave with another writer.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BookingError::internal(format!("{} column family not found", name)))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &str) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn index_owner(&self, cf: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .db
            .get_cf(self.cf(cf)?, key.as_bytes())?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf: &str,
        key: &str,
        value: &T,
    ) -> Result<()> {
        batch.put_cf(self.cf(cf)?, key.as_bytes(), serde_json::to_vec(value)?);
        Ok(())
    }

    fn write_record(&self, record: &BookingRecord, previous: Option<&BookingRecord>) -> Result<()> {
        let id = record.id().to_string();
        let txn = record.payment.as_ref().and_then(|p| p.transaction_id.clone());
        if let Some(txn) = &txn
            && let Some(owner) = self.index_owner(CF_TRANSACTIONS, txn)?
            && owner != id
        {
            return Err(BookingError::Conflict(format!(
                "transaction id '{}' is already recorded",
                txn
            )));
        }

        let mut batch = WriteBatch::default();
        let old_txn = previous
            .and_then(|r| r.payment.as_ref())
            .and_then(|p| p.transaction_id.clone());
        if let Some(old_txn) = old_txn
            && Some(&old_txn) != txn.as_ref()
        {
            batch.delete_cf(self.cf(CF_TRANSACTIONS)?, old_txn.as_bytes());
        }
        if let Some(txn) = &txn {
            batch.put_cf(self.cf(CF_TRANSACTIONS)?, txn.as_bytes(), id.as_bytes());
        }
        self.put_json(&mut batch, CF_BOOKINGS, &id, record)?;
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for RocksDBStore {
    async fn insert(&self, record: BookingRecord) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        let key = record.id().to_string();
        if self.read::<BookingRecord>(CF_BOOKINGS, &key)?.is_some() {
            return Err(BookingError::Conflict(format!(
                "booking {} already exists",
                key
            )));
        }
        self.write_record(&record, None)
    }

    async fn update(&self, record: BookingRecord) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        let key = record.id().to_string();
        let previous: BookingRecord = self
            .read(CF_BOOKINGS, &key)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", key)))?;
        self.write_record(&record, Some(&previous))
    }

    async fn get(&self, id: BookingId) -> Result<Option<BookingRecord>> {
        self.read(CF_BOOKINGS, &id.to_string())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<BookingRecord>> {
        let records: Vec<BookingRecord> = self.read_all(CF_BOOKINGS)?;
        Ok(records
            .into_iter()
            .filter(|r| r.booking.user_id == user_id)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<BookingRecord>> {
        self.read_all(CF_BOOKINGS)
    }
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn add_user(&self, user: User) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        if self.index_owner(CF_USERNAMES, &user.username)?.is_some() {
            return Err(BookingError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        let id = user.id.to_string();
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_USERNAMES)?,
            user.username.as_bytes(),
            id.as_bytes(),
        );
        self.put_json(&mut batch, CF_USERS, &id, &user)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.read(CF_USERS, &id.to_string())
    }

    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        if self
            .index_owner(CF_NUMBERPLATES, &vehicle.numberplate)?
            .is_some()
        {
            return Err(BookingError::Conflict(format!(
                "numberplate '{}' is already registered",
                vehicle.numberplate
            )));
        }
        let id = vehicle.id.to_string();
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_NUMBERPLATES)?,
            vehicle.numberplate.as_bytes(),
            id.as_bytes(),
        );
        self.put_json(&mut batch, CF_VEHICLES, &id, &vehicle)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        self.read(CF_VEHICLES, &id.to_string())
    }

    async fn put_service(&self, service: Service) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_SERVICES, &service.id.to_string(), &service)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.read(CF_SERVICES, &id.to_string())
    }
}
