use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal_macros::dec;
use washbay::domain::booking::{Booking, BookingId, BookingRecord, BookingStatus};
use washbay::domain::catalog::{Service, ServiceId, User, VehicleId, VehicleType};
use washbay::domain::identity::{Role, UserId};
use washbay::domain::money::{Amount, Currency, Price};
use washbay::domain::payment::{Payment, PaymentMethod};
use washbay::domain::ports::{BookingStoreBox, CatalogStoreBox};
use washbay::infrastructure::in_memory::{InMemoryBookingStore, InMemoryCatalogStore};

fn record() -> BookingRecord {
    let now = Utc::now();
    let id = BookingId::new();
    BookingRecord {
        booking: Booking {
            id,
            user_id: UserId::new(),
            service_id: ServiceId::new(),
            vehicle_id: VehicleId::new(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            time_from: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            time_to: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            duration: 30,
            total_amount: Price::new(dec!(10)).unwrap(),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        },
        payment: Some(Payment::pending(
            id,
            Amount::new(dec!(10)).unwrap(),
            Currency::usd(),
            PaymentMethod::Stripe,
            now,
        )),
    }
}

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let booking_store: BookingStoreBox = Box::new(InMemoryBookingStore::new());
    let catalog_store: CatalogStoreBox = Box::new(InMemoryCatalogStore::new());

    let record = record();
    let id = record.id();
    let user = User::new("alice", Role::User);
    let user_id = user.id;
    let service = Service::new("Full Wash", Price::new(dec!(10)).unwrap(), 30, VehicleType::Car)
        .unwrap();
    let service_id = service.id;

    // Verify Send + Sync by spawning tasks
    let bs_handle = tokio::spawn(async move {
        booking_store.insert(record).await.unwrap();
        booking_store.get(id).await.unwrap().unwrap()
    });

    let cs_handle = tokio::spawn(async move {
        catalog_store.add_user(user).await.unwrap();
        catalog_store.put_service(service).await.unwrap();
        (
            catalog_store.user(user_id).await.unwrap().unwrap(),
            catalog_store.service(service_id).await.unwrap().unwrap(),
        )
    });

    let retrieved = bs_handle.await.unwrap();
    assert_eq!(retrieved.id(), id);

    let (user, service) = cs_handle.await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(service.duration, 30);
}
