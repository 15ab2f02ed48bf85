#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use washbay::application::ledger::BookingLedger;
use washbay::application::providers::ProviderRegistry;
use washbay::application::service::{BookingService, BookingSettings, NewBooking};
use washbay::domain::catalog::{Service, User, Vehicle, VehicleType};
use washbay::domain::identity::{Identity, Role};
use washbay::domain::money::{Amount, Currency, Price};
use washbay::domain::payment::{PaymentIntent, PaymentMethod, ProviderOutcome};
use washbay::domain::ports::{PaymentProvider, PaymentProviderRef};
use washbay::infrastructure::in_memory::{InMemoryBookingStore, InMemoryCatalogStore};
use washbay::infrastructure::payment::mock::MockProvider;

/// Fails the first `failures` initiation calls, then behaves like the mock.
pub struct FlakyProvider {
    failures: usize,
    calls: AtomicUsize,
    inner: MockProvider,
}

impl FlakyProvider {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            inner: MockProvider::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for FlakyProvider {
    fn currency(&self) -> Currency {
        Currency::usd()
    }

    async fn create_payment(
        &self,
        amount: Amount,
        currency: &Currency,
        method: PaymentMethod,
    ) -> ProviderOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return ProviderOutcome::Failed {
                error: "upstream unavailable".to_string(),
            };
        }
        self.inner.create_payment(amount, currency, method).await
    }

    async fn verify_payment(&self, payload: &Value) -> bool {
        self.inner.verify_payment(payload).await
    }

    fn transaction_id(&self, payload: &Value) -> Option<String> {
        self.inner.transaction_id(payload)
    }

    fn reference(&self, payload: &Value) -> Option<String> {
        self.inner.reference(payload)
    }
}

/// Never answers within any sensible timeout.
pub struct StalledProvider;

#[async_trait]
impl PaymentProvider for StalledProvider {
    fn currency(&self) -> Currency {
        Currency::usd()
    }

    async fn create_payment(
        &self,
        _amount: Amount,
        _currency: &Currency,
        _method: PaymentMethod,
    ) -> ProviderOutcome {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        ProviderOutcome::Created(PaymentIntent {
            reference: "late".to_string(),
            client_secret_or_approval_url: None,
            raw: json!({}),
        })
    }

    async fn verify_payment(&self, _payload: &Value) -> bool {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        true
    }

    fn transaction_id(&self, _payload: &Value) -> Option<String> {
        None
    }

    fn reference(&self, _payload: &Value) -> Option<String> {
        None
    }
}

pub struct Fixture {
    pub service: BookingService,
    pub customer: Identity,
    pub other_customer: Identity,
    pub staff: Identity,
    pub admin: Identity,
    pub wash: Service,
    pub car: Vehicle,
    pub bike: Vehicle,
}

impl Fixture {
    pub async fn new() -> Self {
        let provider: PaymentProviderRef = Arc::new(MockProvider::default());
        Self::with_provider(provider).await
    }

    /// Every payment method is served by `provider`.
    pub async fn with_provider(provider: PaymentProviderRef) -> Self {
        let mut registry = ProviderRegistry::new();
        for method in PaymentMethod::ALL {
            registry.register(method, provider.clone());
        }
        Self::build(registry, Price::new(Decimal::new(2500, 2)).unwrap()).await
    }

    pub async fn build(registry: ProviderRegistry, price: Price) -> Self {
        let settings = BookingSettings {
            provider_timeout: Duration::from_millis(200),
            ..BookingSettings::default()
        };
        let service = BookingService::new(
            BookingLedger::new(Box::new(InMemoryBookingStore::new())),
            Box::new(InMemoryCatalogStore::new()),
            registry,
            settings,
        );

        let catalog = service.catalog();
        let mut identities = Vec::new();
        for (name, role) in [
            ("alice", Role::User),
            ("bob", Role::User),
            ("sam", Role::Staff),
            ("root", Role::Admin),
        ] {
            let user = User::new(name, role);
            identities.push(Identity::new(user.id, role));
            catalog.add_user(user).await.unwrap();
        }
        let (customer, other_customer, staff, admin) =
            (identities[0], identities[1], identities[2], identities[3]);

        let wash = Service::new("Full Wash", price, 30, VehicleType::Car).unwrap();
        catalog.put_service(wash.clone()).await.unwrap();
        let car = Vehicle::new(customer.user_id, "Civic", "KA01AB1234", VehicleType::Car);
        catalog.add_vehicle(car.clone()).await.unwrap();
        let bike = Vehicle::new(customer.user_id, "Duke", "KA01XY0001", VehicleType::Bike);
        catalog.add_vehicle(bike.clone()).await.unwrap();

        Self {
            service,
            customer,
            other_customer,
            staff,
            admin,
            wash,
            car,
            bike,
        }
    }

    pub fn request(&self) -> NewBooking {
        NewBooking {
            service_id: self.wash.id,
            vehicle_id: self.car.id,
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            time_from: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            time_to: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            payment_method: None,
        }
    }
}

pub fn write_script(path: &Path, rows: &[&str]) -> std::io::Result<()> {
    let mut body = String::from("op,actor,target,a,b,c,d,e\n");
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(path, body)
}

pub const SEED: [&str; 5] = [
    "user,,alice,alice,user,,,",
    "user,,sam,sam,staff,,,",
    "user,,root,root,admin,,,",
    "service,,wash,Full Wash,25.00,30,car,",
    "vehicle,alice,civic,Civic,KA01AB1234,car,",
];
