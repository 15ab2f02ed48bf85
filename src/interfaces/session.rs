//! Replays a command script against a [`BookingService`].
//!
//! Scripts refer to users, vehicles, services and bookings by label. The
//! session maps labels to ids and keeps one session token per user, checked
//! for expiry and against the revocation registry before every authenticated
//! command.

use super::csv::booking_writer::BookingRow;
use super::csv::command_reader::{Command, CommandKind};
use crate::application::revocation::{TokenId, TokenRevocationRegistry};
use crate::application::service::{BookingService, NewBooking};
use crate::domain::booking::{BookingId, BookingStatus};
use crate::domain::catalog::{Service, ServiceId, User, Vehicle, VehicleId, VehicleType};
use crate::domain::identity::{Identity, Role};
use crate::domain::money::Price;
use crate::domain::payment::PaymentMethod;
use crate::error::{BookingError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

struct Account {
    identity: Identity,
    username: String,
    token: TokenId,
    expires_at: DateTime<Utc>,
}

pub struct Session {
    service: BookingService,
    revocations: TokenRevocationRegistry,
    token_ttl: TimeDelta,
    accounts: HashMap<String, Account>,
    vehicles: HashMap<String, VehicleId>,
    services: HashMap<String, ServiceId>,
    bookings: BTreeMap<String, BookingId>,
}

impl Session {
    pub fn new(service: BookingService, revocations: TokenRevocationRegistry) -> Self {
        Self {
            service,
            revocations,
            token_ttl: TimeDelta::hours(1),
            accounts: HashMap::new(),
            vehicles: HashMap::new(),
            services: HashMap::new(),
            bookings: BTreeMap::new(),
        }
    }

    /// Lifetime of the tokens issued from now on.
    pub fn with_token_ttl(mut self, ttl: TimeDelta) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn service(&self) -> &BookingService {
        &self.service
    }

    /// Id behind a booking label, once the booking has been recorded.
    pub fn booking_id(&self, label: &str) -> Option<BookingId> {
        self.bookings.get(label).copied()
    }

    pub async fn execute(&mut self, command: Command) -> Result<()> {
        debug!(op = ?command.op, target = ?command.target, "replaying command");
        match command.op {
            CommandKind::User => self.add_user(&command).await,
            CommandKind::Service => self.put_service(&command).await,
            CommandKind::Vehicle => self.add_vehicle(&command).await,
            CommandKind::Login => self.login(&command).await,
            CommandKind::Logout => {
                let label = command.actor()?;
                self.authenticate(label).await?;
                let account = self.account(label)?;
                self.revocations
                    .revoke_until(account.token.clone(), account.expires_at)
                    .await;
                Ok(())
            }
            CommandKind::Book => self.book(&command).await,
            CommandKind::Transition => {
                let caller = self.authenticate(command.actor()?).await?;
                let id = self.booking(command.target()?)?;
                let target = BookingStatus::from_str(command.arg(0)?)?;
                self.service.transition_booking(&caller, id, target).await?;
                Ok(())
            }
            CommandKind::Cancel => {
                let caller = self.authenticate(command.actor()?).await?;
                let id = self.booking(command.target()?)?;
                self.service.cancel_own_booking(&caller, id).await?;
                Ok(())
            }
            CommandKind::Retry => {
                let caller = self.authenticate(command.actor()?).await?;
                let id = self.booking(command.target()?)?;
                self.service.retry_payment(&caller, id).await?;
                Ok(())
            }
            CommandKind::Confirm => {
                let caller = self.authenticate(command.actor()?).await?;
                let id = self.booking(command.target()?)?;
                let payload = self.confirmation_payload(id, command.arg(0)?).await?;
                self.service.confirm_payment(&caller, id, payload).await?;
                Ok(())
            }
        }
    }

    /// Final state of every recorded booking, ordered by label.
    pub async fn report(&self) -> Result<Vec<BookingRow>> {
        let usernames: HashMap<_, _> = self
            .accounts
            .values()
            .map(|account| (account.identity.user_id, account.username.as_str()))
            .collect();

        let mut rows = Vec::with_capacity(self.bookings.len());
        for (label, id) in &self.bookings {
            let record = self.service.ledger().get(*id).await?;
            let customer = usernames
                .get(&record.booking.user_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| record.booking.user_id.to_string());
            rows.push(BookingRow {
                booking: label.clone(),
                customer,
                status: record.booking.status,
                payment_status: record.payment_status(),
                amount: record.booking.total_amount.value(),
                currency: record.payment.as_ref().map(|p| p.currency.to_string()),
            });
        }
        Ok(rows)
    }

    async fn add_user(&mut self, command: &Command) -> Result<()> {
        let label = command.target()?;
        if self.accounts.contains_key(label) {
            return Err(BookingError::Conflict(format!("user '{}' already exists", label)));
        }
        let username = command.optional_arg(0).unwrap_or(label);
        let role = match command.optional_arg(1) {
            Some(role) => Role::from_str(role)?,
            None => Role::User,
        };
        let user = User::new(username, role);
        let identity = Identity::new(user.id, role);
        self.service.catalog().add_user(user).await?;
        self.accounts.insert(
            label.to_string(),
            Account {
                identity,
                username: username.to_string(),
                token: TokenId::generate(),
                expires_at: Utc::now() + self.token_ttl,
            },
        );
        Ok(())
    }

    /// Adds a service, or reprices an existing label in place.
    async fn put_service(&mut self, command: &Command) -> Result<()> {
        let label = command.target()?;
        let name = command.optional_arg(0).unwrap_or(label);
        let price = Price::new(parse_decimal(command.arg(1)?)?)?;
        let raw_duration = command.arg(2)?;
        let duration = raw_duration.parse::<u32>().map_err(|_| {
            BookingError::ValidationFailed(format!("invalid duration '{}'", raw_duration))
        })?;
        let vehicle_type = VehicleType::from_str(command.arg(3)?)?;

        let mut service = Service::new(name, price, duration, vehicle_type)?;
        if let Some(existing) = self.services.get(label) {
            service.id = *existing;
        }
        let id = service.id;
        self.service.catalog().put_service(service).await?;
        self.services.insert(label.to_string(), id);
        Ok(())
    }

    async fn add_vehicle(&mut self, command: &Command) -> Result<()> {
        let owner = self.account(command.actor()?)?.identity.user_id;
        let label = command.target()?;
        if self.vehicles.contains_key(label) {
            return Err(BookingError::Conflict(format!("vehicle '{}' already exists", label)));
        }
        let vehicle = Vehicle::new(
            owner,
            command.arg(0)?,
            command.arg(1)?,
            VehicleType::from_str(command.arg(2)?)?,
        );
        let id = vehicle.id;
        self.service.catalog().add_vehicle(vehicle).await?;
        self.vehicles.insert(label.to_string(), id);
        Ok(())
    }

    async fn login(&mut self, command: &Command) -> Result<()> {
        let label = command.actor()?;
        let now = Utc::now();
        let ttl = self.token_ttl;
        let account = self
            .accounts
            .get_mut(label)
            .ok_or_else(|| BookingError::NotFound(format!("user '{}'", label)))?;
        account.token = TokenId::generate();
        account.expires_at = now + ttl;
        self.revocations.prune_expired(now).await;
        Ok(())
    }

    async fn book(&mut self, command: &Command) -> Result<()> {
        let caller = self.authenticate(command.actor()?).await?;
        let label = command.target()?;
        if self.bookings.contains_key(label) {
            return Err(BookingError::Conflict(format!("booking '{}' already exists", label)));
        }
        let (time_from, time_to) = parse_slot(command.arg(3)?)?;
        let request = NewBooking {
            service_id: self.lookup(&self.services, "service", command.arg(0)?)?,
            vehicle_id: self.lookup(&self.vehicles, "vehicle", command.arg(1)?)?,
            date: NaiveDate::parse_from_str(command.arg(2)?, "%Y-%m-%d").map_err(|e| {
                BookingError::ValidationFailed(format!("invalid date: {}", e))
            })?,
            time_from,
            time_to,
            payment_method: command
                .optional_arg(4)
                .map(PaymentMethod::from_str)
                .transpose()?,
        };

        match self.service.create_booking(&caller, request).await {
            Ok(result) => {
                self.bookings.insert(label.to_string(), result.booking_id);
                Ok(())
            }
            Err(e) => {
                // The booking exists even when payment initiation failed.
                if let Some(id) = e.booking_id() {
                    self.bookings.insert(label.to_string(), id);
                }
                Err(e)
            }
        }
    }

    async fn authenticate(&self, label: &str) -> Result<Identity> {
        let account = self.account(label)?;
        let expired = account.expires_at <= Utc::now();
        if expired || self.revocations.is_revoked(&account.token).await {
            return Err(BookingError::Unauthenticated);
        }
        Ok(account.identity)
    }

    fn account(&self, label: &str) -> Result<&Account> {
        self.accounts
            .get(label)
            .ok_or_else(|| BookingError::NotFound(format!("user '{}'", label)))
    }

    fn booking(&self, label: &str) -> Result<BookingId> {
        self.booking_id(label)
            .ok_or_else(|| BookingError::NotFound(format!("booking '{}'", label)))
    }

    /// A raw JSON object is passed through. Anything else is taken as a mock
    /// transaction id settling the booking's current payment intent.
    async fn confirmation_payload(&self, id: BookingId, value: &str) -> Result<Value> {
        if value.starts_with('{') {
            return serde_json::from_str(value).map_err(|e| {
                BookingError::ValidationFailed(format!("invalid confirmation payload: {}", e))
            });
        }
        let record = self.service.ledger().get(id).await?;
        let reference = record
            .payment
            .and_then(|payment| payment.provider_reference)
            .ok_or_else(|| {
                BookingError::ValidationFailed("booking has no payment intent to confirm".to_string())
            })?;
        Ok(json!({ "transaction_id": value, "reference": reference }))
    }

    fn lookup<T: Copy>(&self, table: &HashMap<String, T>, kind: &str, label: &str) -> Result<T> {
        table
            .get(label)
            .copied()
            .ok_or_else(|| BookingError::NotFound(format!("{} '{}'", kind, label)))
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| BookingError::ValidationFailed(format!("invalid amount '{}'", value)))
}

/// `HH:MM-HH:MM`
fn parse_slot(value: &str) -> Result<(NaiveTime, NaiveTime)> {
    let invalid = || BookingError::ValidationFailed(format!("invalid time slot '{}'", value));
    let (from, to) = value.split_once('-').ok_or_else(invalid)?;
    let from = NaiveTime::parse_from_str(from.trim(), "%H:%M").map_err(|_| invalid())?;
    let to = NaiveTime::parse_from_str(to.trim(), "%H:%M").map_err(|_| invalid())?;
    Ok((from, to))
}
