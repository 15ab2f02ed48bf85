use super::catalog::{ServiceId, VehicleId, entity_id};
use super::identity::{Identity, Role, UserId};
use super::money::Price;
use super::payment::{Payment, PaymentStatus};
use crate::error::{BookingError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

entity_id!(BookingId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    StartService,
    Complete,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::StartService,
        BookingStatus::Complete,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::StartService => "startservice",
            BookingStatus::Complete => "complete",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Complete | BookingStatus::Cancelled)
    }

    /// States reachable in one step, in table order.
    pub fn allowed_next(&self) -> Vec<BookingStatus> {
        TRANSITIONS
            .iter()
            .filter(|edge| edge.from == *self)
            .map(|edge| edge.to)
            .collect()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| BookingError::ValidationFailed(format!("unknown status '{}'", s)))
    }
}

/// Who may take an edge of the booking state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    StaffOrAdmin,
    OwnerOrAdmin,
    AdminOnly,
}

impl Permit {
    pub fn allows(&self, actor: &Identity, owner: UserId) -> bool {
        match self {
            Permit::StaffOrAdmin => matches!(actor.role, Role::Staff | Role::Admin),
            Permit::OwnerOrAdmin => actor.role == Role::Admin || actor.is_owner_of(owner),
            Permit::AdminOnly => actor.role == Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub permit: Permit,
}

/// Every legal move. Anything absent is an invalid transition.
pub const TRANSITIONS: [Transition; 5] = [
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Confirmed,
        permit: Permit::StaffOrAdmin,
    },
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Cancelled,
        permit: Permit::OwnerOrAdmin,
    },
    Transition {
        from: BookingStatus::Confirmed,
        to: BookingStatus::StartService,
        permit: Permit::StaffOrAdmin,
    },
    Transition {
        from: BookingStatus::Confirmed,
        to: BookingStatus::Cancelled,
        permit: Permit::AdminOnly,
    },
    Transition {
        from: BookingStatus::StartService,
        to: BookingStatus::Complete,
        permit: Permit::StaffOrAdmin,
    },
];

pub fn find_transition(from: BookingStatus, to: BookingStatus) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|edge| edge.from == from && edge.to == to)
}

/// Decides whether `actor` may move a booking owned by `owner` from `from` to `to`.
///
/// A missing edge is reported as `InvalidTransition` regardless of role; an
/// existing edge the actor may not take is `Forbidden`.
pub fn check_transition(
    actor: &Identity,
    owner: UserId,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<&'static Transition> {
    let edge = find_transition(from, to).ok_or_else(|| BookingError::InvalidTransition {
        from,
        to,
        allowed: from.allowed_next(),
    })?;

    if edge.permit.allows(actor, owner) {
        Ok(edge)
    } else {
        Err(BookingError::Forbidden(format!(
            "role '{}' may not move a booking from {} to {}",
            actor.role, from, to
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub vehicle_id: VehicleId,
    pub date: NaiveDate,
    pub time_from: NaiveTime,
    pub time_to: NaiveTime,
    /// Minutes, copied from the service.
    pub duration: u32,
    /// Price snapshot taken at creation.
    pub total_amount: Price,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Moves to `status` and advances `updated_at`.
    ///
    /// Legality is the caller's concern, see [`check_transition`].
    pub(crate) fn set_status(&mut self, status: BookingStatus, now: DateTime<Utc>) {
        self.status = status;
        self.touch(now);
    }

    /// `updated_at` must strictly advance even when the clock does not.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at + TimeDelta::microseconds(1);
        self.updated_at = now.max(floor);
    }
}

/// The unit of persistence: a booking and its payment, written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking: Booking,
    pub payment: Option<Payment>,
}

impl BookingRecord {
    pub fn id(&self) -> BookingId {
        self.booking.id
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment.as_ref().map(|p| p.payment_status)
    }

    /// Applies an already-authorised move, including the payment side effect
    /// of completing a booking.
    pub(crate) fn apply(&mut self, to: BookingStatus, now: DateTime<Utc>) {
        self.booking.set_status(to, now);
        if to == BookingStatus::Complete
            && let Some(payment) = self.payment.as_mut()
        {
            payment.mark_completed(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn caller(role: Role) -> Identity {
        Identity::new(UserId::new(), role)
    }

    #[test]
    fn test_allowed_next_follows_table() {
        assert_eq!(
            BookingStatus::Pending.allowed_next(),
            vec![BookingStatus::Confirmed, BookingStatus::Cancelled]
        );
        assert_eq!(
            BookingStatus::Confirmed.allowed_next(),
            vec![BookingStatus::StartService, BookingStatus::Cancelled]
        );
        assert_eq!(
            BookingStatus::StartService.allowed_next(),
            vec![BookingStatus::Complete]
        );
        assert!(BookingStatus::Complete.allowed_next().is_empty());
        assert!(BookingStatus::Cancelled.allowed_next().is_empty());
    }

    #[test]
    fn test_skipping_confirmed_is_invalid_even_for_admin() {
        let admin = caller(Role::Admin);
        let result = check_transition(
            &admin,
            UserId::new(),
            BookingStatus::Pending,
            BookingStatus::StartService,
        );
        match result {
            Err(BookingError::InvalidTransition { from, to, allowed }) => {
                assert_eq!(from, BookingStatus::Pending);
                assert_eq!(to, BookingStatus::StartService);
                assert_eq!(allowed, BookingStatus::Pending.allowed_next());
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_confirmed_cancel_is_admin_only() {
        let owner = UserId::new();
        let staff = caller(Role::Staff);
        let admin = caller(Role::Admin);
        let user = Identity::new(owner, Role::User);

        for actor in [staff, user] {
            assert!(matches!(
                check_transition(
                    &actor,
                    owner,
                    BookingStatus::Confirmed,
                    BookingStatus::Cancelled
                ),
                Err(BookingError::Forbidden(_))
            ));
        }
        assert!(
            check_transition(
                &admin,
                owner,
                BookingStatus::Confirmed,
                BookingStatus::Cancelled
            )
            .is_ok()
        );
    }

    #[test]
    fn test_pending_cancel_owner_or_admin() {
        let owner = UserId::new();
        let as_owner = Identity::new(owner, Role::User);
        assert!(
            check_transition(
                &as_owner,
                owner,
                BookingStatus::Pending,
                BookingStatus::Cancelled
            )
            .is_ok()
        );
        assert!(matches!(
            check_transition(
                &caller(Role::User),
                owner,
                BookingStatus::Pending,
                BookingStatus::Cancelled
            ),
            Err(BookingError::Forbidden(_))
        ));
        assert!(matches!(
            check_transition(
                &caller(Role::Staff),
                owner,
                BookingStatus::Pending,
                BookingStatus::Cancelled
            ),
            Err(BookingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_random_triples_only_accept_table_edges() {
        let mut rng = StdRng::seed_from_u64(0x0b00_c1e5);
        for _ in 0..5_000 {
            let role = Role::ALL[rng.gen_range(0..Role::ALL.len())];
            let from = BookingStatus::ALL[rng.gen_range(0..BookingStatus::ALL.len())];
            let to = BookingStatus::ALL[rng.gen_range(0..BookingStatus::ALL.len())];
            let owns = rng.gen_bool(0.5);

            let actor = caller(role);
            let owner = if owns { actor.user_id } else { UserId::new() };
            let result = check_transition(&actor, owner, from, to);

            match find_transition(from, to) {
                None => assert!(
                    matches!(result, Err(BookingError::InvalidTransition { .. })),
                    "{:?} {} -> {} should be invalid",
                    role,
                    from,
                    to
                ),
                Some(edge) => {
                    assert_eq!(result.is_ok(), edge.permit.allows(&actor, owner));
                    if result.is_err() {
                        assert!(matches!(result, Err(BookingError::Forbidden(_))));
                    }
                }
            }
        }
    }

    #[test]
    fn test_touch_strictly_advances() {
        let now = Utc::now();
        let mut booking = Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            service_id: ServiceId::new(),
            vehicle_id: VehicleId::new(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            time_from: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            time_to: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            duration: 30,
            total_amount: Price::ZERO,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        booking.set_status(BookingStatus::Confirmed, now);
        assert!(booking.updated_at > booking.created_at);
        assert_eq!(booking.created_at, now);
    }
}
