mod common;

use common::Fixture;
use rust_decimal_macros::dec;
use std::sync::Arc;
use washbay::domain::booking::BookingStatus;
use washbay::domain::money::Price;
use washbay::domain::payment::{PaymentMethod, PaymentStatus};
use washbay::error::BookingError;

#[tokio::test]
async fn test_booking_snapshots_price_into_single_payment() {
    let fx = Fixture::new().await;
    let result = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap();
    assert_eq!(result.status, BookingStatus::Pending);
    assert_eq!(result.payment_method, PaymentMethod::Stripe);

    // Reprice after booking.
    let mut repriced = fx.wash.clone();
    repriced.price = Price::new(dec!(99.00)).unwrap();
    fx.service.catalog().put_service(repriced).await.unwrap();

    let detail = fx
        .service
        .get_booking(&fx.customer, result.booking_id)
        .await
        .unwrap();
    assert_eq!(detail.summary.total_amount.value(), dec!(25.00));
    let payment = detail.payment.unwrap();
    assert_eq!(payment.amount.value(), dec!(25.00));
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.id, result.payment_id);
}

#[tokio::test]
async fn test_booking_someone_elses_vehicle_is_forbidden() {
    let fx = Fixture::new().await;
    let err = fx
        .service
        .create_booking(&fx.other_customer, fx.request())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
    assert!(
        fx.service
            .list_all_bookings(&fx.admin)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_booking_request_validation() {
    let fx = Fixture::new().await;

    let mut inverted = fx.request();
    std::mem::swap(&mut inverted.time_from, &mut inverted.time_to);
    let err = fx
        .service
        .create_booking(&fx.customer, inverted)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_failed");

    let mut wrong_type = fx.request();
    wrong_type.vehicle_id = fx.bike.id;
    let err = fx
        .service
        .create_booking(&fx.customer, wrong_type)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_failed");

    let mut unknown = fx.request();
    unknown.vehicle_id = washbay::domain::catalog::VehicleId::new();
    let err = fx
        .service
        .create_booking(&fx.customer, unknown)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn test_full_lifecycle_completes_payment_atomically() {
    let fx = Fixture::new().await;
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    for next in [
        BookingStatus::Confirmed,
        BookingStatus::StartService,
        BookingStatus::Complete,
    ] {
        let outcome = fx
            .service
            .transition_booking(&fx.staff, id, next)
            .await
            .unwrap();
        assert_eq!(outcome.new_status, next);
        assert_eq!(outcome.updated_by.username, "sam");
        assert_eq!(outcome.customer.username, "alice");
        if next == BookingStatus::Complete {
            assert_eq!(outcome.old_status, BookingStatus::StartService);
            assert_eq!(outcome.payment_status, Some(PaymentStatus::Completed));
        } else {
            assert_eq!(outcome.payment_status, Some(PaymentStatus::Pending));
        }
    }

    let record = fx.service.ledger().get(id).await.unwrap();
    assert_eq!(record.booking.status, BookingStatus::Complete);
    assert_eq!(record.payment_status(), Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn test_admin_cannot_skip_confirmation() {
    let fx = Fixture::new().await;
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    let err = fx
        .service
        .transition_booking(&fx.admin, id, BookingStatus::StartService)
        .await
        .unwrap_err();
    match err {
        BookingError::InvalidTransition { from, to, allowed } => {
            assert_eq!(from, BookingStatus::Pending);
            assert_eq!(to, BookingStatus::StartService);
            assert_eq!(
                allowed,
                vec![BookingStatus::Confirmed, BookingStatus::Cancelled]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_confirmed_cancel_needs_admin() {
    let fx = Fixture::new().await;
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    fx.service
        .transition_booking(&fx.staff, id, BookingStatus::Confirmed)
        .await
        .unwrap();

    let err = fx
        .service
        .transition_booking(&fx.staff, id, BookingStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let outcome = fx
        .service
        .transition_booking(&fx.admin, id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(outcome.old_status, BookingStatus::Confirmed);
    assert_eq!(outcome.new_status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_customer_cannot_drive_service_transitions() {
    let fx = Fixture::new().await;
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    let err = fx
        .service
        .transition_booking(&fx.customer, id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let err = fx
        .service
        .transition_booking(&fx.other_customer, id, BookingStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

#[tokio::test]
async fn test_self_cancellation_only_while_pending() {
    let fx = Fixture::new().await;
    let pending = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;
    let confirmed = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;
    fx.service
        .transition_booking(&fx.staff, confirmed, BookingStatus::Confirmed)
        .await
        .unwrap();

    let err = fx
        .service
        .cancel_own_booking(&fx.other_customer, pending)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let err = fx
        .service
        .cancel_own_booking(&fx.customer, confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));

    let ack = fx
        .service
        .cancel_own_booking(&fx.customer, pending)
        .await
        .unwrap();
    assert_eq!(ack.status, BookingStatus::Cancelled);

    let err = fx
        .service
        .cancel_own_booking(&fx.customer, pending)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_visibility_and_listing() {
    let fx = Fixture::new().await;
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    assert!(fx.service.get_booking(&fx.staff, id).await.is_ok());
    let err = fx
        .service
        .get_booking(&fx.other_customer, id)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    assert_eq!(fx.service.list_my_bookings(&fx.customer).await.unwrap().len(), 1);
    assert!(
        fx.service
            .list_my_bookings(&fx.other_customer)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(fx.service.list_my_bookings(&fx.admin).await.unwrap().len(), 1);

    let err = fx.service.list_all_bookings(&fx.staff).await.unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

#[tokio::test]
async fn test_racing_transitions_commit_exactly_one() {
    let fx = Arc::new(Fixture::new().await);
    let id = fx
        .service
        .create_booking(&fx.customer, fx.request())
        .await
        .unwrap()
        .booking_id;

    let confirm = {
        let fx = fx.clone();
        tokio::spawn(async move {
            fx.service
                .transition_booking(&fx.staff, id, BookingStatus::Confirmed)
                .await
        })
    };
    let cancel = {
        let fx = fx.clone();
        tokio::spawn(async move { fx.service.cancel_own_booking(&fx.customer, id).await })
    };
    let confirmed = confirm.await.unwrap();
    let cancelled = cancel.await.unwrap();

    assert!(confirmed.is_ok() != cancelled.is_ok());
    let status = fx.service.ledger().get(id).await.unwrap().booking.status;
    if confirmed.is_ok() {
        assert_eq!(status, BookingStatus::Confirmed);
    } else {
        assert_eq!(status, BookingStatus::Cancelled);
    }
}
