use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio_test::{assert_err, assert_ok};

use rental_engine::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        availability::{AvailabilityDecision, AvailabilityKey, AvailabilityMetadata, UnavailableReason},
        enums::{Currency, PaymentState, ReservationStatus},
        reservation::{CreateReservation, HostSignoff, Reservation},
    },
    services::{
        cache::{AvailabilityCache, MemoryAvailabilityCache},
        notifications::{NotificationService, NotificationTemplate, Recipient},
        Services,
    },
};

use crate::common::{d, harness, stay, unit, FakePayments, Harness, InMemoryStore, PaymentCall, ADMIN, GUEST, HOST};

fn june_request(unit_id: i32) -> CreateReservation {
    CreateReservation {
        unit_id,
        guest_id: GUEST,
        start_date: d(2025, 6, 10),
        end_date: d(2025, 6, 12),
        guest_count: 2,
    }
}

fn with_unit(capacity_rooms: i32, auto_accept: bool) -> Harness {
    let h = harness();
    let mut listing = unit(1, capacity_rooms);
    listing.auto_accept = auto_accept;
    h.store.add_unit(listing);
    h
}

async fn requested(h: &Harness) -> Reservation {
    h.services
        .reservations
        .create_reservation(june_request(1))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_holds_payment_and_waits_for_host() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    assert_eq!(reservation.status, ReservationStatus::Waiting);
    assert_eq!(reservation.signoff, HostSignoff::PENDING);
    assert_eq!(reservation.payment.state, PaymentState::Authorized);
    assert_eq!(reservation.payment.reference.as_deref(), Some("hold_1"));
    // 200 for two nights plus 5% guest commission
    assert_eq!(reservation.pricing.split.client_pays, dec!(210));
    assert_eq!(h.payments.calls(), vec![PaymentCall::Authorize(dec!(210), Currency::Eur)]);

    let sent = h.notifier.sent().await;
    assert!(sent.contains(&(NotificationTemplate::BookingRequested, Recipient::User(HOST))));
    assert!(sent.contains(&(NotificationTemplate::BookingRequested, Recipient::Admins)));
}

#[tokio::test]
async fn test_waiting_request_does_not_take_the_room() {
    let h = with_unit(1, false);
    requested(&h).await;

    let decision = h
        .services
        .availability
        .check_availability(1, d(2025, 6, 10), d(2025, 6, 12))
        .await
        .unwrap();
    assert!(decision.available);
}

#[tokio::test]
async fn test_auto_accept_reserves_immediately() {
    let h = with_unit(1, true);
    let reservation = requested(&h).await;

    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert!(reservation.signoff.is_granted());
    assert_eq!(reservation.payment.state, PaymentState::Authorized);
    assert!(h
        .notifier
        .sent()
        .await
        .contains(&(NotificationTemplate::BookingConfirmed, Recipient::User(GUEST))));
}

#[tokio::test]
async fn test_create_invalidates_cached_availability() {
    let h = with_unit(1, true);
    let before = h
        .services
        .availability
        .check_availability(1, d(2025, 6, 10), d(2025, 6, 12))
        .await
        .unwrap();
    assert!(before.available);
    assert_eq!(h.cache.len(), 1);

    requested(&h).await;
    assert!(h.cache.is_empty());

    let after = h
        .services
        .availability
        .check_availability(1, d(2025, 6, 10), d(2025, 6, 12))
        .await
        .unwrap();
    assert!(!after.available);
}

#[tokio::test]
async fn test_stale_cached_refusal_does_not_block_a_request() {
    let h = with_unit(1, false);
    let june = stay(d(2025, 6, 10), d(2025, 6, 12));
    let stale = AvailabilityDecision {
        available: false,
        reason: Some(UnavailableReason::FullyBooked),
        metadata: AvailabilityMetadata {
            booked: 1,
            capacity: 1,
            blocked: false,
        },
        written_at: Utc::now(),
    };
    h.cache
        .set(&AvailabilityKey::new(1, &june), &stale, Duration::from_secs(300))
        .await
        .unwrap();

    // Lookups still see the cached answer
    let problems = h
        .services
        .validator
        .validate_booking(1, d(2025, 6, 10), d(2025, 6, 12), 2)
        .await
        .unwrap();
    assert_eq!(problems.len(), 1);

    let reservation = assert_ok!(h.services.reservations.create_reservation(june_request(1)).await);
    assert_eq!(reservation.status, ReservationStatus::Waiting);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_create_on_unavailable_dates_never_touches_payment() {
    let h = with_unit(1, false);
    h.store.seed_reserved(1, d(2025, 6, 11), d(2025, 6, 14));

    let err = assert_err!(h.services.reservations.create_reservation(june_request(1)).await);
    assert!(matches!(err, AppError::NotAvailable(_)));
    assert!(h.payments.calls().is_empty());
}

#[tokio::test]
async fn test_create_rejects_guest_count() {
    let h = with_unit(1, false);
    let mut request = june_request(1);
    request.guest_count = 6;

    let err = assert_err!(h.services.reservations.create_reservation(request).await);
    assert!(matches!(
        err,
        AppError::GuestCountOutOfRange {
            requested: 6,
            min: 1,
            max: 4
        }
    ));

    let mut request = june_request(1);
    request.guest_count = 0;
    let err = assert_err!(h.services.reservations.create_reservation(request).await);
    assert!(matches!(err, AppError::MissingParameters(_)));
}

#[tokio::test]
async fn test_declined_authorization_leaves_no_reservation() {
    let h = with_unit(1, false);
    h.payments.decline_authorize();

    let err = assert_err!(h.services.reservations.create_reservation(june_request(1)).await);
    assert!(matches!(err, AppError::PaymentAuthorizationFailed(_)));
    assert_eq!(h.store.reservation_count(), 0);
}

#[tokio::test]
async fn test_failed_insert_voids_the_hold() {
    let h = with_unit(1, false);
    h.store.fail_next_insert();

    assert_err!(h.services.reservations.create_reservation(june_request(1)).await);
    assert_eq!(
        h.payments.calls(),
        vec![
            PaymentCall::Authorize(dec!(210), Currency::Eur),
            PaymentCall::Void("hold_1".to_string()),
        ]
    );
    assert_eq!(h.store.reservation_count(), 0);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_booking() {
    let h = with_unit(1, false);
    h.notifier.fail_all();

    let reservation = assert_ok!(h.services.reservations.create_reservation(june_request(1)).await);
    assert_eq!(reservation.status, ReservationStatus::Waiting);
}

struct StalledNotifier;

#[async_trait]
impl NotificationService for StalledNotifier {
    async fn send(&self, _template: NotificationTemplate, _recipient: Recipient, _data: Value) -> AppResult<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_slow_notifier_does_not_hold_up_booking() {
    let store = Arc::new(InMemoryStore::default());
    store.add_unit(unit(1, 1));
    let services = Services::new(
        store.clone(),
        Arc::new(MemoryAvailabilityCache::new()),
        Arc::new(FakePayments::default()),
        Arc::new(StalledNotifier),
        &AppConfig::default(),
    );

    let created = tokio::time::timeout(
        Duration::from_secs(5),
        services.reservations.create_reservation(june_request(1)),
    )
    .await
    .expect("create waited on notification delivery");
    let reservation = assert_ok!(created);

    let rejected = tokio::time::timeout(
        Duration::from_secs(5),
        services
            .reservations
            .reject_reservation(reservation.id, HOST, "dates_unavailable", None),
    )
    .await
    .expect("reject waited on notification delivery");
    assert_ok!(rejected);
}

#[tokio::test]
async fn test_host_confirmation() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let err = assert_err!(h.services.reservations.confirm_by_host(reservation.id, GUEST).await);
    assert!(matches!(err, AppError::AuthorizationDenied(_)));

    let confirmed = assert_ok!(h.services.reservations.confirm_by_host(reservation.id, HOST).await);
    assert_eq!(confirmed.status, ReservationStatus::Waiting);
    assert_eq!(confirmed.signoff, HostSignoff::GRANTED);
}

#[tokio::test]
async fn test_approve_captures_and_reserves() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let approved = assert_ok!(h.services.reservations.approve_reservation(reservation.id).await);
    assert_eq!(approved.status, ReservationStatus::Reserved);
    assert!(approved.signoff.is_granted());
    assert_eq!(approved.payment.state, PaymentState::Captured);
    assert!(h.payments.calls().contains(&PaymentCall::Capture("hold_1".to_string())));

    // Nothing left to capture
    let err = assert_err!(h.services.reservations.approve_reservation(reservation.id).await);
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_capture_failure_keeps_request_waiting() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;
    h.payments.decline_capture();

    let err = assert_err!(h.services.reservations.approve_reservation(reservation.id).await);
    assert!(matches!(err, AppError::PaymentCaptureFailed(_)));
    assert_eq!(
        h.store.reservation(reservation.id).unwrap().status,
        ReservationStatus::Waiting
    );
}

#[tokio::test]
async fn test_only_one_of_two_competing_requests_is_approved() {
    let h = with_unit(1, false);
    let first = requested(&h).await;
    let second = requested(&h).await;

    assert_ok!(h.services.reservations.approve_reservation(first.id).await);

    let err = assert_err!(h.services.reservations.approve_reservation(second.id).await);
    assert!(matches!(err, AppError::NotAvailable(_)));

    // Captured, given back, and the losing request withdrawn
    let stored = h.store.reservation(second.id).unwrap();
    assert_eq!(stored.status, ReservationStatus::Cancel);
    assert_eq!(stored.payment.state, PaymentState::Refunded);

    let err = assert_err!(h.services.reservations.cancel_reservation(second.id).await);
    assert!(matches!(err, AppError::InvalidState(_)));
    let hold_2: Vec<PaymentCall> = h
        .payments
        .calls()
        .into_iter()
        .filter(|call| match call {
            PaymentCall::Capture(hold) | PaymentCall::Refund(hold) | PaymentCall::Void(hold) => hold == "hold_2",
            PaymentCall::Authorize(..) => false,
        })
        .collect();
    assert_eq!(
        hold_2,
        vec![
            PaymentCall::Capture("hold_2".to_string()),
            PaymentCall::Refund("hold_2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failed_cancel_write_keeps_the_refund_on_record() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;
    h.services.reservations.approve_reservation(reservation.id).await.unwrap();

    h.store.fail_next_status_write();
    let err = assert_err!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert!(matches!(err, AppError::Internal(_)));

    let stored = h.store.reservation(reservation.id).unwrap();
    assert_eq!(stored.status, ReservationStatus::Reserved);
    assert_eq!(stored.payment.state, PaymentState::Refunded);

    // Retrying finishes the cancellation without paying the guest twice
    let cancelled = assert_ok!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert_eq!(cancelled.status, ReservationStatus::Cancel);
    assert_eq!(cancelled.payment.state, PaymentState::Refunded);
    let refunds = h
        .payments
        .calls()
        .into_iter()
        .filter(|call| matches!(call, PaymentCall::Refund(_)))
        .count();
    assert_eq!(refunds, 1);
}

#[tokio::test]
async fn test_failed_rejection_write_keeps_the_void_on_record() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    h.store.fail_next_status_write();
    assert_err!(
        h.services
            .reservations
            .reject_reservation(reservation.id, HOST, "dates_unavailable", None)
            .await
    );
    let stored = h.store.reservation(reservation.id).unwrap();
    assert_eq!(stored.status, ReservationStatus::Waiting);
    assert_eq!(stored.payment.state, PaymentState::Voided);
    assert!(h.store.rejections_for(reservation.id).is_empty());

    assert_ok!(
        h.services
            .reservations
            .reject_reservation(reservation.id, HOST, "dates_unavailable", None)
            .await
    );
    let voids = h
        .payments
        .calls()
        .into_iter()
        .filter(|call| matches!(call, PaymentCall::Void(_)))
        .count();
    assert_eq!(voids, 1);
    assert_eq!(h.store.rejections_for(reservation.id).len(), 1);
}

#[tokio::test]
async fn test_rejection_is_irreversible() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let record = assert_ok!(
        h.services
            .reservations
            .reject_reservation(reservation.id, HOST, "dates_unavailable", Some("Closed for works".to_string()))
            .await
    );
    assert_eq!(record.rent_id, reservation.id);
    assert_eq!(record.host_id, HOST);
    assert_eq!(record.guest_id, GUEST);
    assert!(!record.resolved);

    let stored = h.store.reservation(reservation.id).unwrap();
    assert_eq!(stored.status, ReservationStatus::Cancel);
    assert_eq!(stored.payment.state, PaymentState::Voided);
    assert!(h.payments.calls().contains(&PaymentCall::Void("hold_1".to_string())));

    let err = assert_err!(
        h.services
            .reservations
            .reject_reservation(reservation.id, HOST, "dates_unavailable", None)
            .await
    );
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(h.store.rejections_for(reservation.id).len(), 1);

    let sent = h.notifier.sent().await;
    assert!(sent.contains(&(NotificationTemplate::BookingRejected, Recipient::User(GUEST))));
    assert!(sent.contains(&(NotificationTemplate::BookingRejected, Recipient::Admins)));
}

#[tokio::test]
async fn test_only_owner_may_reject() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let err = assert_err!(
        h.services
            .reservations
            .reject_reservation(reservation.id, GUEST, "spam", None)
            .await
    );
    assert!(matches!(err, AppError::AuthorizationDenied(_)));
    assert!(h.store.rejections_for(reservation.id).is_empty());
}

#[tokio::test]
async fn test_cancel_voids_an_uncaptured_hold() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let cancelled = assert_ok!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert_eq!(cancelled.status, ReservationStatus::Cancel);
    assert_eq!(cancelled.payment.state, PaymentState::Voided);
    assert!(!h.payments.calls().iter().any(|c| matches!(c, PaymentCall::Refund(_))));
}

#[tokio::test]
async fn test_cancel_refunds_a_captured_payment() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;
    h.services.reservations.approve_reservation(reservation.id).await.unwrap();

    let cancelled = assert_ok!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert_eq!(cancelled.payment.state, PaymentState::Refunded);
    assert!(h.payments.calls().contains(&PaymentCall::Refund("hold_1".to_string())));
    assert!(h
        .notifier
        .sent()
        .await
        .contains(&(NotificationTemplate::BookingCancelled, Recipient::User(GUEST))));

    // The room is free again
    let decision = h
        .services
        .availability
        .check_availability(1, d(2025, 6, 10), d(2025, 6, 12))
        .await
        .unwrap();
    assert!(decision.available);

    let err = assert_err!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_stay_stages_advance_in_order() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;

    let err = assert_err!(
        h.services
            .reservations
            .advance_reservation_status(reservation.id, ReservationStatus::CheckIn)
            .await
    );
    assert!(matches!(err, AppError::InvalidState(_)));

    h.services.reservations.approve_reservation(reservation.id).await.unwrap();

    let err = assert_err!(
        h.services
            .reservations
            .advance_reservation_status(reservation.id, ReservationStatus::CheckOut)
            .await
    );
    assert!(matches!(err, AppError::InvalidState(_)));

    let checked_in = assert_ok!(
        h.services
            .reservations
            .advance_reservation_status(reservation.id, ReservationStatus::CheckIn)
            .await
    );
    assert_eq!(checked_in.status, ReservationStatus::CheckIn);

    let checked_out = assert_ok!(
        h.services
            .reservations
            .advance_reservation_status(reservation.id, ReservationStatus::CheckOut)
            .await
    );
    assert_eq!(checked_out.status, ReservationStatus::CheckOut);
    assert!(h
        .notifier
        .sent()
        .await
        .contains(&(NotificationTemplate::ReviewRequest, Recipient::User(GUEST))));

    let err = assert_err!(h.services.reservations.cancel_reservation(reservation.id).await);
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_unknown_reservation() {
    let h = with_unit(1, false);
    let err = assert_err!(h.services.reservations.cancel_reservation(404).await);
    assert!(matches!(err, AppError::ReservationNotFound(404)));
}

#[tokio::test]
async fn test_resolving_a_rejection_is_idempotent() {
    let h = with_unit(1, false);
    let reservation = requested(&h).await;
    let record = h
        .services
        .reservations
        .reject_reservation(reservation.id, HOST, "dates_unavailable", None)
        .await
        .unwrap();

    assert_eq!(h.services.rejections.list_unresolved().await.unwrap().len(), 1);

    let first = assert_ok!(h.services.rejections.resolve_rejection(record.id, ADMIN).await);
    assert!(first.resolved);
    assert_eq!(first.resolved_by, Some(ADMIN));

    let again = assert_ok!(h.services.rejections.resolve_rejection(record.id, ADMIN + 1).await);
    assert_eq!(again, first);
    assert!(h.services.rejections.list_unresolved().await.unwrap().is_empty());

    let err = assert_err!(h.services.rejections.resolve_rejection(9999, ADMIN).await);
    assert!(matches!(err, AppError::RejectionNotFound(9999)));
}
