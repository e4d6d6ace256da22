//! Reservation lifecycle: request, host sign-off, payment and stay stages

use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use super::{
    availability::AvailabilityService,
    booking::BookingValidator,
    commission::CommissionService,
    notifications::{notify_quietly, NotificationService, NotificationTemplate, Recipient},
    payment::PaymentProcessor,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{PaymentState, ReservationStatus},
        rejection::{NewRejectionRecord, RejectionRecord},
        reservation::{
            CreateReservation, HostSignoff, NewReservation, PaymentHold, Reservation, StatusTransition,
        },
        stay::StayRange,
        unit::RentableUnit,
    },
    repository::BookingStore,
};

/// Give back whatever the guest was charged or holds.
///
/// An authorized hold is voided, a captured payment is refunded. Returns
/// the payment state to persist.
pub async fn release_payment(payments: &dyn PaymentProcessor, hold: &PaymentHold) -> AppResult<PaymentState> {
    match (hold.state, hold.reference.as_deref()) {
        (PaymentState::Authorized, Some(hold_id)) => {
            payments
                .void(hold_id)
                .await
                .map_err(|e| AppError::PaymentRefundFailed(format!("void of hold {}: {}", hold_id, e)))?;
            Ok(PaymentState::Voided)
        }
        (PaymentState::Captured, Some(hold_id)) => {
            payments
                .refund(hold_id)
                .await
                .map_err(|e| AppError::PaymentRefundFailed(format!("refund of hold {}: {}", hold_id, e)))?;
            Ok(PaymentState::Refunded)
        }
        (state, _) => Ok(state),
    }
}

fn reservation_data(reservation: &Reservation) -> Value {
    json!({
        "reservation_id": reservation.id,
        "unit_id": reservation.unit_id,
        "start_date": reservation.start_date.to_string(),
        "end_date": reservation.end_date.to_string(),
        "guest_count": reservation.guest_count,
        "status": reservation.status.to_string(),
        "total": reservation.pricing.split.client_pays.to_string(),
        "currency": reservation.pricing.currency().iso_code(),
    })
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn BookingStore>,
    validator: BookingValidator,
    availability: AvailabilityService,
    commission: CommissionService,
    payments: Arc<dyn PaymentProcessor>,
    notifier: Arc<dyn NotificationService>,
}

impl ReservationService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        validator: BookingValidator,
        availability: AvailabilityService,
        commission: CommissionService,
        payments: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            store,
            validator,
            availability,
            commission,
            payments,
            notifier,
        }
    }

    async fn load(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.store
            .find_reservation(reservation_id)
            .await?
            .ok_or(AppError::ReservationNotFound(reservation_id))
    }

    async fn load_unit(&self, unit_id: i32) -> AppResult<RentableUnit> {
        self.store
            .find_unit(unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(unit_id))
    }

    /// Send in the background; the caller never waits on delivery
    fn notify(&self, template: NotificationTemplate, recipient: Recipient, data: Value) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            notify_quietly(notifier.as_ref(), template, recipient, data).await;
        });
    }

    /// Persist a payment release whose status write failed, so a retry
    /// does not void or refund the same hold twice
    async fn record_payment_state(&self, reservation: &Reservation, payment_state: PaymentState) {
        if payment_state == reservation.payment.state {
            return;
        }
        let hold = reservation.payment.reference.as_deref().unwrap_or("-");
        tracing::error!(
            "Hold {} of reservation {} is now {:?} but its status write failed",
            hold,
            reservation.id,
            payment_state
        );
        match self.store.update_payment_state(reservation.id, payment_state).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::error!(
                "Reservation {} vanished before recording hold {}",
                reservation.id,
                hold
            ),
            Err(e) => tracing::error!(
                "Failed to record {:?} for hold {} of reservation {}: {}",
                payment_state,
                hold,
                reservation.id,
                e
            ),
        }
    }

    /// Withdraw a request whose captured payment was handed back
    async fn withdraw_refunded(&self, reservation: &Reservation) {
        let withdrawn = self
            .transition(
                reservation,
                StatusTransition {
                    from: reservation.status,
                    to: ReservationStatus::Cancel,
                    signoff: reservation.signoff,
                    payment_state: PaymentState::Refunded,
                },
            )
            .await;
        if let Err(e) = withdrawn {
            tracing::warn!("Could not cancel refunded reservation {}: {}", reservation.id, e);
            self.record_payment_state(reservation, PaymentState::Refunded).await;
        }
    }

    /// Apply a guarded transition, failing if the reservation moved meanwhile
    async fn transition(&self, reservation: &Reservation, transition: StatusTransition) -> AppResult<Reservation> {
        let updated = self
            .store
            .update_reservation_status(reservation.id, &transition)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "reservation {} is no longer {}",
                    reservation.id, transition.from
                ))
            })?;
        self.availability.invalidate_unit(updated.unit_id).await;
        tracing::info!(
            "Reservation {} moved from {} to {}",
            updated.id,
            transition.from,
            updated.status
        );
        Ok(updated)
    }

    /// Request a stay: validate, price, hold the guest's payment, then persist.
    ///
    /// The hold is voided if the reservation cannot be written, so a failed
    /// request never leaves money held.
    pub async fn create_reservation(&self, request: CreateReservation) -> AppResult<Reservation> {
        request
            .validate()
            .map_err(|e| AppError::MissingParameters(e.to_string()))?;

        if let Some(problem) = self
            .validator
            .problems_from_store(
                request.unit_id,
                request.start_date,
                request.end_date,
                request.guest_count,
            )
            .await?
            .into_iter()
            .next()
        {
            return Err(problem.into_error(self.validator.lang()));
        }

        let stay = StayRange::new(request.start_date, request.end_date)?;
        let unit = self.load_unit(request.unit_id).await?;
        let pricing = self.commission.quote_unit(&unit, stay).await?;

        let hold_id = self
            .payments
            .authorize(pricing.split.client_pays, unit.currency)
            .await
            .map_err(|e| AppError::PaymentAuthorizationFailed(e.to_string()))?;

        let (status, signoff) = if unit.auto_accept {
            (ReservationStatus::Reserved, HostSignoff::GRANTED)
        } else {
            (ReservationStatus::Waiting, HostSignoff::PENDING)
        };

        let new_reservation = NewReservation {
            unit_id: unit.id,
            guest_id: request.guest_id,
            stay,
            guest_count: request.guest_count,
            status,
            signoff,
            payment: PaymentHold {
                reference: Some(hold_id.clone()),
                state: PaymentState::Authorized,
            },
            pricing,
        };

        let reservation = match self.store.create_reservation(&new_reservation).await {
            Ok(reservation) => reservation,
            Err(e) => {
                if let Err(void_err) = self.payments.void(&hold_id).await {
                    tracing::error!(
                        "Failed to void hold {} after reservation insert failed: {}",
                        hold_id,
                        void_err
                    );
                }
                return Err(e);
            }
        };

        self.availability.invalidate_unit(unit.id).await;
        tracing::info!(
            "Created reservation {} on unit {} for {} as {}",
            reservation.id,
            unit.id,
            stay,
            reservation.status
        );

        let data = reservation_data(&reservation);
        self.notify(NotificationTemplate::BookingRequested, Recipient::User(unit.owner_id), data.clone());
        self.notify(NotificationTemplate::BookingRequested, Recipient::Admins, data.clone());
        if unit.auto_accept {
            self.notify(NotificationTemplate::BookingConfirmed, Recipient::User(reservation.guest_id), data);
        }

        Ok(reservation)
    }

    /// Host accepts a pending request; status stays WAITING until approval
    pub async fn confirm_by_host(&self, reservation_id: i32, caller_id: i32) -> AppResult<Reservation> {
        let reservation = self.load(reservation_id).await?;
        let unit = self.load_unit(reservation.unit_id).await?;
        if !unit.is_owned_by(caller_id) {
            return Err(AppError::AuthorizationDenied(format!(
                "user {} does not own unit {}",
                caller_id, unit.id
            )));
        }
        if reservation.status != ReservationStatus::Waiting {
            return Err(AppError::InvalidState(format!(
                "only WAITING reservations can be confirmed, {} is {}",
                reservation.id, reservation.status
            )));
        }

        let updated = self
            .transition(
                &reservation,
                StatusTransition {
                    from: ReservationStatus::Waiting,
                    to: ReservationStatus::Waiting,
                    signoff: HostSignoff::GRANTED,
                    payment_state: reservation.payment.state,
                },
            )
            .await?;

        self.notify(
            NotificationTemplate::BookingConfirmed,
            Recipient::User(updated.guest_id),
            reservation_data(&updated),
        );
        Ok(updated)
    }

    /// Capture the held payment and reserve the stay.
    ///
    /// If the stay can no longer be reserved the capture is refunded and the
    /// request is cancelled.
    pub async fn approve_reservation(&self, reservation_id: i32) -> AppResult<Reservation> {
        let reservation = self.load(reservation_id).await?;
        if !matches!(
            reservation.status,
            ReservationStatus::Waiting | ReservationStatus::Reserved
        ) {
            return Err(AppError::InvalidState(format!(
                "reservation {} is {} and cannot be approved",
                reservation.id, reservation.status
            )));
        }
        let hold_id = match (reservation.payment.state, reservation.payment.reference.as_deref()) {
            (PaymentState::Authorized, Some(hold_id)) => hold_id.to_string(),
            (state, _) => {
                return Err(AppError::InvalidState(format!(
                    "reservation {} has no authorized payment hold ({:?})",
                    reservation.id, state
                )))
            }
        };

        self.payments
            .capture(&hold_id)
            .await
            .map_err(|e| AppError::PaymentCaptureFailed(e.to_string()))?;

        let result = self
            .transition(
                &reservation,
                StatusTransition {
                    from: reservation.status,
                    to: ReservationStatus::Reserved,
                    signoff: HostSignoff::GRANTED,
                    payment_state: PaymentState::Captured,
                },
            )
            .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                match self.payments.refund(&hold_id).await {
                    Ok(()) => self.withdraw_refunded(&reservation).await,
                    Err(refund_err) => {
                        tracing::error!(
                            "Failed to refund captured hold {} after approval of reservation {} failed: {}",
                            hold_id,
                            reservation.id,
                            refund_err
                        );
                        self.record_payment_state(&reservation, PaymentState::Captured)
                            .await;
                    }
                }
                return Err(e);
            }
        };

        self.notify(
            NotificationTemplate::BookingApproved,
            Recipient::User(updated.guest_id),
            reservation_data(&updated),
        );
        Ok(updated)
    }

    /// Host turns down a pending request; the guest's hold is released and
    /// a rejection record is left for admins
    pub async fn reject_reservation(
        &self,
        reservation_id: i32,
        caller_id: i32,
        reason_code: &str,
        message: Option<String>,
    ) -> AppResult<RejectionRecord> {
        let reservation = self.load(reservation_id).await?;
        let unit = self.load_unit(reservation.unit_id).await?;
        if !unit.is_owned_by(caller_id) {
            return Err(AppError::AuthorizationDenied(format!(
                "user {} does not own unit {}",
                caller_id, unit.id
            )));
        }
        if reservation.status != ReservationStatus::Waiting {
            return Err(AppError::InvalidState(format!(
                "only WAITING reservations can be rejected, {} is {}",
                reservation.id, reservation.status
            )));
        }

        let payment_state = release_payment(self.payments.as_ref(), &reservation.payment).await?;

        let written = self
            .store
            .create_rejection_record(
                &NewRejectionRecord {
                    rent_id: reservation.id,
                    host_id: caller_id,
                    guest_id: reservation.guest_id,
                    reason_code: reason_code.to_string(),
                    message,
                },
                payment_state,
            )
            .await;
        let record = match written {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.record_payment_state(&reservation, payment_state).await;
                return Err(AppError::InvalidState(format!(
                    "reservation {} is no longer WAITING",
                    reservation.id
                )));
            }
            Err(e) => {
                self.record_payment_state(&reservation, payment_state).await;
                return Err(e);
            }
        };

        self.availability.invalidate_unit(reservation.unit_id).await;
        tracing::info!(
            "Reservation {} rejected by host {} ({})",
            reservation.id,
            caller_id,
            record.reason_code
        );

        let mut data = reservation_data(&reservation);
        data["reason_code"] = Value::String(record.reason_code.clone());
        self.notify(
            NotificationTemplate::BookingRejected,
            Recipient::User(reservation.guest_id),
            data.clone(),
        );
        self.notify(NotificationTemplate::BookingRejected, Recipient::Admins, data);

        Ok(record)
    }

    pub async fn cancel_reservation(&self, reservation_id: i32) -> AppResult<Reservation> {
        let reservation = self.load(reservation_id).await?;
        if !reservation.status.is_cancellable() {
            return Err(AppError::InvalidState(format!(
                "reservation {} is {} and cannot be cancelled",
                reservation.id, reservation.status
            )));
        }

        let payment_state = release_payment(self.payments.as_ref(), &reservation.payment).await?;

        let cancelled = self
            .transition(
                &reservation,
                StatusTransition {
                    from: reservation.status,
                    to: ReservationStatus::Cancel,
                    signoff: reservation.signoff,
                    payment_state,
                },
            )
            .await;
        let updated = match cancelled {
            Ok(updated) => updated,
            Err(e) => {
                self.record_payment_state(&reservation, payment_state).await;
                return Err(e);
            }
        };

        self.notify(
            NotificationTemplate::BookingCancelled,
            Recipient::User(updated.guest_id),
            reservation_data(&updated),
        );
        Ok(updated)
    }

    /// Move a reserved stay to check-in, or a checked-in stay to check-out
    pub async fn advance_reservation_status(
        &self,
        reservation_id: i32,
        target: ReservationStatus,
    ) -> AppResult<Reservation> {
        let reservation = self.load(reservation_id).await?;
        if reservation.status.next_stage() != Some(target) {
            return Err(AppError::InvalidState(format!(
                "reservation {} cannot advance from {} to {}",
                reservation.id, reservation.status, target
            )));
        }

        let updated = self
            .transition(
                &reservation,
                StatusTransition {
                    from: reservation.status,
                    to: target,
                    signoff: reservation.signoff,
                    payment_state: reservation.payment.state,
                },
            )
            .await?;

        if updated.status == ReservationStatus::CheckOut {
            self.notify(
                NotificationTemplate::ReviewRequest,
                Recipient::User(updated.guest_id),
                reservation_data(&updated),
            );
        }
        Ok(updated)
    }
}
