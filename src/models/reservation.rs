//! Reservation model and lifecycle transitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use validator::Validate;

use super::{
    commission::BookingQuote,
    enums::{PaymentState, ReservationStatus},
    stay::StayRange,
};
use crate::error::{AppError, AppResult};

/// Host sign-off, tracked independently of the lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostSignoff {
    pub accepted: bool,
    pub confirmed: bool,
}

impl HostSignoff {
    pub const PENDING: HostSignoff = HostSignoff {
        accepted: false,
        confirmed: false,
    };

    pub const GRANTED: HostSignoff = HostSignoff {
        accepted: true,
        confirmed: true,
    };

    pub fn is_granted(&self) -> bool {
        self.accepted && self.confirmed
    }
}

/// Checks that a status and a sign-off may coexist
pub fn check_combination(status: ReservationStatus, signoff: HostSignoff) -> AppResult<()> {
    if signoff.confirmed && !signoff.accepted {
        return Err(AppError::InvalidState(
            "a reservation cannot be confirmed without being accepted".to_string(),
        ));
    }
    let needs_signoff = matches!(
        status,
        ReservationStatus::Reserved | ReservationStatus::CheckIn | ReservationStatus::CheckOut
    );
    if needs_signoff && !signoff.is_granted() {
        return Err(AppError::InvalidState(format!(
            "status {} requires host sign-off",
            status
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHold {
    /// Processor hold id, kept after capture for refunds
    pub reference: Option<String>,
    pub state: PaymentState,
}

/// Reservation row as stored
#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    pub id: i32,
    pub unit_id: i32,
    pub guest_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guest_count: i32,
    pub status: i16,
    pub accepted: bool,
    pub confirmed: bool,
    pub payment_ref: Option<String>,
    pub payment_state: i16,
    pub pricing: Json<BookingQuote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i32,
    pub unit_id: i32,
    pub guest_id: i32,
    pub start_date: NaiveDate,
    /// Exclusive: the departure day
    pub end_date: NaiveDate,
    pub guest_count: i32,
    pub status: ReservationStatus,
    pub signoff: HostSignoff,
    pub payment: PaymentHold,
    pub pricing: BookingQuote,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            unit_id: row.unit_id,
            guest_id: row.guest_id,
            start_date: row.start_date,
            end_date: row.end_date,
            guest_count: row.guest_count,
            status: ReservationStatus::try_from(row.status)?,
            signoff: HostSignoff {
                accepted: row.accepted,
                confirmed: row.confirmed,
            },
            payment: PaymentHold {
                reference: row.payment_ref,
                state: PaymentState::try_from(row.payment_state)?,
            },
            pricing: row.pricing.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Reservation {
    pub fn stay(&self) -> AppResult<StayRange> {
        StayRange::new(self.start_date, self.end_date).map_err(|_| {
            AppError::Internal(format!("Reservation {} has an empty date range", self.id))
        })
    }
}

/// Booking request as received from the application layer
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservation {
    pub unit_id: i32,
    pub guest_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1, message = "at least one guest is required"))]
    pub guest_count: i32,
}

/// Insert payload handed to the store
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub unit_id: i32,
    pub guest_id: i32,
    pub stay: StayRange,
    pub guest_count: i32,
    pub status: ReservationStatus,
    pub signoff: HostSignoff,
    pub payment: PaymentHold,
    pub pricing: BookingQuote,
}

/// Conditional status/flag update: applied only while the row is in `from`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: ReservationStatus,
    pub to: ReservationStatus,
    pub signoff: HostSignoff,
    pub payment_state: PaymentState,
}

impl StatusTransition {
    pub fn validate(&self) -> AppResult<()> {
        let allowed = match (self.from, self.to) {
            (from, to) if from == to => from != ReservationStatus::Cancel,
            (ReservationStatus::Waiting, ReservationStatus::Reserved) => true,
            (from, ReservationStatus::Cancel) => from.is_cancellable(),
            (from, to) => from.next_stage() == Some(to),
        };
        if !allowed {
            return Err(AppError::InvalidState(format!(
                "cannot move a reservation from {} to {}",
                self.from, self.to
            )));
        }
        check_combination(self.to, self.signoff)
    }

    /// Transitions into RESERVED consume a room and must pass the capacity guard
    pub fn takes_capacity(&self) -> bool {
        self.to == ReservationStatus::Reserved && self.from != ReservationStatus::Reserved
    }
}
