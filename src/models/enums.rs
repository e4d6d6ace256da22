//! Shared domain enums, stored as SMALLINT codes

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Lang
// ---------------------------------------------------------------------------

/// Language used for user-facing booking messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum Lang {
    En = 1,
    Fr = 2,
}

impl From<i16> for Lang {
    fn from(v: i16) -> Self {
        match v {
            1 => Lang::En,
            _ => Lang::Fr,
        }
    }
}

impl From<Lang> for i16 {
    fn from(l: Lang) -> Self {
        l as i16
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Lang::En => "English",
            Lang::Fr => "Français",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Settlement currency of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i16)]
pub enum Currency {
    Eur = 0,
    Mga = 1,
}

impl Currency {
    /// Decimal places of the smallest amount actually charged
    pub fn minor_unit_scale(self) -> u32 {
        match self {
            Currency::Eur => 2,
            Currency::Mga => 0,
        }
    }

    pub fn iso_code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Mga => "MGA",
        }
    }
}

impl From<i16> for Currency {
    fn from(v: i16) -> Self {
        match v {
            1 => Currency::Mga,
            _ => Currency::Eur,
        }
    }
}

impl From<Currency> for i16 {
    fn from(c: Currency) -> Self {
        c as i16
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iso_code())
    }
}

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ReservationStatus {
    Waiting = 0,
    Reserved = 1,
    CheckIn = 2,
    CheckOut = 3,
    Cancel = 4,
}

impl ReservationStatus {
    /// Statuses from which a reservation may still be cancelled
    pub fn is_cancellable(self) -> bool {
        matches!(self, ReservationStatus::Waiting | ReservationStatus::Reserved)
    }

    /// Next stay stage reachable through `advance`, if any
    pub fn next_stage(self) -> Option<ReservationStatus> {
        match self {
            ReservationStatus::Reserved => Some(ReservationStatus::CheckIn),
            ReservationStatus::CheckIn => Some(ReservationStatus::CheckOut),
            _ => None,
        }
    }
}

impl TryFrom<i16> for ReservationStatus {
    type Error = AppError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ReservationStatus::Waiting),
            1 => Ok(ReservationStatus::Reserved),
            2 => Ok(ReservationStatus::CheckIn),
            3 => Ok(ReservationStatus::CheckOut),
            4 => Ok(ReservationStatus::Cancel),
            other => Err(AppError::Internal(format!("Unknown reservation status code {}", other))),
        }
    }
}

impl From<ReservationStatus> for i16 {
    fn from(s: ReservationStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReservationStatus::Waiting => "WAITING",
            ReservationStatus::Reserved => "RESERVED",
            ReservationStatus::CheckIn => "CHECKIN",
            ReservationStatus::CheckOut => "CHECKOUT",
            ReservationStatus::Cancel => "CANCEL",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// PaymentState
// ---------------------------------------------------------------------------

/// Where the guest's money stands with the payment processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum PaymentState {
    None = 0,
    Authorized = 1,
    Captured = 2,
    Refunded = 3,
    Voided = 4,
}

impl TryFrom<i16> for PaymentState {
    type Error = AppError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PaymentState::None),
            1 => Ok(PaymentState::Authorized),
            2 => Ok(PaymentState::Captured),
            3 => Ok(PaymentState::Refunded),
            4 => Ok(PaymentState::Voided),
            other => Err(AppError::Internal(format!("Unknown payment state code {}", other))),
        }
    }
}

impl From<PaymentState> for i16 {
    fn from(p: PaymentState) -> Self {
        p as i16
    }
}

// ---------------------------------------------------------------------------
// BlockSource
// ---------------------------------------------------------------------------

/// Origin of an unavailability block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum BlockSource {
    Manual = 0,
    ExternalSync = 1,
}

impl From<i16> for BlockSource {
    fn from(v: i16) -> Self {
        match v {
            1 => BlockSource::ExternalSync,
            _ => BlockSource::Manual,
        }
    }
}

impl From<BlockSource> for i16 {
    fn from(b: BlockSource) -> Self {
        b as i16
    }
}
