//! Error types for the rental engine

use thiserror::Error;

/// Stable numeric codes surfaced to callers alongside each error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    InvalidDateRange = 2,
    UnitNotFound = 3,
    NotAvailable = 4,
    GuestCountOutOfRange = 5,
    MissingParameters = 6,
    AuthorizationDenied = 7,
    InvalidState = 8,
    PaymentAuthorizationFailed = 9,
    PaymentCaptureFailed = 10,
    PaymentRefundFailed = 11,
    NoSuchReservation = 12,
    NoSuchRejection = 13,
    InvalidPricingRule = 14,
    DbFailure = 15,
    CacheFailure = 16,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Rentable unit {0} not found")]
    UnitNotFound(i32),

    #[error("Not available: {0}")]
    NotAvailable(String),

    #[error("Guest count {requested} outside allowed range {min}..={max}")]
    GuestCountOutOfRange { requested: i32, min: i32, max: i32 },

    #[error("Missing parameters: {0}")]
    MissingParameters(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Payment authorization failed: {0}")]
    PaymentAuthorizationFailed(String),

    #[error("Payment capture failed: {0}")]
    PaymentCaptureFailed(String),

    #[error("Payment refund failed: {0}")]
    PaymentRefundFailed(String),

    #[error("Reservation {0} not found")]
    ReservationNotFound(i32),

    #[error("Rejection record {0} not found")]
    RejectionNotFound(i32),

    #[error("Invalid pricing rule: {0}")]
    InvalidPricingRule(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidDateRange(_) => ErrorCode::InvalidDateRange,
            AppError::UnitNotFound(_) => ErrorCode::UnitNotFound,
            AppError::NotAvailable(_) => ErrorCode::NotAvailable,
            AppError::GuestCountOutOfRange { .. } => ErrorCode::GuestCountOutOfRange,
            AppError::MissingParameters(_) => ErrorCode::MissingParameters,
            AppError::AuthorizationDenied(_) => ErrorCode::AuthorizationDenied,
            AppError::InvalidState(_) => ErrorCode::InvalidState,
            AppError::PaymentAuthorizationFailed(_) => ErrorCode::PaymentAuthorizationFailed,
            AppError::PaymentCaptureFailed(_) => ErrorCode::PaymentCaptureFailed,
            AppError::PaymentRefundFailed(_) => ErrorCode::PaymentRefundFailed,
            AppError::ReservationNotFound(_) => ErrorCode::NoSuchReservation,
            AppError::RejectionNotFound(_) => ErrorCode::NoSuchRejection,
            AppError::InvalidPricingRule(_) => ErrorCode::InvalidPricingRule,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorCode::DbFailure
            }
            AppError::Cache(_) => ErrorCode::CacheFailure,
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorCode::Failure
            }
        }
    }

    /// Validation-class errors are user-facing data, everything else is a fault
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidDateRange(_)
                | AppError::NotAvailable(_)
                | AppError::GuestCountOutOfRange { .. }
                | AppError::MissingParameters(_)
        )
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;
