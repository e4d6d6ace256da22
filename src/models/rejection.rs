//! Rejection ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit record of a host turning down a booking request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RejectionRecord {
    pub id: i32,
    pub rent_id: i32,
    pub host_id: i32,
    pub guest_id: i32,
    /// Machine-readable reason, e.g. "dates_unavailable"
    pub reason_code: String,
    pub message: Option<String>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRejectionRecord {
    pub rent_id: i32,
    pub host_id: i32,
    pub guest_id: i32,
    pub reason_code: String,
    pub message: Option<String>,
}
