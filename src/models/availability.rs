//! Availability decisions, cache keys and unavailability blocks

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{
    enums::{BlockSource, Lang},
    stay::StayRange,
};

/// A manual or calendar-synced period during which a unit cannot be booked
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UnavailabilityBlock {
    pub id: i32,
    pub unit_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[sqlx(try_from = "i16")]
    pub source: BlockSource,
}

/// Exact-range cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvailabilityKey {
    pub unit_id: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AvailabilityKey {
    pub fn new(unit_id: i32, stay: &StayRange) -> Self {
        Self {
            unit_id,
            start: stay.start(),
            end: stay.end(),
        }
    }

    /// Redis set indexing every key written for a unit
    pub fn unit_index(unit_id: i32) -> String {
        format!("availability:{}:keys", unit_id)
    }
}

impl std::fmt::Display for AvailabilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "availability:{}:{}:{}", self.unit_id, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// A manual or external-sync block covers part of the stay
    Blocked,
    /// Every room is taken on at least one night
    FullyBooked,
}

impl UnavailableReason {
    pub fn describe(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (UnavailableReason::Blocked, Lang::En) => {
                "The property is not available on the selected dates"
            }
            (UnavailableReason::Blocked, Lang::Fr) => {
                "Le logement n'est pas disponible aux dates sélectionnées"
            }
            (UnavailableReason::FullyBooked, Lang::En) => {
                "The property is already booked for the selected dates"
            }
            (UnavailableReason::FullyBooked, Lang::Fr) => {
                "Le logement est déjà réservé pour les dates sélectionnées"
            }
        }
    }
}

/// Diagnostics recorded with every decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityMetadata {
    /// Peak number of RESERVED stays on any night of the range
    pub booked: u32,
    pub capacity: u32,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDecision {
    pub available: bool,
    pub reason: Option<UnavailableReason>,
    pub metadata: AvailabilityMetadata,
    pub written_at: DateTime<Utc>,
}
