//! Booking request validation

use chrono::NaiveDate;
use std::sync::Arc;

use super::availability::AvailabilityService;
use crate::{
    error::{AppError, AppResult},
    models::{availability::UnavailableReason, enums::Lang, stay::StayRange},
    repository::BookingStore,
};

/// One reason a booking request cannot go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingProblem {
    InvalidDateRange,
    MissingGuests,
    GuestCountOutOfRange { requested: i32, min: i32, max: i32 },
    NotAvailable(UnavailableReason),
}

impl BookingProblem {
    pub fn message(&self, lang: Lang) -> String {
        match (self, lang) {
            (BookingProblem::InvalidDateRange, Lang::En) => {
                "The departure date must be after the arrival date".to_string()
            }
            (BookingProblem::InvalidDateRange, Lang::Fr) => {
                "La date de départ doit être postérieure à la date d'arrivée".to_string()
            }
            (BookingProblem::MissingGuests, Lang::En) => "Please enter the number of guests".to_string(),
            (BookingProblem::MissingGuests, Lang::Fr) => "Veuillez indiquer le nombre de voyageurs".to_string(),
            (BookingProblem::GuestCountOutOfRange { min, max, .. }, Lang::En) => {
                format!("The number of guests must be between {} and {}", min, max)
            }
            (BookingProblem::GuestCountOutOfRange { min, max, .. }, Lang::Fr) => {
                format!("Le nombre de voyageurs doit être compris entre {} et {}", min, max)
            }
            (BookingProblem::NotAvailable(reason), lang) => reason.describe(lang).to_string(),
        }
    }

    pub fn into_error(self, lang: Lang) -> AppError {
        match self {
            BookingProblem::InvalidDateRange => AppError::InvalidDateRange(self.message(lang)),
            BookingProblem::MissingGuests => AppError::MissingParameters(self.message(lang)),
            BookingProblem::GuestCountOutOfRange { requested, min, max } => {
                AppError::GuestCountOutOfRange { requested, min, max }
            }
            BookingProblem::NotAvailable(_) => AppError::NotAvailable(self.message(lang)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Cached,
    Store,
}

#[derive(Clone)]
pub struct BookingValidator {
    store: Arc<dyn BookingStore>,
    availability: AvailabilityService,
    lang: Lang,
}

impl BookingValidator {
    pub fn new(store: Arc<dyn BookingStore>, availability: AvailabilityService, lang: Lang) -> Self {
        Self {
            store,
            availability,
            lang,
        }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Every problem with the request, localized; empty means valid
    pub async fn validate_booking(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        guest_count: i32,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .problems(unit_id, start, end, guest_count)
            .await?
            .iter()
            .map(|problem| problem.message(self.lang))
            .collect())
    }

    /// Typed form of [`Self::validate_booking`]; checks do not short-circuit
    pub async fn problems(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        guest_count: i32,
    ) -> AppResult<Vec<BookingProblem>> {
        self.collect_problems(unit_id, start, end, guest_count, Lookup::Cached)
            .await
    }

    /// Same checks with availability read from the store, for write paths
    pub async fn problems_from_store(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        guest_count: i32,
    ) -> AppResult<Vec<BookingProblem>> {
        self.collect_problems(unit_id, start, end, guest_count, Lookup::Store)
            .await
    }

    async fn collect_problems(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        guest_count: i32,
        lookup: Lookup,
    ) -> AppResult<Vec<BookingProblem>> {
        let unit = self
            .store
            .find_unit(unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(unit_id))?;

        let mut problems = Vec::new();

        if guest_count < 1 {
            problems.push(BookingProblem::MissingGuests);
        } else if let Some((min, max)) = unit.guest_bounds() {
            if guest_count < min || guest_count > max {
                problems.push(BookingProblem::GuestCountOutOfRange {
                    requested: guest_count,
                    min,
                    max,
                });
            }
        }

        match StayRange::new(start, end) {
            Ok(stay) => {
                let decision = match lookup {
                    Lookup::Cached => self.availability.check_stay(unit_id, stay).await?,
                    Lookup::Store => self.availability.resolve(unit_id, stay).await?,
                };
                if let Some(reason) = decision.reason {
                    problems.push(BookingProblem::NotAvailable(reason));
                }
            }
            Err(_) => problems.push(BookingProblem::InvalidDateRange),
        }

        Ok(problems)
    }
}
