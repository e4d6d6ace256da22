//! Availability resolution for a unit over a stay

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::{sync::Arc, time::Duration};

use super::cache::AvailabilityCache;
use crate::{
    error::{AppError, AppResult},
    models::{
        availability::{AvailabilityDecision, AvailabilityKey, AvailabilityMetadata, UnavailableReason},
        capacity::CapacityModel,
        enums::ReservationStatus,
        stay::StayRange,
    },
    repository::BookingStore,
};

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn BookingStore>,
    cache: Arc<dyn AvailabilityCache>,
    ttl: Duration,
    reference: FixedOffset,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        cache: Arc<dyn AvailabilityCache>,
        ttl: Duration,
        reference: FixedOffset,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            reference,
        }
    }

    /// Can the unit host a stay from `start` to `end` (exclusive)?
    pub async fn check_availability(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<AvailabilityDecision> {
        let stay = StayRange::new(start, end)?;
        self.check_stay(unit_id, stay).await
    }

    /// Same as [`Self::check_availability`] for client-supplied instants
    pub async fn check_availability_between(
        &self,
        unit_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<AvailabilityDecision> {
        let stay = StayRange::from_instants(start, end, self.reference)?;
        self.check_stay(unit_id, stay).await
    }

    pub async fn check_stay(&self, unit_id: i32, stay: StayRange) -> AppResult<AvailabilityDecision> {
        let key = AvailabilityKey::new(unit_id, &stay);

        match self.cache.get(&key).await {
            Ok(Some(decision)) => {
                tracing::debug!("Availability cache hit for {}", key);
                return Ok(decision);
            }
            Ok(None) => tracing::debug!("Availability cache miss for {}", key),
            Err(e) => tracing::warn!("Availability cache read failed for {}: {}", key, e),
        }

        let decision = self.resolve(unit_id, stay).await?;

        if let Err(e) = self.cache.set(&key, &decision, self.ttl).await {
            tracing::warn!("Availability cache write failed for {}: {}", key, e);
        }

        Ok(decision)
    }

    /// Compute a decision from the store, bypassing the cache
    pub async fn resolve(&self, unit_id: i32, stay: StayRange) -> AppResult<AvailabilityDecision> {
        let unit = self
            .store
            .find_unit(unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(unit_id))?;
        let model = CapacityModel::for_unit(&unit);

        let reserved: Vec<StayRange> = self
            .store
            .find_overlapping_reservations(unit_id, stay, &[ReservationStatus::Reserved])
            .await?
            .iter()
            .map(|reservation| reservation.stay())
            .collect::<AppResult<_>>()?;
        let booked = model.booked(&stay, &reserved);
        let has_room = model.has_room(booked);

        // Blocks win regardless of free rooms
        let blocked = !self.store.find_overlapping_blocks(unit_id, stay).await?.is_empty();

        let reason = if blocked {
            Some(UnavailableReason::Blocked)
        } else if !has_room {
            Some(UnavailableReason::FullyBooked)
        } else {
            None
        };

        Ok(AvailabilityDecision {
            available: reason.is_none(),
            reason,
            metadata: AvailabilityMetadata {
                booked,
                capacity: model.rooms(),
                blocked,
            },
            written_at: Utc::now(),
        })
    }

    /// Drop cached decisions for every range of a unit
    pub async fn invalidate_unit(&self, unit_id: i32) {
        if let Err(e) = self.cache.invalidate_by_unit(unit_id).await {
            tracing::warn!("Failed to invalidate availability cache for unit {}: {}", unit_id, e);
        }
    }
}
