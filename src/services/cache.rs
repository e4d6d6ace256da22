//! Advisory availability cache

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{
    error::{AppError, AppResult},
    models::availability::{AvailabilityDecision, AvailabilityKey},
};

/// Read-through store of availability decisions keyed by exact range.
///
/// Entries are hints: a write decision never trusts them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityCache: Send + Sync {
    async fn get(&self, key: &AvailabilityKey) -> AppResult<Option<AvailabilityDecision>>;

    async fn set(
        &self,
        key: &AvailabilityKey,
        value: &AvailabilityDecision,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Drop every entry of a unit, whatever its range
    async fn invalidate_by_unit(&self, unit_id: i32) -> AppResult<()>;
}

/// Process-local cache, used when Redis is disabled and in tests
#[derive(Default)]
pub struct MemoryAvailabilityCache {
    entries: Mutex<HashMap<AvailabilityKey, (AvailabilityDecision, Instant)>>,
}

impl MemoryAvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Cache("availability cache lock poisoned".to_string())
}

#[async_trait]
impl AvailabilityCache for MemoryAvailabilityCache {
    async fn get(&self, key: &AvailabilityKey) -> AppResult<Option<AvailabilityDecision>> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        match entries.get(key) {
            Some((decision, expires)) if *expires > Instant::now() => Ok(Some(decision.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &AvailabilityKey,
        value: &AvailabilityDecision,
        ttl: Duration,
    ) -> AppResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(*key, (value.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn invalidate_by_unit(&self, unit_id: i32) -> AppResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.retain(|key, _| key.unit_id != unit_id);
        Ok(())
    }
}
