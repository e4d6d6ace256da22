//! Redis-backed availability cache

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::time::Duration;

use super::cache::AvailabilityCache;
use crate::{
    error::{AppError, AppResult},
    models::availability::{AvailabilityDecision, AvailabilityKey},
};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection (for advanced operations)
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl AvailabilityCache for RedisService {
    async fn get(&self, key: &AvailabilityKey) -> AppResult<Option<AvailabilityDecision>> {
        let mut conn = self.get_connection().await?;

        let raw: Option<String> = conn
            .get(key.to_string())
            .await
            .map_err(|e| AppError::Cache(format!("Failed to read availability from Redis: {}", e)))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AppError::Cache(format!("Corrupt availability entry {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &AvailabilityKey,
        value: &AvailabilityDecision,
        ttl: Duration,
    ) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Cache(format!("Failed to encode availability: {}", e)))?;
        let entry_key = key.to_string();
        let index = AvailabilityKey::unit_index(key.unit_id);
        let seconds = ttl.as_secs().max(1);

        // The per-unit index lets invalidation find every range of the unit
        redis::pipe()
            .atomic()
            .set_ex(&entry_key, json, seconds)
            .ignore()
            .sadd(&index, &entry_key)
            .ignore()
            .expire(&index, seconds as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to store availability in Redis: {}", e)))?;

        Ok(())
    }

    async fn invalidate_by_unit(&self, unit_id: i32) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        let index = AvailabilityKey::unit_index(unit_id);
        let mut keys: Vec<String> = conn
            .smembers(&index)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to list availability keys: {}", e)))?;
        keys.push(index);

        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to invalidate availability for unit {}: {}", unit_id, e)))?;

        Ok(())
    }
}
