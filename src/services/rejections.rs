//! Admin side of host rejections

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::rejection::RejectionRecord,
    repository::BookingStore,
};

#[derive(Clone)]
pub struct RejectionLedger {
    store: Arc<dyn BookingStore>,
}

impl RejectionLedger {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Mark a rejection as handled. Resolving twice keeps the first resolution.
    pub async fn resolve_rejection(&self, rejection_id: i32, admin_id: i32) -> AppResult<RejectionRecord> {
        let record = self
            .store
            .resolve_rejection_record(rejection_id, admin_id)
            .await?
            .ok_or(AppError::RejectionNotFound(rejection_id))?;

        if record.resolved_by == Some(admin_id) {
            tracing::info!("Rejection {} resolved by admin {}", rejection_id, admin_id);
        }
        Ok(record)
    }

    /// Records still waiting for an admin, oldest first
    pub async fn list_unresolved(&self) -> AppResult<Vec<RejectionRecord>> {
        self.store.list_unresolved_rejections().await
    }
}
