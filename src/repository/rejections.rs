//! Rejection ledger persistence

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        enums::{PaymentState, ReservationStatus},
        rejection::{NewRejectionRecord, RejectionRecord},
    },
};

impl Repository {
    /// Cancel a WAITING reservation and append its rejection record atomically
    pub async fn rejections_create(
        &self,
        data: &NewRejectionRecord,
        payment_state: PaymentState,
    ) -> AppResult<Option<RejectionRecord>> {
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, payment_state = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(data.rent_id)
        .bind(i16::from(ReservationStatus::Cancel))
        .bind(i16::from(payment_state))
        .bind(i16::from(ReservationStatus::Waiting))
        .execute(&mut *tx)
        .await?;

        if cancelled.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let record = sqlx::query_as::<_, RejectionRecord>(
            r#"
            INSERT INTO rejection_records (rent_id, host_id, guest_id, reason_code, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.rent_id)
        .bind(data.host_id)
        .bind(data.guest_id)
        .bind(&data.reason_code)
        .bind(&data.message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    /// Flip the resolution fields once; later calls return the record unchanged
    pub async fn rejections_resolve(&self, id: i32, admin_id: i32) -> AppResult<Option<RejectionRecord>> {
        let updated = sqlx::query_as::<_, RejectionRecord>(
            r#"
            UPDATE rejection_records
            SET resolved = TRUE, resolved_at = NOW(), resolved_by = $2
            WHERE id = $1 AND NOT resolved
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(updated);
        }

        let existing = sqlx::query_as::<_, RejectionRecord>("SELECT * FROM rejection_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing)
    }

    pub async fn rejections_list_unresolved(&self) -> AppResult<Vec<RejectionRecord>> {
        let rows = sqlx::query_as::<_, RejectionRecord>(
            "SELECT * FROM rejection_records WHERE NOT resolved ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
