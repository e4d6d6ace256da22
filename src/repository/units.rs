//! Units, their unavailability blocks and owner contact lookups

use super::Repository;
use crate::{
    error::AppResult,
    models::{availability::UnavailabilityBlock, stay::StayRange, unit::RentableUnit},
};

impl Repository {
    /// Get a rentable unit by ID
    pub async fn units_get_by_id(&self, id: i32) -> AppResult<Option<RentableUnit>> {
        let unit = sqlx::query_as::<_, RentableUnit>("SELECT * FROM rentable_units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(unit)
    }

    /// Blocks sharing at least one night with `stay`
    pub async fn units_find_overlapping_blocks(
        &self,
        unit_id: i32,
        stay: StayRange,
    ) -> AppResult<Vec<UnavailabilityBlock>> {
        let rows = sqlx::query_as::<_, UnavailabilityBlock>(
            r#"
            SELECT * FROM unavailability_blocks
            WHERE unit_id = $1 AND start_date < $3 AND end_date > $2
            ORDER BY start_date
            "#,
        )
        .bind(unit_id)
        .bind(stay.start())
        .bind(stay.end())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn units_user_email(&self, user_id: i32) -> AppResult<Option<String>> {
        let email = sqlx::query_scalar::<_, Option<String>>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(email.flatten())
    }
}
