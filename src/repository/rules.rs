//! Pricing rules: special per-weekday prices and promotions

use super::Repository;
use crate::{
    error::AppResult,
    models::pricing::{NewPromotionRule, NewSpecialPriceRule, PromotionRule, SpecialPriceRule},
};

impl Repository {
    pub async fn rules_special_prices(&self, unit_id: i32) -> AppResult<Vec<SpecialPriceRule>> {
        let rows = sqlx::query_as::<_, SpecialPriceRule>(
            "SELECT * FROM special_price_rules WHERE unit_id = $1 ORDER BY id",
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn rules_promotions(&self, unit_id: i32) -> AppResult<Vec<PromotionRule>> {
        let rows = sqlx::query_as::<_, PromotionRule>(
            "SELECT * FROM promotion_rules WHERE unit_id = $1 ORDER BY starts_at",
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn rules_create_special_price(
        &self,
        data: &NewSpecialPriceRule,
    ) -> AppResult<SpecialPriceRule> {
        let row = sqlx::query_as::<_, SpecialPriceRule>(
            r#"
            INSERT INTO special_price_rules
                (unit_id, price_eur, price_mga, applicable_weekdays, start_date, end_date, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(data.unit_id)
        .bind(data.price_eur)
        .bind(data.price_mga)
        .bind(data.applicable_weekdays)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn rules_create_promotion(&self, data: &NewPromotionRule) -> AppResult<PromotionRule> {
        let row = sqlx::query_as::<_, PromotionRule>(
            r#"
            INSERT INTO promotion_rules (unit_id, discount_percentage, starts_at, ends_at, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING *
            "#,
        )
        .bind(data.unit_id)
        .bind(data.discount_percentage)
        .bind(data.starts_at)
        .bind(data.ends_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
