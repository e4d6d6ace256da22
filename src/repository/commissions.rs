//! Commission configuration lookups

use super::Repository;
use crate::{
    error::AppResult,
    models::commission::{CommissionConfig, CommissionConfigRow},
};

impl Repository {
    /// Unit-type scoped configuration first, then the default (NULL) scope
    pub async fn commissions_for_unit_type(&self, unit_type: &str) -> AppResult<Option<CommissionConfig>> {
        let row = sqlx::query_as::<_, CommissionConfigRow>(
            r#"
            SELECT unit_type, client_rate, client_fixed, host_rate
            FROM commission_configs
            WHERE unit_type = $1 OR unit_type IS NULL
            ORDER BY unit_type NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(unit_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CommissionConfig::from))
    }
}
