//! Commission configuration and amount splits

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{enums::Currency, pricing::PriceQuote};

/// Which units a commission configuration applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionScope {
    Default,
    UnitType(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub scope: CommissionScope,
    /// Fraction of the amount charged to the guest, e.g. 0.05
    pub client_rate: Decimal,
    /// Flat fee charged to the guest per booking
    pub client_fixed: Decimal,
    /// Fraction of the amount withheld from the host
    pub host_rate: Decimal,
}

/// Stored row; a NULL unit_type is the default scope
#[derive(Debug, Clone, FromRow)]
pub struct CommissionConfigRow {
    pub unit_type: Option<String>,
    pub client_rate: Decimal,
    pub client_fixed: Decimal,
    pub host_rate: Decimal,
}

impl From<CommissionConfigRow> for CommissionConfig {
    fn from(row: CommissionConfigRow) -> Self {
        Self {
            scope: row
                .unit_type
                .map(CommissionScope::UnitType)
                .unwrap_or(CommissionScope::Default),
            client_rate: row.client_rate,
            client_fixed: row.client_fixed,
            host_rate: row.host_rate,
        }
    }
}

/// How a booking's value divides between guest, host and platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountSplit {
    pub client_commission: Decimal,
    pub host_commission: Decimal,
    pub client_pays: Decimal,
    pub host_receives: Decimal,
    pub platform_amount: Decimal,
}

/// Full price of a stay: nightly resolution, extras and commission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingQuote {
    pub price: PriceQuote,
    pub extras: Decimal,
    pub split: AmountSplit,
}

impl BookingQuote {
    pub fn currency(&self) -> Currency {
        self.price.currency
    }
}
