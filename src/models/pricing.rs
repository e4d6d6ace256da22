//! Special prices, promotions and price quotes

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::Currency;

/// How a promotion and a special price combine when both apply to a night
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingStrategy {
    MostAdvantageous,
    PromotionFirst,
    SpecialPriceFirst,
    Cumulative,
}

// ---------------------------------------------------------------------------
// Weekdays
// ---------------------------------------------------------------------------

/// Bit for a weekday in `applicable_weekdays` (Monday = bit 0)
pub fn weekday_bit(day: Weekday) -> i16 {
    1 << day.num_days_from_monday()
}

pub fn weekday_mask(days: &[Weekday]) -> i16 {
    days.iter().fold(0, |mask, day| mask | weekday_bit(*day))
}

// ---------------------------------------------------------------------------
// SpecialPriceRule
// ---------------------------------------------------------------------------

/// Fixed nightly price on chosen weekdays, optionally bounded by dates
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpecialPriceRule {
    pub id: i32,
    pub unit_id: i32,
    pub price_eur: Decimal,
    pub price_mga: Decimal,
    pub applicable_weekdays: i16,
    /// Inclusive
    pub start_date: Option<NaiveDate>,
    /// Inclusive
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

impl SpecialPriceRule {
    pub fn applies_on(&self, night: NaiveDate) -> bool {
        self.active
            && self.applicable_weekdays & weekday_bit(night.weekday()) != 0
            && self.start_date.map_or(true, |start| start <= night)
            && self.end_date.map_or(true, |end| night <= end)
    }

    pub fn price_in(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Eur => self.price_eur,
            Currency::Mga => self.price_mga,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSpecialPriceRule {
    pub unit_id: i32,
    pub price_eur: Decimal,
    pub price_mga: Decimal,
    pub applicable_weekdays: i16,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// PromotionRule
// ---------------------------------------------------------------------------

/// Percentage discount over a window of time
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromotionRule {
    pub id: i32,
    pub unit_id: i32,
    /// Percent off, e.g. 10 for -10%
    pub discount_percentage: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

impl PromotionRule {
    /// A night is covered when its date, seen from the reference timezone,
    /// falls within the promotion window (both ends inclusive)
    pub fn covers(&self, night: NaiveDate, reference: FixedOffset) -> bool {
        let first = self.starts_at.with_timezone(&reference).date_naive();
        let last = self.ends_at.with_timezone(&reference).date_naive();
        self.active && first <= night && night <= last
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPromotionRule {
    pub unit_id: i32,
    pub discount_percentage: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PriceQuote
// ---------------------------------------------------------------------------

/// Result of day-by-day price resolution, before commission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub currency: Currency,
    pub base_price: Decimal,
    /// One entry per night, in stay order
    pub nightly: Vec<Decimal>,
    pub subtotal: Decimal,
    pub total_savings: Decimal,
}
