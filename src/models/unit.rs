//! Rentable unit model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::Currency;

/// A house, apartment or hotel listed on the marketplace
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentableUnit {
    pub id: i32,
    pub owner_id: i32,
    /// Listing category, used to pick the commission configuration
    pub unit_type: String,
    /// Interchangeable rooms; more than one marks a hotel
    pub capacity_rooms: i32,
    pub base_price_per_night: Decimal,
    #[sqlx(try_from = "i16")]
    pub currency: Currency,
    /// Per-stay fees (cleaning, linen) added before commission
    pub extra_fees: Decimal,
    pub check_in_hour: i16,
    pub check_out_hour: i16,
    pub min_guests: Option<i32>,
    pub max_guests: Option<i32>,
    pub auto_accept: bool,
}

impl RentableUnit {
    /// Allowed guest count, only when both bounds are configured
    pub fn guest_bounds(&self) -> Option<(i32, i32)> {
        match (self.min_guests, self.max_guests) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.owner_id == user_id
    }
}
