//! Day-by-day price resolution against special prices and promotions

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Currency,
        pricing::{NewPromotionRule, NewSpecialPriceRule, PriceQuote, PricingStrategy, PromotionRule, SpecialPriceRule},
        stay::StayRange,
        unit::RentableUnit,
    },
    repository::BookingStore,
};

/// Every weekday bit set
const ALL_WEEKDAYS: i16 = 0b111_1111;

fn discounted(price: Decimal, percentage: Decimal) -> Decimal {
    price * (Decimal::ONE_HUNDRED - percentage) / Decimal::ONE_HUNDRED
}

/// Price of one night given the rules that apply to it
pub fn resolve_nightly_price(
    base: Decimal,
    special: Option<Decimal>,
    discount_percentage: Option<Decimal>,
    strategy: PricingStrategy,
) -> Decimal {
    let promoted = discount_percentage.map(|pct| discounted(base, pct));
    match strategy {
        PricingStrategy::MostAdvantageous => match (promoted, special) {
            (Some(promoted), Some(special)) => promoted.min(special),
            (Some(promoted), None) => promoted,
            (None, Some(special)) => special,
            (None, None) => base,
        },
        PricingStrategy::PromotionFirst => promoted.or(special).unwrap_or(base),
        PricingStrategy::SpecialPriceFirst => special.or(promoted).unwrap_or(base),
        PricingStrategy::Cumulative => {
            let start = special.unwrap_or(base);
            discount_percentage.map_or(start, |pct| discounted(start, pct))
        }
    }
}

/// Price every night of `stay` for `unit`.
///
/// When several special prices match a night the cheapest wins; when
/// several promotions match, the deepest discount wins.
pub fn price_stay(
    unit: &RentableUnit,
    stay: StayRange,
    specials: &[SpecialPriceRule],
    promotions: &[PromotionRule],
    strategy: PricingStrategy,
    reference: FixedOffset,
) -> AppResult<PriceQuote> {
    let base = unit.base_price_per_night;

    let nightly = stay
        .nights()
        .map(|night| {
            let special = specials
                .iter()
                .filter(|rule| rule.unit_id == unit.id && rule.applies_on(night))
                .map(|rule| rule.price_in(unit.currency))
                .min();
            let discount = promotions
                .iter()
                .filter(|rule| rule.unit_id == unit.id && rule.covers(night, reference))
                .map(|rule| rule.discount_percentage)
                .max();

            let price = resolve_nightly_price(base, special, discount, strategy);
            if price > base || price < Decimal::ZERO {
                return Err(AppError::InvalidPricingRule(format!(
                    "night of {} on unit {} resolves to {} against a base of {}",
                    night, unit.id, price, base
                )));
            }
            Ok(price)
        })
        .collect::<AppResult<Vec<Decimal>>>()?;

    let subtotal: Decimal = nightly.iter().copied().sum();
    let total_savings = base * Decimal::from(stay.night_count()) - subtotal;

    Ok(PriceQuote {
        currency: unit.currency,
        base_price: base,
        nightly,
        subtotal,
        total_savings,
    })
}

/// Reject special prices that would raise a night above the base price
pub fn validate_special_price_rule(unit: &RentableUnit, rule: &NewSpecialPriceRule) -> AppResult<()> {
    let price = match unit.currency {
        Currency::Eur => rule.price_eur,
        Currency::Mga => rule.price_mga,
    };
    if price <= Decimal::ZERO {
        return Err(AppError::InvalidPricingRule("special price must be positive".to_string()));
    }
    if price > unit.base_price_per_night {
        return Err(AppError::InvalidPricingRule(format!(
            "special price {} exceeds the base price {}",
            price, unit.base_price_per_night
        )));
    }
    if rule.applicable_weekdays == 0 || rule.applicable_weekdays & !ALL_WEEKDAYS != 0 {
        return Err(AppError::InvalidPricingRule(format!(
            "invalid weekday mask {:#b}",
            rule.applicable_weekdays
        )));
    }
    if let (Some(start), Some(end)) = (rule.start_date, rule.end_date) {
        if start > end {
            return Err(AppError::InvalidPricingRule(format!(
                "special price window ends ({}) before it starts ({})",
                end, start
            )));
        }
    }
    Ok(())
}

pub fn validate_promotion_rule(rule: &NewPromotionRule) -> AppResult<()> {
    if rule.discount_percentage <= Decimal::ZERO || rule.discount_percentage > Decimal::ONE_HUNDRED {
        return Err(AppError::InvalidPricingRule(format!(
            "discount {}% must be within (0, 100]",
            rule.discount_percentage
        )));
    }
    if rule.starts_at > rule.ends_at {
        return Err(AppError::InvalidPricingRule(
            "promotion ends before it starts".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn BookingStore>,
    reference: FixedOffset,
    default_strategy: PricingStrategy,
}

impl PricingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        reference: FixedOffset,
        default_strategy: PricingStrategy,
    ) -> Self {
        Self {
            store,
            reference,
            default_strategy,
        }
    }

    pub fn default_strategy(&self) -> PricingStrategy {
        self.default_strategy
    }

    pub async fn price_booking(
        &self,
        unit_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        strategy: PricingStrategy,
    ) -> AppResult<PriceQuote> {
        let stay = StayRange::new(start, end)?;
        let unit = self
            .store
            .find_unit(unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(unit_id))?;
        self.price_unit(&unit, stay, strategy).await
    }

    /// Store a special price once it is checked against the unit's base price
    pub async fn create_special_price_rule(&self, rule: NewSpecialPriceRule) -> AppResult<SpecialPriceRule> {
        let unit = self
            .store
            .find_unit(rule.unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(rule.unit_id))?;
        validate_special_price_rule(&unit, &rule)?;

        let created = self.store.create_special_price_rule(&rule).await?;
        tracing::info!("Special price rule {} added to unit {}", created.id, created.unit_id);
        Ok(created)
    }

    pub async fn create_promotion_rule(&self, rule: NewPromotionRule) -> AppResult<PromotionRule> {
        self.store
            .find_unit(rule.unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(rule.unit_id))?;
        validate_promotion_rule(&rule)?;

        let created = self.store.create_promotion_rule(&rule).await?;
        tracing::info!("Promotion rule {} added to unit {}", created.id, created.unit_id);
        Ok(created)
    }

    pub async fn price_unit(
        &self,
        unit: &RentableUnit,
        stay: StayRange,
        strategy: PricingStrategy,
    ) -> AppResult<PriceQuote> {
        let specials = self.store.find_special_price_rules(unit.id).await?;
        let promotions = self.store.find_promotion_rules(unit.id).await?;
        price_stay(unit, stay, &specials, &promotions, strategy, self.reference)
    }
}
