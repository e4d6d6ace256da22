//! Commission split between guest, host and platform

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

use super::pricing::PricingService;
use crate::{
    config::CommissionDefaults,
    error::{AppError, AppResult},
    models::{
        commission::{AmountSplit, BookingQuote, CommissionConfig, CommissionScope},
        enums::Currency,
        stay::StayRange,
        unit::RentableUnit,
    },
    repository::BookingStore,
};

fn round_money(amount: Decimal, currency: Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.minor_unit_scale(), RoundingStrategy::MidpointAwayFromZero)
}

/// Split `amount` (subtotal plus extras) according to `config`.
///
/// Intermediate values keep full precision; each output is rounded half-up
/// to the currency's minor unit exactly once.
pub fn split_amounts(amount: Decimal, config: &CommissionConfig, currency: Currency) -> AmountSplit {
    let client_commission = amount * config.client_rate + config.client_fixed;
    let host_commission = amount * config.host_rate;

    AmountSplit {
        client_commission: round_money(client_commission, currency),
        host_commission: round_money(host_commission, currency),
        client_pays: round_money(amount + client_commission, currency),
        host_receives: round_money(amount - host_commission, currency),
        platform_amount: round_money(client_commission + host_commission, currency),
    }
}

#[derive(Clone)]
pub struct CommissionService {
    store: Arc<dyn BookingStore>,
    pricing: PricingService,
    fallback: CommissionDefaults,
}

impl CommissionService {
    pub fn new(store: Arc<dyn BookingStore>, pricing: PricingService, fallback: CommissionDefaults) -> Self {
        Self {
            store,
            pricing,
            fallback,
        }
    }

    /// Unit-type configuration, else the stored default, else configured rates
    pub async fn config_for(&self, unit: &RentableUnit) -> AppResult<CommissionConfig> {
        match self.store.find_commission_config(&unit.unit_type).await? {
            Some(config) => Ok(config),
            None => {
                tracing::debug!(
                    "No stored commission for unit type {}, using configured rates",
                    unit.unit_type
                );
                Ok(CommissionConfig {
                    scope: CommissionScope::Default,
                    client_rate: self.fallback.client_rate,
                    client_fixed: self.fallback.client_fixed,
                    host_rate: self.fallback.host_rate,
                })
            }
        }
    }

    /// Nightly pricing, extras and commission for a stay
    pub async fn quote_booking(&self, unit_id: i32, stay: StayRange) -> AppResult<BookingQuote> {
        let unit = self
            .store
            .find_unit(unit_id)
            .await?
            .ok_or(AppError::UnitNotFound(unit_id))?;
        self.quote_unit(&unit, stay).await
    }

    pub async fn quote_unit(&self, unit: &RentableUnit, stay: StayRange) -> AppResult<BookingQuote> {
        let price = self
            .pricing
            .price_unit(unit, stay, self.pricing.default_strategy())
            .await?;
        let config = self.config_for(unit).await?;
        let split = split_amounts(price.subtotal + unit.extra_fees, &config, unit.currency);

        Ok(BookingQuote {
            price,
            extras: unit.extra_fees,
            split,
        })
    }
}
