//! Business logic services

pub mod availability;
pub mod booking;
pub mod cache;
pub mod commission;
pub mod notifications;
pub mod payment;
pub mod pricing;
pub mod redis;
pub mod rejections;
pub mod reservations;

pub use crate::models::capacity;

use std::{sync::Arc, time::Duration};

use crate::{config::AppConfig, repository::BookingStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub availability: availability::AvailabilityService,
    pub validator: booking::BookingValidator,
    pub pricing: pricing::PricingService,
    pub commission: commission::CommissionService,
    pub reservations: reservations::ReservationService,
    pub rejections: rejections::RejectionLedger,
}

impl Services {
    /// Wire every service over the given collaborators
    pub fn new(
        store: Arc<dyn BookingStore>,
        cache: Arc<dyn cache::AvailabilityCache>,
        payments: Arc<dyn payment::PaymentProcessor>,
        notifier: Arc<dyn notifications::NotificationService>,
        config: &AppConfig,
    ) -> Self {
        let reference = config.booking.reference_offset();

        let availability = availability::AvailabilityService::new(
            store.clone(),
            cache,
            Duration::from_secs(config.cache.ttl_seconds),
            reference,
        );
        let validator = booking::BookingValidator::new(store.clone(), availability.clone(), config.booking.lang);
        let pricing = pricing::PricingService::new(store.clone(), reference, config.booking.pricing_strategy);
        let commission =
            commission::CommissionService::new(store.clone(), pricing.clone(), config.commission.clone());
        let reservations = reservations::ReservationService::new(
            store.clone(),
            validator.clone(),
            availability.clone(),
            commission.clone(),
            payments,
            notifier,
        );

        Self {
            availability,
            validator,
            pricing,
            commission,
            reservations,
            rejections: rejections::RejectionLedger::new(store),
        }
    }
}
