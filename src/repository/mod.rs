//! Repository layer for database operations

pub mod commissions;
pub mod rejections;
pub mod reservations;
pub mod rules;
pub mod units;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        availability::UnavailabilityBlock,
        commission::CommissionConfig,
        enums::{PaymentState, ReservationStatus},
        pricing::{NewPromotionRule, NewSpecialPriceRule, PromotionRule, SpecialPriceRule},
        rejection::{NewRejectionRecord, RejectionRecord},
        reservation::{NewReservation, Reservation, StatusTransition},
        stay::StayRange,
        unit::RentableUnit,
    },
};

/// Persistence operations the booking engine depends on.
///
/// Writes that can put a stay into RESERVED re-check capacity and blocks
/// inside the same transaction as the write, so the advisory cache never
/// decides whether a reservation lands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_unit(&self, unit_id: i32) -> AppResult<Option<RentableUnit>>;

    async fn find_overlapping_reservations(
        &self,
        unit_id: i32,
        stay: StayRange,
        statuses: &[ReservationStatus],
    ) -> AppResult<Vec<Reservation>>;

    async fn find_overlapping_blocks(
        &self,
        unit_id: i32,
        stay: StayRange,
    ) -> AppResult<Vec<UnavailabilityBlock>>;

    /// Insert a reservation; fails with `NotAvailable` when the unit is
    /// blocked or full at commit time
    async fn create_reservation(&self, reservation: &NewReservation) -> AppResult<Reservation>;

    async fn find_reservation(&self, reservation_id: i32) -> AppResult<Option<Reservation>>;

    /// Apply `transition` if the reservation is still in `transition.from`.
    /// Returns `None` when another writer moved it first.
    async fn update_reservation_status(
        &self,
        reservation_id: i32,
        transition: &StatusTransition,
    ) -> AppResult<Option<Reservation>>;

    /// Overwrite the payment state alone, whatever the status.
    /// Returns `None` for an unknown reservation.
    async fn update_payment_state(
        &self,
        reservation_id: i32,
        payment_state: PaymentState,
    ) -> AppResult<Option<Reservation>>;

    async fn find_special_price_rules(&self, unit_id: i32) -> AppResult<Vec<SpecialPriceRule>>;

    async fn find_promotion_rules(&self, unit_id: i32) -> AppResult<Vec<PromotionRule>>;

    async fn create_special_price_rule(&self, rule: &NewSpecialPriceRule) -> AppResult<SpecialPriceRule>;

    async fn create_promotion_rule(&self, rule: &NewPromotionRule) -> AppResult<PromotionRule>;

    /// Configuration scoped to `unit_type`, else the stored default
    async fn find_commission_config(&self, unit_type: &str) -> AppResult<Option<CommissionConfig>>;

    /// Cancel the WAITING reservation and append its rejection record in
    /// one transaction. Returns `None` if the reservation is not WAITING.
    async fn create_rejection_record(
        &self,
        record: &NewRejectionRecord,
        payment_state: PaymentState,
    ) -> AppResult<Option<RejectionRecord>>;

    /// Mark a record resolved unless it already is; `None` if unknown
    async fn resolve_rejection_record(
        &self,
        rejection_id: i32,
        admin_id: i32,
    ) -> AppResult<Option<RejectionRecord>>;

    async fn list_unresolved_rejections(&self) -> AppResult<Vec<RejectionRecord>>;

    async fn find_user_email(&self, user_id: i32) -> AppResult<Option<String>>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for Repository {
    async fn find_unit(&self, unit_id: i32) -> AppResult<Option<RentableUnit>> {
        self.units_get_by_id(unit_id).await
    }

    async fn find_overlapping_reservations(
        &self,
        unit_id: i32,
        stay: StayRange,
        statuses: &[ReservationStatus],
    ) -> AppResult<Vec<Reservation>> {
        self.reservations_find_overlapping(unit_id, stay, statuses).await
    }

    async fn find_overlapping_blocks(
        &self,
        unit_id: i32,
        stay: StayRange,
    ) -> AppResult<Vec<UnavailabilityBlock>> {
        self.units_find_overlapping_blocks(unit_id, stay).await
    }

    async fn create_reservation(&self, reservation: &NewReservation) -> AppResult<Reservation> {
        self.reservations_create(reservation).await
    }

    async fn find_reservation(&self, reservation_id: i32) -> AppResult<Option<Reservation>> {
        self.reservations_get_by_id(reservation_id).await
    }

    async fn update_reservation_status(
        &self,
        reservation_id: i32,
        transition: &StatusTransition,
    ) -> AppResult<Option<Reservation>> {
        self.reservations_transition(reservation_id, transition).await
    }

    async fn update_payment_state(
        &self,
        reservation_id: i32,
        payment_state: PaymentState,
    ) -> AppResult<Option<Reservation>> {
        self.reservations_set_payment_state(reservation_id, payment_state).await
    }

    async fn find_special_price_rules(&self, unit_id: i32) -> AppResult<Vec<SpecialPriceRule>> {
        self.rules_special_prices(unit_id).await
    }

    async fn find_promotion_rules(&self, unit_id: i32) -> AppResult<Vec<PromotionRule>> {
        self.rules_promotions(unit_id).await
    }

    async fn create_special_price_rule(&self, rule: &NewSpecialPriceRule) -> AppResult<SpecialPriceRule> {
        self.rules_create_special_price(rule).await
    }

    async fn create_promotion_rule(&self, rule: &NewPromotionRule) -> AppResult<PromotionRule> {
        self.rules_create_promotion(rule).await
    }

    async fn find_commission_config(&self, unit_type: &str) -> AppResult<Option<CommissionConfig>> {
        self.commissions_for_unit_type(unit_type).await
    }

    async fn create_rejection_record(
        &self,
        record: &NewRejectionRecord,
        payment_state: PaymentState,
    ) -> AppResult<Option<RejectionRecord>> {
        self.rejections_create(record, payment_state).await
    }

    async fn resolve_rejection_record(
        &self,
        rejection_id: i32,
        admin_id: i32,
    ) -> AppResult<Option<RejectionRecord>> {
        self.rejections_resolve(rejection_id, admin_id).await
    }

    async fn list_unresolved_rejections(&self) -> AppResult<Vec<RejectionRecord>> {
        self.rejections_list_unresolved().await
    }

    async fn find_user_email(&self, user_id: i32) -> AppResult<Option<String>> {
        self.units_user_email(user_id).await
    }
}
