//! Reservations repository: guarded inserts and conditional transitions

use chrono::NaiveDate;
use sqlx::{types::Json, Postgres, Transaction};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        capacity::CapacityModel,
        enums::{PaymentState, ReservationStatus},
        reservation::{NewReservation, Reservation, ReservationRow, StatusTransition},
        stay::StayRange,
    },
};

impl Repository {
    /// Get reservation by ID
    pub async fn reservations_get_by_id(&self, id: i32) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, ReservationRow>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Reservation::try_from)
            .transpose()
    }

    /// Reservations on a unit sharing a night with `stay`, filtered by status
    pub async fn reservations_find_overlapping(
        &self,
        unit_id: i32,
        stay: StayRange,
        statuses: &[ReservationStatus],
    ) -> AppResult<Vec<Reservation>> {
        let codes: Vec<i16> = statuses.iter().map(|s| i16::from(*s)).collect();
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT * FROM reservations
            WHERE unit_id = $1
              AND start_date < $3 AND end_date > $2
              AND status = ANY($4)
            ORDER BY start_date
            "#,
        )
        .bind(unit_id)
        .bind(stay.start())
        .bind(stay.end())
        .bind(&codes)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    /// Insert a reservation after re-checking the unit under a row lock
    pub async fn reservations_create(&self, data: &NewReservation) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        ensure_room(&mut tx, data.unit_id, data.stay, None).await?;

        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            INSERT INTO reservations (
                unit_id, guest_id, start_date, end_date, guest_count, status,
                accepted, confirmed, payment_ref, payment_state, pricing
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.unit_id)
        .bind(data.guest_id)
        .bind(data.stay.start())
        .bind(data.stay.end())
        .bind(data.guest_count)
        .bind(i16::from(data.status))
        .bind(data.signoff.accepted)
        .bind(data.signoff.confirmed)
        .bind(&data.payment.reference)
        .bind(i16::from(data.payment.state))
        .bind(Json(&data.pricing))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Reservation::try_from(row)
    }

    /// Conditional status update; `None` when the row left `transition.from`
    pub async fn reservations_transition(
        &self,
        id: i32,
        transition: &StatusTransition,
    ) -> AppResult<Option<Reservation>> {
        transition.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ReservationRow>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::ReservationNotFound(id))?;

        if current.status != i16::from(transition.from) {
            tx.rollback().await?;
            return Ok(None);
        }

        if transition.takes_capacity() {
            let stay = StayRange::new(current.start_date, current.end_date)?;
            ensure_room(&mut tx, current.unit_id, stay, Some(id)).await?;
        }

        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            UPDATE reservations
            SET status = $2, accepted = $3, confirmed = $4, payment_state = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(i16::from(transition.to))
        .bind(transition.signoff.accepted)
        .bind(transition.signoff.confirmed)
        .bind(i16::from(transition.payment_state))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Reservation::try_from(row).map(Some)
    }

    /// Record where the guest's money stands without touching the status
    pub async fn reservations_set_payment_state(
        &self,
        id: i32,
        payment_state: PaymentState,
    ) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, ReservationRow>(
            r#"
            UPDATE reservations
            SET payment_state = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(i16::from(payment_state))
        .fetch_optional(&self.pool)
        .await?
        .map(Reservation::try_from)
        .transpose()
    }
}

/// Lock the unit row and fail with `NotAvailable` if `stay` is blocked or
/// the unit has no free room, counting RESERVED stays other than `exclude`.
///
/// The unit row lock serializes every guarded write on the same unit.
async fn ensure_room(
    tx: &mut Transaction<'_, Postgres>,
    unit_id: i32,
    stay: StayRange,
    exclude: Option<i32>,
) -> AppResult<()> {
    let capacity_rooms: i32 = sqlx::query_scalar(
        "SELECT capacity_rooms FROM rentable_units WHERE id = $1 FOR UPDATE",
    )
    .bind(unit_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::UnitNotFound(unit_id))?;

    let blocked: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM unavailability_blocks
            WHERE unit_id = $1 AND start_date < $3 AND end_date > $2
        )
        "#,
    )
    .bind(unit_id)
    .bind(stay.start())
    .bind(stay.end())
    .fetch_one(&mut **tx)
    .await?;

    if blocked {
        return Err(AppError::NotAvailable(format!(
            "unit {} is blocked during {}",
            unit_id, stay
        )));
    }

    let reserved: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT start_date, end_date FROM reservations
        WHERE unit_id = $1
          AND status = $4
          AND start_date < $3 AND end_date > $2
          AND ($5::INT IS NULL OR id <> $5)
        "#,
    )
    .bind(unit_id)
    .bind(stay.start())
    .bind(stay.end())
    .bind(i16::from(ReservationStatus::Reserved))
    .bind(exclude)
    .fetch_all(&mut **tx)
    .await?;

    let reserved: Vec<StayRange> = reserved
        .into_iter()
        .filter_map(|(start, end)| StayRange::new(start, end).ok())
        .collect();

    let model = CapacityModel::from_rooms(capacity_rooms);
    let booked = model.booked(&stay, &reserved);
    if !model.has_room(booked) {
        return Err(AppError::NotAvailable(format!(
            "unit {} has {} of {} rooms booked during {}",
            unit_id,
            booked,
            model.rooms(),
            stay
        )));
    }
    Ok(())
}
