//! Bookings repository

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, BookingRow, BookingState, BookingStatus, NewBooking},
    pagination::PageRequest,
};

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.item_id, i.name AS item_name, i.owner_id AS item_owner_id,
           b.booker_id, b.start_date, b.end_date, b.status
    FROM bookings b
    JOIN items i ON i.id = b.item_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Booking>>;

    /// Insert a booking in WAITING status
    async fn create(&self, booking: &NewBooking) -> AppResult<Booking>;

    /// Move a booking from `from` to `to`. Returns `None` when the booking is
    /// missing or no longer in status `from`.
    async fn transition(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<Option<Booking>>;

    /// Bookings made by a user, newest start first
    async fn list_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>>;

    /// Bookings of items owned by a user, newest start first
    async fn list_by_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>>;

    /// Booking with the latest end among those already over
    async fn last_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>>;

    /// Booking with the earliest start among those not yet begun
    async fn next_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>>;

    /// Whether the user has an approved booking of the item that has ended
    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgBookingRepository {
    pool: Pool<Postgres>,
}

impl PgBookingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_one_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE b.id = $1", BOOKING_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_filtered(
        &self,
        column: &str,
        user_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        let mut builder = QueryBuilder::<Postgres>::new(BOOKING_SELECT);
        builder.push(" WHERE ").push(column).push(" = ").push_bind(user_id);
        push_state_filter(&mut builder, state, now);
        builder
            .push(" ORDER BY b.start_date DESC, b.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = builder
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

/// Append the SQL equivalent of [`BookingState::matches`]
fn push_state_filter(builder: &mut QueryBuilder<'_, Postgres>, state: BookingState, now: NaiveDateTime) {
    match state {
        BookingState::All => {}
        BookingState::Current => {
            builder
                .push(" AND b.start_date < ")
                .push_bind(now)
                .push(" AND b.end_date > ")
                .push_bind(now);
        }
        BookingState::Past => {
            builder.push(" AND b.end_date < ").push_bind(now);
        }
        BookingState::Future => {
            builder.push(" AND b.start_date > ").push_bind(now);
        }
        BookingState::Waiting => {
            builder
                .push(" AND b.status = ")
                .push_bind(BookingStatus::Waiting.as_str());
        }
        BookingState::Rejected => {
            builder
                .push(" AND b.status = ")
                .push_bind(BookingStatus::Rejected.as_str());
        }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        self.fetch_one_by_id(id).await
    }

    async fn create(&self, booking: &NewBooking) -> AppResult<Booking> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bookings (item_id, booker_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(booking.item_id)
        .bind(booking.booker_id)
        .bind(booking.start)
        .bind(booking.end)
        .bind(BookingStatus::Waiting.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.fetch_one_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Booking {} vanished after insert", id)))
    }

    async fn transition(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_one_by_id(id).await
    }

    async fn list_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        self.list_filtered("b.booker_id", booker_id, state, now, page).await
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        self.list_filtered("i.owner_id", owner_id, state, now, page).await
    }

    async fn last_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE b.item_id = $1 AND b.end_date < $2 ORDER BY b.end_date DESC LIMIT 1",
            BOOKING_SELECT
        ))
        .bind(item_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn next_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE b.item_id = $1 AND b.start_date > $2 ORDER BY b.start_date ASC LIMIT 1",
            BOOKING_SELECT
        ))
        .bind(item_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE booker_id = $1 AND item_id = $2 AND status = $3 AND end_date < $4
            )
            "#,
        )
        .bind(booker_id)
        .bind(item_id)
        .bind(BookingStatus::Approved.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
