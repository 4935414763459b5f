use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cinebook_booking::models::{Booking, BookingState, Payment, PaymentState, Review, Voucher};
use cinebook_booking::repository::BookingStore;
use cinebook_catalog::models::{Seat, SeatCategory, Session};
use cinebook_catalog::repository::CatalogStore;
use cinebook_core::CoreError;

/// Postgres-backed store. Every mutating operation is one transaction;
/// booking creation serializes writers per session with a `FOR UPDATE`
/// lock on the session row, which is what upholds the seat-disjointness
/// invariant under concurrent requests.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(
    op: &'static str,
    entity: &'static str,
    id: impl ToString,
) -> impl FnOnce(sqlx::Error) -> CoreError {
    let id = id.to_string();
    move |e| CoreError::Store {
        op,
        entity,
        id,
        detail: e.to_string(),
    }
}

fn parse_booking_state(s: &str, booking_id: Uuid) -> Result<BookingState, CoreError> {
    BookingState::parse(s)
        .ok_or_else(|| CoreError::store("decode", "booking", booking_id, format!("bad state {s:?}")))
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    hall_id: Uuid,
    seat_number: String,
    category: String,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat, CoreError> {
        let category = SeatCategory::parse(&self.category).ok_or_else(|| {
            CoreError::store("decode", "seat", self.id, format!("bad category {:?}", self.category))
        })?;
        Ok(Seat {
            id: self.id,
            hall_id: self.hall_id,
            seat_number: self.seat_number,
            category,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    movie_id: Uuid,
    hall_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    base_price_cents: i64,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    session_id: Uuid,
    total_cents: i64,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    provider_intent_id: String,
    status: String,
    amount_cents: i64,
    voucher_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, CoreError> {
        let status = PaymentState::parse(&self.status).ok_or_else(|| {
            CoreError::store("decode", "payment", self.id, format!("bad status {:?}", self.status))
        })?;
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            provider_intent_id: self.provider_intent_id,
            status,
            amount_cents: self.amount_cents,
            voucher_id: self.voucher_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VoucherRow {
    id: Uuid,
    code: String,
    discount: f64,
    valid_until: DateTime<Utc>,
    usages: i32,
    max_usages: i32,
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    booking_id: Uuid,
    user_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, CoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, movie_id, hall_id, starts_at, ends_at, base_price_cents \
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("get_session", "session", id))?;

        Ok(row.map(|r| Session {
            id: r.id,
            movie_id: r.movie_id,
            hall_id: r.hall_id,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            base_price_cents: r.base_price_cents,
        }))
    }

    async fn get_seat(&self, id: Uuid) -> Result<Option<Seat>, CoreError> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT id, hall_id, seat_number, category FROM seats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("get_seat", "seat", id))?;

        row.map(SeatRow::into_seat).transpose()
    }

    async fn seats_in_hall(&self, hall_id: Uuid) -> Result<Vec<Seat>, CoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, hall_id, seat_number, category FROM seats \
             WHERE hall_id = $1 ORDER BY seat_number",
        )
        .bind(hall_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("seats_in_hall", "hall", hall_id))?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("create_booking", "booking", booking.id))?;

        // Serialize concurrent creations for the same session. An absent
        // row takes no lock, so it must fail here as NotFound rather than
        // fall through to a foreign-key error.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(booking.session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("create_booking", "session", booking.session_id))?
            .ok_or_else(|| CoreError::not_found("session", booking.session_id))?;

        let mut conflicts: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT bs.seat_id FROM booking_seats bs \
             JOIN bookings b ON b.id = bs.booking_id \
             WHERE bs.session_id = $1 AND b.state IN ('PENDING', 'PAID') \
               AND bs.seat_id = ANY($2)",
        )
        .bind(booking.session_id)
        .bind(&booking.seat_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("create_booking", "session", booking.session_id))?;

        if !conflicts.is_empty() {
            conflicts.sort();
            // Dropping the transaction rolls back; nothing was written.
            return Err(CoreError::SeatsUnavailable(conflicts));
        }

        sqlx::query(
            "INSERT INTO bookings (id, user_id, session_id, total_cents, state, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.session_id)
        .bind(booking.total_cents)
        .bind(booking.state.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("create_booking", "booking", booking.id))?;

        for (pos, seat_id) in booking.seat_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO booking_seats (booking_id, session_id, seat_id, pos) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(booking.id)
            .bind(booking.session_id)
            .bind(seat_id)
            .bind(pos as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_err("create_booking", "seat", *seat_id))?;
        }

        tx.commit()
            .await
            .map_err(db_err("create_booking", "booking", booking.id))
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, CoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, session_id, total_cents, state, created_at, updated_at \
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("get_booking", "booking", id))?;

        let Some(row) = row else { return Ok(None) };

        let seat_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT seat_id FROM booking_seats WHERE booking_id = $1 ORDER BY pos",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("get_booking", "booking", id))?;

        Ok(Some(Booking {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            seat_ids,
            total_cents: row.total_cents,
            state: parse_booking_state(&row.state, row.id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn held_seats(&self, session_id: Uuid) -> Result<HashSet<Uuid>, CoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT bs.seat_id FROM booking_seats bs \
             JOIN bookings b ON b.id = bs.booking_id \
             WHERE bs.session_id = $1 AND b.state IN ('PENDING', 'PAID')",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("held_seats", "session", session_id))?;

        Ok(ids.into_iter().collect())
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, CoreError> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM bookings WHERE state = 'PENDING' AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("stale_pending", "booking", "scan"))
    }

    async fn expire_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET state = 'EXPIRED', updated_at = NOW() \
             WHERE id = $1 AND state = 'PENDING'",
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("expire_if_pending", "booking", booking_id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET state = 'CANCELLED', updated_at = NOW() \
             WHERE id = $1 AND state = 'PENDING'",
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("cancel_if_pending", "booking", booking_id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_payment(&self, payment: &Payment) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("upsert_payment", "payment", payment.id))?;

        let paid_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments WHERE booking_id = $1 AND status = 'PAID'",
        )
        .bind(payment.booking_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("upsert_payment", "booking", payment.booking_id))?;
        if paid_exists > 0 {
            return Err(CoreError::InvalidState {
                expected: PaymentState::Pending.as_str().to_string(),
                actual: PaymentState::Paid.as_str().to_string(),
            });
        }

        // Replace any unsettled previous attempt for this booking.
        sqlx::query("DELETE FROM payments WHERE booking_id = $1")
            .bind(payment.booking_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("upsert_payment", "booking", payment.booking_id))?;

        sqlx::query(
            "INSERT INTO payments (id, booking_id, provider_intent_id, status, amount_cents, voucher_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(&payment.provider_intent_id)
        .bind(payment.status.as_str())
        .bind(payment.amount_cents)
        .bind(payment.voucher_id)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("upsert_payment", "payment", payment.id))?;

        tx.commit()
            .await
            .map_err(db_err("upsert_payment", "payment", payment.id))
    }

    async fn payment_by_provider_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<Payment>, CoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, booking_id, provider_intent_id, status, amount_cents, voucher_id, created_at \
             FROM payments WHERE provider_intent_id = $1",
        )
        .bind(provider_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("payment_by_provider_id", "payment", provider_intent_id))?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn finalize_paid(&self, provider_intent_id: &str) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("finalize_paid", "payment", provider_intent_id))?;

        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, booking_id, provider_intent_id, status, amount_cents, voucher_id, created_at \
             FROM payments WHERE provider_intent_id = $1 FOR UPDATE",
        )
        .bind(provider_intent_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("finalize_paid", "payment", provider_intent_id))?
        .ok_or_else(|| CoreError::not_found("payment", provider_intent_id))?;
        let payment = row.into_payment()?;

        if payment.status == PaymentState::Paid {
            return Ok(());
        }

        let moved = sqlx::query(
            "UPDATE bookings SET state = 'PAID', updated_at = NOW() \
             WHERE id = $1 AND state = 'PENDING'",
        )
        .bind(payment.booking_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err("finalize_paid", "booking", payment.booking_id))?;
        if moved.rows_affected() != 1 {
            let actual = sqlx::query_scalar::<_, String>("SELECT state FROM bookings WHERE id = $1")
                .bind(payment.booking_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err("finalize_paid", "booking", payment.booking_id))?
                .unwrap_or_else(|| "MISSING".to_string());
            return Err(CoreError::InvalidState {
                expected: BookingState::Pending.as_str().to_string(),
                actual,
            });
        }

        if let Some(voucher_id) = payment.voucher_id {
            // Cap and expiry re-checked inside the settling transaction.
            let used = sqlx::query(
                "UPDATE vouchers SET usages = usages + 1 \
                 WHERE id = $1 AND usages < max_usages AND valid_until > NOW()",
            )
            .bind(voucher_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("finalize_paid", "voucher", voucher_id))?;
            if used.rows_affected() != 1 {
                return Err(CoreError::VoucherInvalid(format!(
                    "voucher {} expired or exhausted at confirmation",
                    voucher_id
                )));
            }
        }

        sqlx::query("UPDATE payments SET status = 'PAID' WHERE id = $1")
            .bind(payment.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("finalize_paid", "payment", payment.id))?;

        tx.commit()
            .await
            .map_err(db_err("finalize_paid", "payment", provider_intent_id))
    }

    async fn mark_payment_failed(&self, provider_intent_id: &str) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'FAILED' \
             WHERE provider_intent_id = $1 AND status <> 'PAID'",
        )
        .bind(provider_intent_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("mark_payment_failed", "payment", provider_intent_id))?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            // Either the payment is unknown or it already settled as Paid.
            match self.payment_by_provider_id(provider_intent_id).await? {
                Some(p) => Err(CoreError::InvalidState {
                    expected: PaymentState::Pending.as_str().to_string(),
                    actual: p.status.as_str().to_string(),
                }),
                None => Err(CoreError::not_found("payment", provider_intent_id)),
            }
        }
    }

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, CoreError> {
        let row = sqlx::query_as::<_, VoucherRow>(
            "SELECT id, code, discount, valid_until, usages, max_usages \
             FROM vouchers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("get_voucher", "voucher", id))?;

        Ok(row.map(|r| Voucher {
            id: r.id,
            code: r.code,
            discount: r.discount,
            valid_until: r.valid_until,
            usages: r.usages,
            max_usages: r.max_usages,
        }))
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        // The unique constraint on booking_id is the arbiter.
        let result = sqlx::query(
            "INSERT INTO reviews (id, booking_id, user_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (booking_id) DO NOTHING",
        )
        .bind(review.id)
        .bind(review.booking_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert_review", "review", review.id))?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(CoreError::InvalidRequest(format!(
                "booking {} already has a review",
                review.booking_id
            )))
        }
    }

    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, CoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, booking_id, user_id, rating, comment, created_at \
             FROM reviews WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("review_for_booking", "booking", booking_id))?;

        Ok(row.map(|r| Review {
            id: r.id,
            booking_id: r.booking_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }))
    }
}
