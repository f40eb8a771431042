//! Bookings and the multi-row units of work.
//!
//! `commit_group`, `cancel_booking` and `update_booking_status` each run in
//! one transaction. Rows whose status decides the outcome are locked with
//! `SELECT ... FOR UPDATE` and re-checked before anything is written, so the
//! plain reads callers make beforehand never decide correctness.

use crate::error::{db_error, violates};
use crate::rows::{self, BOOKING_COLUMNS, BOOKING_ITEM_COLUMNS};
use crate::PostgresStore;
use mentorship_core::{
    Booking, BookingId, BookingItem, BookingScope, BookingStatus, BookingStore, BookingWithItems,
    CommitError, NewBooking, SlotStatus, StoreError, StoreFuture, TransitionError,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use std::collections::HashMap;
use uuid::Uuid;

const ACTIVE_SLOT_INDEX: &str = "booking_items_active_slot_idx";

impl PostgresStore {
    async fn items_of(
        conn: &mut PgConnection,
        booking_ids: &[Uuid],
    ) -> Result<Vec<BookingItem>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {BOOKING_ITEM_COLUMNS}
            FROM booking_items
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, position
            "
        ))
        .bind(booking_ids)
        .fetch_all(conn)
        .await
        .map_err(|e| db_error("Failed to load booking items", e))?;

        rows.iter().map(rows::booking_item).collect()
    }

    /// Lock slot rows in id order.
    ///
    /// Every transaction that writes several slots goes through here, so two
    /// of them always queue on the same first row instead of deadlocking.
    async fn lock_slots(conn: &mut PgConnection, slot_ids: &[Uuid]) -> Result<Vec<PgRow>, StoreError> {
        sqlx::query("SELECT id, status FROM slots WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(slot_ids)
            .fetch_all(conn)
            .await
            .map_err(|e| db_error("Failed to lock slots", e))
    }

    /// Lock a booking row and return its current status.
    async fn lock_booking(
        conn: &mut PgConnection,
        booking_id: BookingId,
    ) -> Result<BookingStatus, TransitionError> {
        let row = sqlx::query("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(|e| db_error("Failed to lock booking", e))?
            .ok_or(TransitionError::NotFound)?;

        rows::column::<String>(&row, "status")?
            .parse()
            .map_err(|e| TransitionError::Store(StoreError::Corrupt(format!("booking status: {e}"))))
    }
}

impl BookingStore for PostgresStore {
    fn commit_group(
        &self,
        new_booking: NewBooking,
    ) -> StoreFuture<'_, Result<BookingWithItems, CommitError>> {
        Box::pin(async move {
            let NewBooking {
                booking: BookingWithItems { booking, items },
                cart_item_ids,
            } = new_booking;

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("Failed to start transaction", e))?;

            let slot_ids: Vec<Uuid> = items.iter().map(|item| *item.slot_id.as_uuid()).collect();
            let locked = Self::lock_slots(&mut *tx, &slot_ids).await?;

            let mut statuses: HashMap<Uuid, SlotStatus> = HashMap::with_capacity(locked.len());
            for row in &locked {
                let id: Uuid = rows::column(row, "id")?;
                let status = rows::column::<String>(row, "status")?
                    .parse()
                    .map_err(|e| StoreError::Corrupt(format!("slot status: {e}")))?;
                statuses.insert(id, status);
            }

            for item in &items {
                let status = statuses.get(item.slot_id.as_uuid()).copied();
                if status != Some(SlotStatus::Available) {
                    return Err(CommitError::SlotUnavailable {
                        slot_id: item.slot_id,
                        status,
                    });
                }
            }

            sqlx::query(
                r"
                INSERT INTO bookings
                    (id, student_id, mentor_id, total_price_cents, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.student_id.as_uuid())
            .bind(booking.mentor_id.as_uuid())
            .bind(booking.total_price.cents())
            .bind(booking.status.as_str())
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to insert booking", e))?;

            for (position, item) in (0_i32..).zip(&items) {
                sqlx::query(
                    r"
                    INSERT INTO booking_items
                        (id, booking_id, position, slot_id, mentor_id, slot_date, start_time,
                         end_time, price_cents, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ",
                )
                .bind(item.id.as_uuid())
                .bind(item.booking_id.as_uuid())
                .bind(position)
                .bind(item.slot_id.as_uuid())
                .bind(item.mentor_id.as_uuid())
                .bind(item.date)
                .bind(item.start_time.as_naive())
                .bind(item.end_time.as_naive())
                .bind(item.price.cents())
                .bind(item.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if violates(&e, ACTIVE_SLOT_INDEX) {
                        CommitError::SlotUnavailable {
                            slot_id: item.slot_id,
                            status: Some(SlotStatus::Booked),
                        }
                    } else {
                        CommitError::Store(db_error("Failed to insert booking item", e))
                    }
                })?;
            }

            sqlx::query("UPDATE slots SET status = 'BOOKED' WHERE id = ANY($1)")
                .bind(&slot_ids)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to mark slots booked", e))?;

            let cart_item_ids: Vec<Uuid> = cart_item_ids.iter().map(|id| *id.as_uuid()).collect();
            sqlx::query("UPDATE cart_items SET status = 'CHECKED_OUT' WHERE id = ANY($1)")
                .bind(&cart_item_ids)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to check out cart items", e))?;

            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;

            Ok(BookingWithItems { booking, items })
        })
    }

    fn get_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<Option<BookingWithItems>, StoreError>> {
        Box::pin(async move {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| db_error("Failed to acquire connection", e))?;

            let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                .bind(booking_id.as_uuid())
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| db_error("Failed to get booking", e))?;

            let Some(row) = row else {
                return Ok(None);
            };
            let booking = rows::booking(&row)?;
            let items = Self::items_of(&mut *conn, &[*booking_id.as_uuid()]).await?;
            Ok(Some(BookingWithItems { booking, items }))
        })
    }

    fn list_bookings(
        &self,
        scope: BookingScope,
    ) -> StoreFuture<'_, Result<Vec<BookingWithItems>, StoreError>> {
        Box::pin(async move {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| db_error("Failed to acquire connection", e))?;

            let (filter, party) = match scope {
                BookingScope::All => ("TRUE", None),
                BookingScope::Mentor(id) => ("mentor_id = $1", Some(*id.as_uuid())),
                BookingScope::Student(id) => ("student_id = $1", Some(*id.as_uuid())),
            };
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {filter} ORDER BY created_at DESC, id"
            );
            let mut query = sqlx::query(&sql);
            if let Some(party) = party {
                query = query.bind(party);
            }
            let rows = query
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| db_error("Failed to list bookings", e))?;

            let bookings = rows
                .iter()
                .map(rows::booking)
                .collect::<Result<Vec<Booking>, _>>()?;
            let ids: Vec<Uuid> = bookings.iter().map(|b| *b.id.as_uuid()).collect();
            let items = Self::items_of(&mut *conn, &ids).await?;

            Ok(rows::with_items(bookings, items))
        })
    }

    fn cancel_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<BookingWithItems, TransitionError>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("Failed to start transaction", e))?;

            let status = Self::lock_booking(&mut *tx, booking_id).await?;
            if status.is_terminal() {
                return Err(TransitionError::InvalidState(status));
            }

            // Slots before items, the same order checkout takes them in
            let slot_ids: Vec<Uuid> = sqlx::query("SELECT slot_id FROM booking_items WHERE booking_id = $1")
                .bind(booking_id.as_uuid())
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to load booked slots", e))?
                .iter()
                .map(|row| rows::column::<Uuid>(row, "slot_id"))
                .collect::<Result<_, _>>()?;
            Self::lock_slots(&mut *tx, &slot_ids).await?;

            let row = sqlx::query(&format!(
                r"
                UPDATE bookings SET status = 'CANCELLED', updated_at = now()
                WHERE id = $1
                RETURNING {BOOKING_COLUMNS}
                "
            ))
            .bind(booking_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to cancel booking", e))?;
            let booking = rows::booking(&row)?;

            let released: Vec<Uuid> = sqlx::query(
                "UPDATE booking_items SET status = 'CANCELLED' WHERE booking_id = $1 RETURNING slot_id",
            )
            .bind(booking_id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to cancel booking items", e))?
            .iter()
            .map(|row| row.try_get::<Uuid, _>("slot_id"))
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

            sqlx::query("UPDATE slots SET status = 'AVAILABLE' WHERE id = ANY($1) AND status = 'BOOKED'")
                .bind(&released)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to release slots", e))?;

            let items = Self::items_of(&mut *tx, &[*booking_id.as_uuid()]).await?;

            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;

            tracing::debug!(%booking_id, slots = released.len(), "Slots released");
            Ok(BookingWithItems { booking, items })
        })
    }

    fn update_booking_status(
        &self,
        booking_id: BookingId,
        allowed_from: &'static [BookingStatus],
        target: BookingStatus,
    ) -> StoreFuture<'_, Result<Booking, TransitionError>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("Failed to start transaction", e))?;

            let status = Self::lock_booking(&mut *tx, booking_id).await?;
            if !allowed_from.contains(&status) {
                return Err(TransitionError::InvalidState(status));
            }

            let row = sqlx::query(&format!(
                r"
                UPDATE bookings SET status = $2, updated_at = now()
                WHERE id = $1
                RETURNING {BOOKING_COLUMNS}
                "
            ))
            .bind(booking_id.as_uuid())
            .bind(target.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to update booking status", e))?;

            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;

            Ok(rows::booking(&row)?)
        })
    }
}
