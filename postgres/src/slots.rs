use crate::error::db_error;
use crate::rows::{self, SLOT_COLUMNS};
use crate::PostgresStore;
use mentorship_core::{
    CloseOutcome, Slot, SlotFilter, SlotId, SlotStatus, SlotStore, StoreError, StoreFuture, UserId,
};
use sqlx::Row;

impl SlotStore for PostgresStore {
    fn insert_slot(&self, slot: Slot) -> StoreFuture<'_, Result<Slot, StoreError>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO slots
                    (id, mentor_id, slot_date, start_time, end_time, price_cents, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(slot.id.as_uuid())
            .bind(slot.mentor_id.as_uuid())
            .bind(slot.date)
            .bind(slot.start_time.as_naive())
            .bind(slot.end_time.as_naive())
            .bind(slot.price.cents())
            .bind(slot.status.as_str())
            .bind(slot.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert slot", e))?;

            Ok(slot)
        })
    }

    fn get_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<Option<Slot>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1"))
                .bind(slot_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to get slot", e))?;

            row.as_ref().map(rows::slot).transpose()
        })
    }

    fn list_slots(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> StoreFuture<'_, Result<Vec<Slot>, StoreError>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {SLOT_COLUMNS}
                FROM slots
                WHERE mentor_id = $1
                  AND ($2::TEXT IS NULL OR status = $2)
                  AND ($3::DATE IS NULL OR slot_date = $3)
                  AND ($4::DATE IS NULL OR slot_date >= $4)
                  AND ($5::DATE IS NULL OR slot_date <= $5)
                ORDER BY slot_date, start_time
                "
            ))
            .bind(mentor_id.as_uuid())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.date)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list slots", e))?;

            rows.iter().map(rows::slot).collect()
        })
    }

    fn close_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<CloseOutcome, StoreError>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| db_error("Failed to start transaction", e))?;

            // Lock the slot so a concurrent checkout cannot book it mid-close
            let locked = sqlx::query("SELECT status FROM slots WHERE id = $1 FOR UPDATE")
                .bind(slot_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to lock slot", e))?;

            let Some(locked) = locked else {
                return Ok(CloseOutcome::NotFound);
            };
            let status: SlotStatus = rows::column::<String>(&locked, "status")?
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("slot status: {e}")))?;

            let referenced: bool = sqlx::query(
                r#"SELECT EXISTS(SELECT 1 FROM booking_items WHERE slot_id = $1) AS "exists""#,
            )
            .bind(slot_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to check booking items", e))?
            .try_get("exists")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

            if referenced {
                return Ok(CloseOutcome::HasBooking);
            }
            if status != SlotStatus::Available {
                return Ok(CloseOutcome::NotAvailable(status));
            }

            // cart_items cascade
            sqlx::query("DELETE FROM slots WHERE id = $1")
                .bind(slot_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to delete slot", e))?;

            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;

            Ok(CloseOutcome::Closed)
        })
    }
}
