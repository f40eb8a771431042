//! Mentor slot management.
//!
//! Opening and closing are gated by the 48-hour lead time; closing and the
//! status re-check happen atomically in the store.

use crate::environment::BookingEnvironment;
use crate::error::SlotError;
use crate::metrics;
use crate::store::{CloseOutcome, StoreError};
use crate::time_window::{calculate_end_time, is_at_least_48_hours_away};
use crate::types::{
    Role, Slot, SlotFilter, SlotId, SlotStatus, SlotStatusCounts, SlotTime, UserId,
};
use chrono::NaiveDate;
use serde::Serialize;

/// A mentor's own slot listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorSlots {
    /// Slots matching every filter
    pub slots: Vec<Slot>,
    /// Status counts over the date-filtered listing, ignoring the status filter
    pub counts: SlotStatusCounts,
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns `SlotError::InvalidInput` for anything else.
pub fn parse_date(raw: &str) -> Result<NaiveDate, SlotError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SlotError::InvalidInput(format!("invalid date '{raw}': expected YYYY-MM-DD")))
}

/// Opens, closes and lists slots.
#[derive(Clone)]
pub struct SlotService {
    env: BookingEnvironment,
}

impl SlotService {
    /// Create a new slot service.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Open a slot for `mentor_id` at `date` / `start_time`.
    ///
    /// The price is snapshotted from the mentor's rate, falling back to the
    /// category rate.
    ///
    /// # Errors
    ///
    /// - `MentorNotFound` / `NotAMentor`: caller is not a known mentor
    /// - `TooSoon`: the slot starts less than 48 hours from now
    /// - `NoPriceConfigured`: no rate to snapshot
    /// - `SlotConflict`: the mentor already has a slot at that instant
    #[tracing::instrument(skip(self), fields(%mentor_id, %date, %start_time))]
    pub async fn open(
        &self,
        mentor_id: UserId,
        date: NaiveDate,
        start_time: SlotTime,
    ) -> Result<Slot, SlotError> {
        let now = self.env.clock.now();

        let profile = self
            .env
            .mentors
            .mentor_profile(mentor_id)
            .await?
            .ok_or(SlotError::MentorNotFound)?;
        if profile.role != Role::Mentor {
            return Err(SlotError::NotAMentor);
        }

        if !is_at_least_48_hours_away(date, start_time, now) {
            return Err(SlotError::TooSoon);
        }

        let price = profile.effective_price().ok_or(SlotError::NoPriceConfigured)?;

        let slot = Slot {
            id: SlotId::new(),
            mentor_id,
            date,
            start_time,
            end_time: calculate_end_time(start_time),
            price,
            status: SlotStatus::Available,
            created_at: now,
        };

        let slot = self.env.slots.insert_slot(slot).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => SlotError::SlotConflict,
            other => SlotError::Store(other),
        })?;

        metrics::record_slot("opened");
        tracing::info!(slot_id = %slot.id, price = %slot.price, "Slot opened");
        Ok(slot)
    }

    /// Close (delete) one of the mentor's slots.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden` (not the owner)
    /// - `TooSoon`: the slot starts less than 48 hours from now
    /// - `HasBooking` / `NotAvailable`: the slot is or was booked
    #[tracing::instrument(skip(self), fields(%mentor_id, %slot_id))]
    pub async fn close(&self, mentor_id: UserId, slot_id: SlotId) -> Result<(), SlotError> {
        let now = self.env.clock.now();

        let slot = self
            .env
            .slots
            .get_slot(slot_id)
            .await?
            .ok_or(SlotError::NotFound)?;

        if slot.mentor_id != mentor_id {
            return Err(SlotError::Forbidden);
        }

        if !is_at_least_48_hours_away(slot.date, slot.start_time, now) {
            return Err(SlotError::TooSoon);
        }

        match self.env.slots.close_slot(slot_id).await? {
            CloseOutcome::Closed => {
                metrics::record_slot("closed");
                tracing::info!("Slot closed");
                Ok(())
            }
            CloseOutcome::NotFound => Err(SlotError::NotFound),
            CloseOutcome::HasBooking => Err(SlotError::HasBooking),
            CloseOutcome::NotAvailable(status) => Err(SlotError::NotAvailable(status)),
        }
    }

    /// The mentor's own slots with per-status counts.
    ///
    /// # Errors
    ///
    /// Returns `SlotError::Store` if the listing cannot be read.
    pub async fn list_for_mentor(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> Result<MentorSlots, SlotError> {
        let status = filter.status;
        let dated = SlotFilter {
            status: None,
            ..filter
        };

        let all = self.env.slots.list_slots(mentor_id, dated).await?;
        let counts = SlotStatusCounts::tally(&all);
        let slots = all
            .into_iter()
            .filter(|slot| status.is_none_or(|s| s == slot.status))
            .collect();

        Ok(MentorSlots { slots, counts })
    }

    /// Public listing of a verified mentor's bookable slots.
    ///
    /// Only AVAILABLE slots from today onwards are returned; date filters in
    /// the past are clamped to today.
    ///
    /// # Errors
    ///
    /// - `MentorNotFound`: unknown user
    /// - `MentorUnavailable`: the user is not a verified mentor
    pub async fn list_available_for_mentor(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> Result<Vec<Slot>, SlotError> {
        let today = self.env.clock.now().date_naive();

        let profile = self
            .env
            .mentors
            .mentor_profile(mentor_id)
            .await?
            .ok_or(SlotError::MentorNotFound)?;
        if profile.role != Role::Mentor || !profile.is_verified {
            return Err(SlotError::MentorUnavailable);
        }

        if filter.date.is_some_and(|d| d < today) {
            return Ok(Vec::new());
        }

        let clamped = SlotFilter {
            status: Some(SlotStatus::Available),
            date: filter.date,
            start_date: Some(filter.start_date.map_or(today, |d| d.max(today))),
            end_date: filter.end_date,
        };

        Ok(self.env.slots.list_slots(mentor_id, clamped).await?)
    }
}
