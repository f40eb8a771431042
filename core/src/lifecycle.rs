//! Booking lifecycle after checkout: cancellation, listings and status
//! promotion.

use crate::environment::BookingEnvironment;
use crate::error::{CancelError, StatusError};
use crate::metrics;
use crate::notify;
use crate::store::{StoreError, TransitionError};
use crate::time_window::has_started;
use crate::types::{Booking, BookingId, BookingScope, BookingStatus, BookingWithItems, UserId};

/// Which party cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelledBy {
    /// The booking's student
    Student,
    /// The booking's mentor
    Mentor,
}

impl CancelledBy {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Mentor => "mentor",
        }
    }
}

/// Cancels, lists and promotes bookings.
#[derive(Clone)]
pub struct BookingLifecycle {
    env: BookingEnvironment,
}

impl BookingLifecycle {
    /// Create a new lifecycle service.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Cancel a booking on behalf of its student or mentor.
    ///
    /// Booking, items and slots change together; the other party is notified
    /// afterwards.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden` (neither student nor mentor)
    /// - `AlreadyCancelled`, `CannotCancelCompleted`
    /// - `HasPassedSlot`: any item's slot has started
    #[tracing::instrument(skip(self), fields(%actor_id, %booking_id))]
    pub async fn cancel(
        &self,
        actor_id: UserId,
        booking_id: BookingId,
    ) -> Result<BookingWithItems, CancelError> {
        let now = self.env.clock.now();

        let current = self
            .env
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(CancelError::NotFound)?;

        let cancelled_by = if actor_id == current.booking.student_id {
            CancelledBy::Student
        } else if actor_id == current.booking.mentor_id {
            CancelledBy::Mentor
        } else {
            return Err(CancelError::Forbidden);
        };

        check_cancellable(current.booking.status)?;

        if current
            .items
            .iter()
            .any(|item| has_started(item.date, item.start_time, now))
        {
            return Err(CancelError::HasPassedSlot);
        }

        let cancelled = self
            .env
            .bookings
            .cancel_booking(booking_id)
            .await
            .map_err(|e| match e {
                TransitionError::NotFound => CancelError::NotFound,
                TransitionError::InvalidState(status) => {
                    check_cancellable(status).err().unwrap_or(CancelError::AlreadyCancelled)
                }
                TransitionError::Store(store) => CancelError::Store(store),
            })?;

        metrics::record_booking("cancelled");
        tracing::info!(by = cancelled_by.as_str(), slots = cancelled.items.len(), "Booking cancelled");

        let recipient = match cancelled_by {
            CancelledBy::Student => cancelled.booking.mentor_id,
            CancelledBy::Mentor => cancelled.booking.student_id,
        };
        notify::dispatch(
            &self.env.notifier,
            recipient,
            "Booking cancelled",
            format!(
                "A booking for {} slot(s) was cancelled by the {}.",
                cancelled.items.len(),
                cancelled_by.as_str()
            ),
        );

        Ok(cancelled)
    }

    /// Every booking, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error if the listing cannot be read.
    pub async fn list_all(&self) -> Result<Vec<BookingWithItems>, StoreError> {
        self.env.bookings.list_bookings(BookingScope::All).await
    }

    /// Bookings where `mentor_id` is the mentor, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error if the listing cannot be read.
    pub async fn list_for_mentor(
        &self,
        mentor_id: UserId,
    ) -> Result<Vec<BookingWithItems>, StoreError> {
        self.env
            .bookings
            .list_bookings(BookingScope::Mentor(mentor_id))
            .await
    }

    /// Bookings where `student_id` is the student, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error if the listing cannot be read.
    pub async fn list_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<BookingWithItems>, StoreError> {
        self.env
            .bookings
            .list_bookings(BookingScope::Student(student_id))
            .await
    }

    /// Promote a booking to CONFIRMED or COMPLETED.
    ///
    /// Checkout leaves bookings PENDING; whatever confirms or completes them
    /// (an admin, a payment step) comes through here. Cancellation has its
    /// own path and is rejected.
    ///
    /// # Errors
    ///
    /// - `NotFound`
    /// - `InvalidTransition`: the move is not in the state machine
    #[tracing::instrument(skip(self), fields(%booking_id, %target))]
    pub async fn transition(
        &self,
        booking_id: BookingId,
        target: BookingStatus,
    ) -> Result<Booking, StatusError> {
        let allowed_from = target.promotable_from();

        let booking = self
            .env
            .bookings
            .update_booking_status(booking_id, allowed_from, target)
            .await
            .map_err(|e| match e {
                TransitionError::NotFound => StatusError::NotFound,
                TransitionError::InvalidState(from) => StatusError::InvalidTransition { from, to: target },
                TransitionError::Store(store) => StatusError::Store(store),
            })?;

        metrics::record_booking(match target {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Pending | BookingStatus::Cancelled => "other",
        });
        tracing::info!("Booking status changed");
        Ok(booking)
    }
}

fn check_cancellable(status: BookingStatus) -> Result<(), CancelError> {
    match status {
        BookingStatus::Cancelled => Err(CancelError::AlreadyCancelled),
        BookingStatus::Completed => Err(CancelError::CannotCancelCompleted),
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
    }
}
