//! Notification sink that records every request.

#![allow(clippy::unwrap_used, clippy::panic)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use mentorship_core::{NotificationRequest, NotificationSink, StoreError, StoreFuture, UserId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Captures notifications instead of delivering them.
///
/// Switch it to failing mode with [`RecordingNotifier::fail_all`] to check
/// that notification errors never leak into the triggering operation.
///
/// Delivery happens on a background task, so assertions should first
/// [`wait_for`](RecordingNotifier::wait_for) the expected number of attempts.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
    failing: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingNotifier {
    /// Create a recorder that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent request with a database error.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of delivery attempts, accepted or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `attempts` deliveries have been tried.
    ///
    /// Panics after one second.
    pub async fn wait_for(&self, attempts: usize) {
        let reached = tokio::time::timeout(Duration::from_secs(1), async {
            while self.attempts() < attempts {
                tokio::task::yield_now().await;
            }
        })
        .await;

        if reached.is_err() {
            panic!(
                "expected {attempts} notification attempts, saw {}",
                self.attempts()
            );
        }
    }

    /// Everything accepted so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications addressed to `user_id`.
    #[must_use]
    pub fn sent_to(&self, user_id: UserId) -> Vec<NotificationRequest> {
        self.sent()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn create_notification(
        &self,
        request: NotificationRequest,
    ) -> StoreFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Database("notification service down".to_string()));
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        })
    }
}
