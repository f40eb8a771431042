//! Fire-and-forget notification dispatch.

use crate::metrics;
use crate::store::NotificationSink;
use crate::types::{NotificationRequest, UserId};
use std::sync::Arc;

/// Hand a notification to a background task, logging and dropping any
/// failure.
///
/// Called after the triggering transaction has committed. The caller never
/// waits for delivery and its outcome never depends on it. Outside a Tokio
/// runtime the notification is dropped with a warning.
pub fn dispatch(sink: &Arc<dyn NotificationSink>, user_id: UserId, title: &'static str, message: String) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        metrics::record_notification_failure();
        tracing::warn!(%user_id, title, "No runtime available, notification dropped");
        return;
    };

    let sink = Arc::clone(sink);
    runtime.spawn(async move {
        let request = NotificationRequest {
            user_id,
            title: title.to_string(),
            message,
        };

        if let Err(error) = sink.create_notification(request).await {
            metrics::record_notification_failure();
            tracing::warn!(%user_id, title, %error, "Failed to create notification");
        }
    });
}
