//! Collaborator-owned tables: mentor reference data (read only) and
//! notification storage (insert only).

use crate::error::db_error;
use crate::rows;
use crate::PostgresStore;
use mentorship_core::{
    MentorDirectory, MentorProfile, NotificationRequest, NotificationSink, StoreError, StoreFuture,
    UserId,
};
use uuid::Uuid;

impl MentorDirectory for PostgresStore {
    fn mentor_profile(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Option<MentorProfile>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT u.id, u.name, u.role,
                       COALESCE(m.is_verified, FALSE) AS is_verified,
                       m.price_cents,
                       c.price_cents AS category_price_cents
                FROM users u
                LEFT JOIN mentors m ON m.user_id = u.id
                LEFT JOIN categories c ON c.id = m.category_id
                WHERE u.id = $1
                ",
            )
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load mentor profile", e))?;

            row.as_ref().map(rows::mentor_profile).transpose()
        })
    }
}

impl NotificationSink for PostgresStore {
    fn create_notification(
        &self,
        request: NotificationRequest,
    ) -> StoreFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO notifications (id, user_id, title, message)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(request.user_id.as_uuid())
            .bind(&request.title)
            .bind(&request.message)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create notification", e))?;

            Ok(())
        })
    }
}
