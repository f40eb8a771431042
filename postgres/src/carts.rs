use crate::error::db_error;
use crate::rows::{self, CART_ITEM_COLUMNS};
use crate::PostgresStore;
use mentorship_core::{
    Cart, CartId, CartItem, CartItemDetails, CartItemId, CartStore, SlotId, StoreError,
    StoreFuture, UserId,
};
use sqlx::Row;

impl CartStore for PostgresStore {
    fn find_cart(&self, user_id: UserId) -> StoreFuture<'_, Result<Option<Cart>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find cart", e))?;

            row.as_ref().map(rows::cart).transpose()
        })
    }

    fn get_or_create_cart(&self, candidate: Cart) -> StoreFuture<'_, Result<Cart, StoreError>> {
        Box::pin(async move {
            // Concurrent first adds race on the user_id key; the loser reads the winner's cart
            sqlx::query(
                r"
                INSERT INTO carts (id, user_id, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id) DO NOTHING
                ",
            )
            .bind(candidate.id.as_uuid())
            .bind(candidate.user_id.as_uuid())
            .bind(candidate.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create cart", e))?;

            let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
                .bind(candidate.user_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load cart", e))?;

            rows::cart(&row)
        })
    }

    fn has_active_item(
        &self,
        user_id: UserId,
        slot_id: SlotId,
    ) -> StoreFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM cart_items
                    WHERE user_id = $1 AND slot_id = $2 AND status = 'ACTIVE'
                ) AS "exists"
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(slot_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check cart item", e))?;

            row.try_get("exists")
                .map_err(|e| StoreError::Corrupt(e.to_string()))
        })
    }

    fn insert_item(&self, item: CartItem) -> StoreFuture<'_, Result<CartItem, StoreError>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO cart_items
                    (id, cart_id, user_id, slot_id, mentor_id, slot_date, start_time, end_time,
                     price_cents, status, expires_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(item.id.as_uuid())
            .bind(item.cart_id.as_uuid())
            .bind(item.user_id.as_uuid())
            .bind(item.slot_id.as_uuid())
            .bind(item.mentor_id.as_uuid())
            .bind(item.date)
            .bind(item.start_time.as_naive())
            .bind(item.end_time.as_naive())
            .bind(item.price.cents())
            .bind(item.status.as_str())
            .bind(item.expires_at)
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert cart item", e))?;

            Ok(item)
        })
    }

    fn get_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<Option<CartItem>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {CART_ITEM_COLUMNS} FROM cart_items ci WHERE ci.id = $1"
            ))
            .bind(item_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get cart item", e))?;

            row.as_ref().map(rows::cart_item).transpose()
        })
    }

    fn delete_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
                .bind(item_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to delete cart item", e))?;

            Ok(result.rows_affected() > 0)
        })
    }

    fn clear_cart(&self, cart_id: CartId) -> StoreFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                .bind(cart_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to clear cart", e))?;

            Ok(result.rows_affected())
        })
    }

    fn active_items(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Vec<CartItemDetails>, StoreError>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {CART_ITEM_COLUMNS}, u.name AS mentor_name, s.status AS slot_status
                FROM cart_items ci
                LEFT JOIN users u ON u.id = ci.mentor_id
                LEFT JOIN slots s ON s.id = ci.slot_id
                WHERE ci.user_id = $1 AND ci.status = 'ACTIVE'
                ORDER BY ci.seq
                "
            ))
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list cart items", e))?;

            rows.iter().map(rows::cart_item_details).collect()
        })
    }
}
