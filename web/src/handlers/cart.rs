//! Cart endpoints (USER).
//!
//! - `GET /cart`
//! - `POST /cart`
//! - `DELETE /cart/clearCart`
//! - `DELETE /cart/:item_id`

use super::{ok, parse_id, ApiResponse};
use crate::error::AppError;
use crate::extractors::{ApiJson, Identity};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mentorship_core::{CartContents, CartItem, CartItemId, Role, SlotId};
use serde::{Deserialize, Serialize};

/// Body of `POST /cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    /// Slot to hold
    pub slot_id: Option<String>,
}

/// A newly created hold.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemBody {
    /// The hold
    pub cart_item: CartItem,
}

/// Result of clearing the cart.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedBody {
    /// Items removed
    pub deleted_count: u64,
}

/// Acknowledgement of a removed item.
#[derive(Debug, Serialize)]
pub struct RemovedBody {
    /// What happened
    pub message: &'static str,
}

/// The caller's ACTIVE holds with totals.
pub async fn list_cart(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CartContents>>, AppError> {
    let user_id = identity.require(Role::User)?;
    Ok(ok(state.cart.list_items(user_id).await?))
}

/// Hold a slot for 30 minutes.
pub async fn add_to_cart(
    identity: Identity,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddToCartRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CartItemBody>>), AppError> {
    let user_id = identity.require(Role::User)?;
    let raw = request
        .slot_id
        .ok_or_else(|| AppError::validation(&[("slotId", "slotId is required".to_string())]))?;
    let slot_id: SlotId = raw
        .parse()
        .map_err(|_| AppError::validation(&[("slotId", format!("invalid slot id '{raw}'"))]))?;

    let cart_item = state.cart.add_item(user_id, slot_id).await?;
    Ok((StatusCode::CREATED, ok(CartItemBody { cart_item })))
}

/// Remove every item from the caller's cart.
pub async fn clear_cart(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ClearedBody>>, AppError> {
    let user_id = identity.require(Role::User)?;
    let deleted_count = state.cart.clear(user_id).await?;
    Ok(ok(ClearedBody { deleted_count }))
}

/// Remove one of the caller's items.
pub async fn remove_from_cart(
    identity: Identity,
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<ApiResponse<RemovedBody>>, AppError> {
    let user_id = identity.require(Role::User)?;
    let item_id: CartItemId = parse_id(&item_id, "cart item")?;

    state.cart.remove_item(user_id, item_id).await?;
    Ok(ok(RemovedBody {
        message: "Item removed from cart",
    }))
}
