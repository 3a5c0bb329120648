//! Order API handlers
//!
//! Handlers validate input and resolve catalog questions (does the item
//! exist, is it on sale today) before handing the operation to the session
//! engine, so a rejected request never touches order state.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::{ChangeTableOutcome, Order, OrderDetail, OrderStatus};

use crate::state::ServerState;
use crate::utils::validation::validate_non_negative_amount;
use crate::utils::{AppError, AppResult};

/// Underpayment tolerance: small cash rounding gaps settle the bill
const SETTLEMENT_TOLERANCE: f64 = 0.5;

#[derive(Deserialize)]
pub struct AddItemPayload {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateItemPayload {
    pub quantity: u32,
    pub rate: f64,
}

#[derive(Deserialize)]
pub struct ChangeTablePayload {
    pub table: String,
}

#[derive(Deserialize)]
pub struct SetStatusPayload {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct PaymentPayload {
    #[serde(default)]
    pub cash_amount: f64,
    #[serde(default)]
    pub online_amount: f64,
}

/// Reject a payment that leaves more than the tolerance unpaid.
/// Overpayment passes (change is handed back at the till).
fn check_settlement(total: f64, cash: f64, online: f64) -> AppResult<()> {
    validate_non_negative_amount(cash, "cash amount")?;
    validate_non_negative_amount(online, "online amount")?;
    if total - (cash + online) > SETTLEMENT_TOLERANCE {
        return Err(AppError::validation(format!(
            "Insufficient payment: {:.2} received for a {:.2} bill",
            cash + online,
            total
        )));
    }
    Ok(())
}

/// GET /api/orders - all open orders with their items
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<OrderDetail>>> {
    Ok(Json(state.engine.open_orders()?))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(state.engine.get_order(&id)?))
}

/// POST /api/orders/:id/items - add an item by menu name
///
/// The catalog gate runs first: unknown or unavailable items are rejected
/// with a readable message. Quantity N is applied as N stacking adds, so it
/// lands on the same line.
pub async fn add_item(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AddItemPayload>,
) -> AppResult<Json<OrderDetail>> {
    if payload.quantity == 0 {
        return Err(AppError::validation("quantity must be at least 1"));
    }
    let product = state.catalog.resolve_available(&payload.name)?;
    let category_label = state.catalog.category_label(&product)?;

    for _ in 0..payload.quantity {
        state
            .engine
            .add_item(&id, &product.name, &category_label, product.price)?;
    }
    Ok(Json(state.engine.get_order(&id)?))
}

/// PUT /api/orders/:id/items/:item_id - overwrite quantity and rate
pub async fn update_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, u64)>,
    Json(payload): Json<UpdateItemPayload>,
) -> AppResult<Json<OrderDetail>> {
    validate_non_negative_amount(payload.rate, "rate")?;
    state
        .engine
        .update_line_item(&id, item_id, payload.quantity, payload.rate)?;
    Ok(Json(state.engine.get_order(&id)?))
}

/// DELETE /api/orders/:id/items/:item_id
pub async fn remove_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, u64)>,
) -> AppResult<Json<OrderDetail>> {
    state.engine.remove_item(&id, item_id)?;
    Ok(Json(state.engine.get_order(&id)?))
}

/// PUT /api/orders/:id/table - rename the table, or merge into the open
/// order already holding the target label
pub async fn change_table(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ChangeTablePayload>,
) -> AppResult<Json<ChangeTableOutcome>> {
    Ok(Json(state.engine.change_table(&id, &payload.table)?))
}

/// PUT /api/orders/:id/status - move between Preparing and Served
pub async fn set_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<SetStatusPayload>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.engine.set_status(&id, payload.status)?))
}

/// POST /api/orders/:id/payment - settle the bill and close the session
pub async fn pay(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PaymentPayload>,
) -> AppResult<Json<Order>> {
    let detail = state.engine.get_order(&id)?;
    check_settlement(
        detail.order.total_amount,
        payload.cash_amount,
        payload.online_amount,
    )?;
    Ok(Json(state.engine.process_payment(
        &id,
        payload.cash_amount,
        payload.online_amount,
    )?))
}

/// POST /api/orders/:id/close - discard an empty order; kept when the
/// order still has a balance (returns false)
pub async fn close(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    Ok(Json(state.engine.close_table(&id)?))
}

/// DELETE /api/orders/:id - unconditional delete (manager action)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    state.engine.delete_order(&id)?;
    Ok(Json(true))
}
