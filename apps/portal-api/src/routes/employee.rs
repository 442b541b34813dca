//! Employee endpoints: redeem, buy, and look at what you have.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use perkhub_core::{CoinTransaction, EmployeeStats, OwnedVoucher, VoucherPurchase};

use crate::auth::{Authenticated, MaybePrincipal};
use crate::error::ApiResult;
use crate::services::{purchase, redemption, stats};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/redeem-coupon", post(redeem_coupon))
        .route("/redeem-code", post(redeem_code))
        .route("/purchase-voucher", post(purchase_voucher))
        .route("/stats", get(employee_stats))
        .route("/purchases", get(my_purchases))
        .route("/purchases/{id}/use", post(use_purchase))
        .route("/transactions", get(my_transactions))
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub voucher_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<u32>,
}

async fn redeem_coupon(
    State(state): State<Arc<AppState>>,
    MaybePrincipal(principal): MaybePrincipal,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let receipt = redemption::redeem_coupon(&state.db, principal.as_ref(), &req.code).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Coupon redeemed! {} coins added to your account.", receipt.coin_amount),
        "coinAmount": receipt.coin_amount,
        "newBalance": receipt.new_balance,
    })))
}

async fn redeem_code(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let receipt = redemption::redeem_code(&state.db, &principal, &req.code).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Code redeemed! {} coins added to your account.", receipt.coin_amount),
        "coinAmount": receipt.coin_amount,
        "newBalance": receipt.new_balance,
    })))
}

async fn purchase_voucher(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let receipt = purchase::purchase_voucher(&state.db, &principal, &req.voucher_id).await?;

    let body = json!({
        "success": true,
        "message": "Voucher purchased successfully",
        "purchaseId": receipt.purchase.id,
        "newBalance": receipt.new_balance,
    });

    // Confirmation goes out after commit without holding the response.
    let mailer = state.mailer.clone();
    let app_url = state.config.app_url.clone();
    tokio::spawn(async move {
        purchase::send_confirmation(mailer.as_ref(), &principal, &receipt, &app_url).await;
    });

    Ok(Json(body))
}

async fn employee_stats(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<EmployeeStats>> {
    Ok(Json(stats::employee_stats(&state.db, &principal).await?))
}

async fn my_purchases(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<OwnedVoucher>>> {
    Ok(Json(stats::my_purchases(&state.db, &principal).await?))
}

async fn use_purchase(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<VoucherPurchase>> {
    Ok(Json(purchase::use_purchase(&state.db, &principal, &id).await?))
}

async fn my_transactions(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Vec<CoinTransaction>>> {
    Ok(Json(
        stats::my_transactions(&state.db, &principal, query.limit).await?,
    ))
}
