//! Superadmin endpoints: catalog management, coupon batches, coin allocation.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use perkhub_core::{Coupon, NewVoucher, Voucher};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::services::ledger::{self, TransferReceipt};
use crate::services::{catalog, issuance};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vouchers", get(list_vouchers).post(create_voucher))
        .route("/vouchers/{id}/active", post(set_voucher_active))
        .route("/coupons", post(issue_coupons))
        .route("/transfer", post(transfer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CouponBatchRequest {
    #[serde(default)]
    pub values: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_user_id: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
}

async fn list_vouchers(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<Voucher>>> {
    Ok(Json(catalog::list_vouchers(&state.db, &principal).await?))
}

async fn create_voucher(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<NewVoucher>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Voucher>)> {
    let Json(req) = payload?;
    let voucher = catalog::create_voucher(&state.db, &principal, &req).await?;
    Ok((StatusCode::CREATED, Json(voucher)))
}

async fn set_voucher_active(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<ActiveRequest>, JsonRejection>,
) -> ApiResult<Json<Voucher>> {
    let Json(req) = payload?;
    let voucher = catalog::set_voucher_active(&state.db, &principal, &id, req.is_active).await?;
    Ok(Json(voucher))
}

async fn issue_coupons(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CouponBatchRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<Coupon>>)> {
    let Json(req) = payload?;
    let coupons = issuance::issue_coupons(&state.db, &principal, req.values.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(coupons)))
}

async fn transfer(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Json<TransferReceipt>> {
    let Json(req) = payload?;
    let receipt = ledger::transfer(
        &state.db,
        &principal,
        &req.to_user_id,
        req.amount,
        req.description.as_deref(),
    )
    .await?;
    Ok(Json(receipt))
}
