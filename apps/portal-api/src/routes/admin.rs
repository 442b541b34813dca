//! Company admin endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use perkhub_core::{NewRedemptionCode, RedemptionCode, UserRole};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::services::issuance;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/redemption-codes",
        get(list_redemption_codes).post(issue_redemption_code),
    )
}

async fn issue_redemption_code(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<NewRedemptionCode>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RedemptionCode>)> {
    let Json(req) = payload?;
    let code = issuance::issue_redemption_code(
        &state.db,
        state.mailer.as_ref(),
        &state.config,
        &principal,
        &req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(code)))
}

/// Codes issued by the caller; a superadmin sees every code.
async fn list_redemption_codes(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<RedemptionCode>>> {
    principal.require_any(&[UserRole::CompanyAdmin, UserRole::Superadmin])?;

    let codes = if principal.role == UserRole::Superadmin {
        state.db.redemption_codes().list_all().await?
    } else {
        state.db.redemption_codes().list_by_admin(&principal.id).await?
    };
    Ok(Json(codes))
}
