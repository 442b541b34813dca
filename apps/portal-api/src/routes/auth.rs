//! Login, logout and the current session.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use perkhub_core::credentials::verify_password;
use perkhub_core::validation::validate_text;
use perkhub_core::{ActivityAction, CoreError, Principal};

use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::services::activity;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    validate_text("email", &req.email, 254).map_err(CoreError::from)?;
    validate_text("password", &req.password, 256).map_err(CoreError::from)?;

    let user = state.db.users().get_by_email(req.email.trim()).await?;
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            info!(email = %req.email.trim(), "Failed login");
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            ));
        }
    };

    let principal = Principal::from(&user);
    let token = state.sessions.issue(&principal)?;
    let cookie = state.sessions.session_cookie(token);

    if let Err(e) = state
        .db
        .activity()
        .record(&activity(
            &user.id,
            ActivityAction::Login,
            "Signed in",
            Utc::now(),
        ))
        .await
    {
        warn!(user_id = %user.id, error = %e, "Could not record login");
    }

    info!(user_id = %user.id, role = %user.role, "Signed in");
    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(json!({
            "success": true,
            "user": principal,
            "coinBalance": user.coin_balance,
        })),
    ))
}

async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.sessions.clear_cookie().to_string())],
        Json(json!({ "success": true })),
    )
}

async fn me(
    State(state): State<Arc<AppState>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let balance = state
        .db
        .users()
        .balance(&principal.id)
        .await?
        .ok_or(CoreError::Unauthenticated)?;

    Ok(Json(json!({
        "user": principal,
        "coinBalance": balance,
    })))
}
