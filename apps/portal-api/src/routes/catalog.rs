use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use perkhub_core::catalog::VoucherFilter;
use perkhub_core::{CoreError, Voucher};

use crate::error::ApiResult;
use crate::services::catalog;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/vouchers", get(list_catalog))
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
}

async fn list_catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<Vec<Voucher>>> {
    let filter = VoucherFilter::from_query(
        query.search.as_deref(),
        query.category.as_deref(),
        query.price.as_deref(),
    )
    .map_err(CoreError::from)?;

    Ok(Json(catalog::catalog(&state.db, &filter).await?))
}
