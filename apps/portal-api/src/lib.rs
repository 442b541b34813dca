//! # PerkHub Portal API
//!
//! JSON HTTP API for the PerkHub rewards portal.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Portal API                                      │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /api/auth     │  │  /api/employee │  │  /api/admin                ││
//! │  │                │  │                │  │                            ││
//! │  │ • login        │  │ • redeem-code  │  │ • redemption-codes         ││
//! │  │ • logout       │  │ • redeem-coupon│  │   (issue, list)            ││
//! │  │ • me           │  │ • purchase     │  │                            ││
//! │  └────────────────┘  │ • stats        │  └────────────────────────────┘│
//! │                      └────────────────┘                                │
//! │  ┌────────────────┐  ┌──────────────────────────────────────────────┐  │
//! │  │  /api/vouchers │  │  /api/superadmin                             │  │
//! │  │  (catalog)     │  │  • vouchers  • coupons  • transfer           │  │
//! │  └────────────────┘  └──────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Database · PortalConfig · SessionManager · Mailer     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::PortalConfig`]. Every field can be set from a `PORTAL_*`
//! environment variable.

pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use perkhub_db::Database;

use crate::auth::SessionManager;
use crate::config::PortalConfig;
use crate::mail::Mailer;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: PortalConfig,
    pub sessions: SessionManager,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: Database, config: PortalConfig, mailer: Arc<dyn Mailer>) -> Self {
        let sessions = SessionManager::from_config(&config);
        AppState {
            db,
            config,
            sessions,
            mailer,
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
