//! # HTTP Routes
//!
//! | Prefix | Module |
//! |---|---|
//! | `/health` | [`health`] |
//! | `/api/auth` | [`auth`] |
//! | `/api/employee` | [`employee`] |
//! | `/api/admin` | [`admin`] |
//! | `/api/superadmin` | [`superadmin`] |
//! | `/api/vouchers` | [`catalog`] |
//!
//! Handlers only extract, call one service function and shape the JSON;
//! role checks live in the services.

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod employee;
pub mod health;
pub mod superadmin;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(catalog::router())
        .nest("/api/auth", auth::router())
        .nest("/api/employee", employee::router())
        .nest("/api/admin", admin::router())
        .nest("/api/superadmin", superadmin::router())
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "No such endpoint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::{Method, Request};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use perkhub_core::credentials::hash_password;
    use perkhub_core::{User, UserRole};
    use perkhub_db::{Database, DbConfig};

    use crate::config::PortalConfig;
    use crate::mail::testing::RecordingMailer;
    use crate::services::test_support::seed_voucher;

    struct TestApp {
        app: Router,
        state: Arc<AppState>,
        mailer: Arc<RecordingMailer>,
    }

    async fn test_app() -> TestApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let state = Arc::new(AppState::new(db, PortalConfig::default(), mailer.clone()));
        TestApp {
            app: crate::router(state.clone()),
            state,
            mailer,
        }
    }

    impl TestApp {
        async fn account(&self, email: &str, password: &str, role: UserRole, balance: i64) -> User {
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4().to_string(),
                name: email.split('@').next().unwrap().to_string(),
                email: email.to_string(),
                password_hash: hash_password(password).unwrap(),
                role,
                coin_balance: balance,
                company_name: Some("Acme Corp".to_string()),
                created_at: now,
                last_updated: now,
            };
            self.state.db.users().insert(&user).await.unwrap();
            user
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            cookie: Option<&str>,
            body: Option<&str>,
        ) -> (StatusCode, Vec<String>, Value) {
            let mut request = Request::builder()
                .method(method)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json");
            if let Some(cookie) = cookie {
                request = request.header(COOKIE, cookie);
            }
            let request = request
                .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
                .unwrap();

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let cookies = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, cookies, json)
        }

        async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> (StatusCode, Value) {
            let (status, _, json) = self
                .call(Method::POST, uri, cookie, Some(&body.to_string()))
                .await;
            (status, json)
        }

        async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
            let (status, _, json) = self.call(Method::GET, uri, cookie, None).await;
            (status, json)
        }

        /// Logs in and returns the `auth-user=...` pair for a Cookie header.
        async fn login(&self, email: &str, password: &str) -> String {
            let body = json!({ "email": email, "password": password }).to_string();
            let (status, cookies, _) = self
                .call(Method::POST, "/api/auth/login", None, Some(&body))
                .await;
            assert_eq!(status, StatusCode::OK);
            cookies[0].split(';').next().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_health() {
        let t = test_app().await;
        let (status, body) = t.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);

        let (status, body) = t.get("/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let t = test_app().await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 40)
            .await;

        let body = json!({ "email": "Jane@Acme.test", "password": "employee123" }).to_string();
        let (status, cookies, json) = t
            .call(Method::POST, "/api/auth/login", None, Some(&body))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["role"], "employee");
        assert!(cookies[0].starts_with("auth-user="));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("SameSite=Lax"));
        assert!(cookies[0].contains("Max-Age=86400"));

        let cookie = cookies[0].split(';').next().unwrap().to_string();
        let (status, json) = t.get("/api/auth/me", Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["email"], "jane@acme.test");
        assert_eq!(json["coinBalance"], 40);

        let (_, cookies, _) = t.call(Method::POST, "/api/auth/logout", None, None).await;
        assert!(cookies[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_bad_credentials_and_missing_session() {
        let t = test_app().await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 0)
            .await;

        let (status, json) = t
            .post(
                "/api/auth/login",
                None,
                json!({ "email": "jane@acme.test", "password": "wrong" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid email or password");

        let (status, json) = t.get("/api/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_unauthenticated() {
        let t = test_app().await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 0)
            .await;
        let cookie = t.login("jane@acme.test", "employee123").await;

        let tampered = format!("{cookie}tampered");
        let (status, _) = t.get("/api/employee/stats", Some(&tampered)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = t
            .post(
                "/api/employee/redeem-coupon",
                Some(&tampered),
                json!({ "code": "ABCD-EFGH-IJKL-MNOP" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_and_incomplete_json() {
        let t = test_app().await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 0)
            .await;
        let cookie = t.login("jane@acme.test", "employee123").await;

        let (status, _, json) = t
            .call(
                Method::POST,
                "/api/employee/redeem-code",
                Some(&cookie),
                Some("{not json"),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, json) = t
            .post("/api/employee/purchase-voucher", Some(&cookie), json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_coupon_batch_redeem_and_purchase() {
        let t = test_app().await;
        t.account("root@perkhub.test", "superadmin", UserRole::Superadmin, 0)
            .await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 0)
            .await;
        let root = t.login("root@perkhub.test", "superadmin").await;
        let jane = t.login("jane@acme.test", "employee123").await;

        let (status, coupons) = t
            .post("/api/superadmin/coupons", Some(&root), json!({ "values": [250] }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let code = coupons[0]["code"].as_str().unwrap().to_string();

        let (status, json) = t
            .post(
                "/api/employee/redeem-coupon",
                Some(&jane),
                json!({ "code": code.to_lowercase() }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["coinAmount"], 250);
        assert_eq!(json["newBalance"], 250);

        let (status, json) = t
            .post("/api/employee/redeem-coupon", Some(&jane), json!({ "code": code }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "ALREADY_REDEEMED");

        let voucher = seed_voucher(&t.state.db, "Steam $25", 250).await;
        let (status, json) = t
            .post(
                "/api/employee/purchase-voucher",
                Some(&jane),
                json!({ "voucherId": voucher.id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["newBalance"], 0);
        let purchase_id = json["purchaseId"].as_str().unwrap().to_string();

        let (status, json) = t
            .post(
                "/api/employee/purchase-voucher",
                Some(&jane),
                json!({ "voucherId": voucher.id }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INSUFFICIENT_BALANCE");

        let (status, json) = t
            .post(
                &format!("/api/employee/purchases/{purchase_id}/use"),
                Some(&jane),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isRedeemed"], true);

        let (status, stats) = t.get("/api/employee/stats", Some(&jane)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["coinBalance"], 0);
        assert_eq!(stats["vouchersPurchased"], 1);
        assert_eq!(stats["vouchersRedeemed"], 1);

        let (_, rows) = t.get("/api/employee/transactions", Some(&jane)).await;
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["type"], "purchase");
        assert_eq!(rows[1]["type"], "coupon");
    }

    #[tokio::test]
    async fn test_issue_and_redeem_code_over_http() {
        let t = test_app().await;
        t.account("admin@acme.test", "admin123", UserRole::CompanyAdmin, 0)
            .await;
        t.account("jane@acme.test", "employee123", UserRole::Employee, 0)
            .await;
        let admin = t.login("admin@acme.test", "admin123").await;
        let jane = t.login("jane@acme.test", "employee123").await;

        let (status, issued) = t
            .post(
                "/api/admin/redemption-codes",
                Some(&admin),
                json!({
                    "employeeEmail": "jane@acme.test",
                    "employeeName": "Jane",
                    "coinAmount": 500
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let code = issued["code"].as_str().unwrap().to_string();
        assert_eq!(t.mailer.messages().len(), 1);

        // Employees cannot issue.
        let (status, _) = t
            .post(
                "/api/admin/redemption-codes",
                Some(&jane),
                json!({
                    "employeeEmail": "jane@acme.test",
                    "employeeName": "Jane",
                    "coinAmount": 500
                }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = t
            .post("/api/employee/redeem-code", Some(&jane), json!({ "code": code }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["coinAmount"], 500);
        assert_eq!(json["newBalance"], 500);

        let (status, json) = t
            .post("/api/employee/redeem-code", Some(&jane), json!({ "code": code }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .ends_with("has already been redeemed"));

        let (status, codes) = t.get("/api/admin/redemption-codes", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(codes[0]["isRedeemed"], true);
    }

    #[tokio::test]
    async fn test_catalog_query() {
        let t = test_app().await;
        seed_voucher(&t.state.db, "Coffee", 80).await;
        seed_voucher(&t.state.db, "Spa Day", 800).await;

        let (status, json) = t.get("/api/vouchers?price=high", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["title"], "Spa Day");

        let (status, json) = t.get("/api/vouchers?price=cheap", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_superadmin_transfer_and_voucher_admin() {
        let t = test_app().await;
        t.account("root@perkhub.test", "superadmin", UserRole::Superadmin, 1_000)
            .await;
        let admin = t
            .account("admin@acme.test", "admin123", UserRole::CompanyAdmin, 0)
            .await;
        let root = t.login("root@perkhub.test", "superadmin").await;

        let (status, json) = t
            .post(
                "/api/superadmin/transfer",
                Some(&root),
                json!({ "toUserId": admin.id, "amount": 400 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["fromBalance"], 600);
        assert_eq!(json["toBalance"], 400);

        let (status, voucher) = t
            .post(
                "/api/superadmin/vouchers",
                Some(&root),
                json!({
                    "title": "Movie Night",
                    "description": "Two tickets",
                    "category": "Entertainment",
                    "coinValue": 300,
                    "expiryDate": "2031-06-30T23:59:59Z"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(voucher["isActive"], true);
        let id = voucher["id"].as_str().unwrap().to_string();

        let (status, json) = t
            .post(
                &format!("/api/superadmin/vouchers/{id}/active"),
                Some(&root),
                json!({ "isActive": false }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isActive"], false);

        let (_, catalog) = t.get("/api/vouchers", None).await;
        assert!(catalog.as_array().unwrap().is_empty());

        let (status, all) = t.get("/api/superadmin/vouchers", Some(&root)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 1);
    }
}
