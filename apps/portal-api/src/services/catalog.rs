//! Voucher marketplace and its administration.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use perkhub_core::catalog::VoucherFilter;
use perkhub_core::validation::validate_new_voucher;
use perkhub_core::{ActivityAction, NewVoucher, Principal, UserRole, Voucher};
use perkhub_db::Database;

use super::{activity, ServiceResult};

/// Active vouchers matching `filter`, featured first.
pub async fn catalog(db: &Database, filter: &VoucherFilter) -> ServiceResult<Vec<Voucher>> {
    let vouchers = db.vouchers().list_active().await?;
    Ok(filter.apply(vouchers))
}

/// Every voucher, active or not.
pub async fn list_vouchers(db: &Database, principal: &Principal) -> ServiceResult<Vec<Voucher>> {
    principal.require(UserRole::Superadmin)?;
    Ok(db.vouchers().list_all().await?)
}

pub async fn create_voucher(
    db: &Database,
    principal: &Principal,
    req: &NewVoucher,
) -> ServiceResult<Voucher> {
    principal.require(UserRole::Superadmin)?;
    let expiry_date = validate_new_voucher(req)?;
    let now = Utc::now();

    let voucher = Voucher {
        id: Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        category: req.category.trim().to_string(),
        coin_value: req.coin_value,
        is_active: req.is_active.unwrap_or(true),
        expiry_date,
        created_at: now,
        created_by: principal.id.clone(),
        image_url: non_empty(req.image_url.as_deref()),
        featured: req.featured,
        brand: non_empty(req.brand.as_deref()),
        original_price: non_empty(req.original_price.as_deref()),
    };
    db.vouchers().insert(&voucher).await?;

    db.activity()
        .record(&activity(
            &principal.id,
            ActivityAction::VoucherCreate,
            format!("Created voucher {} ({} coins)", voucher.title, voucher.coin_value),
            now,
        ))
        .await?;

    info!(voucher_id = %voucher.id, title = %voucher.title, "Voucher created");
    Ok(voucher)
}

/// Soft-enables or disables a voucher.
pub async fn set_voucher_active(
    db: &Database,
    principal: &Principal,
    voucher_id: &str,
    is_active: bool,
) -> ServiceResult<Voucher> {
    principal.require(UserRole::Superadmin)?;
    let voucher = db.vouchers().set_active(voucher_id, is_active).await?;

    db.activity()
        .record(&activity(
            &principal.id,
            ActivityAction::VoucherToggle,
            format!(
                "{} voucher {}",
                if is_active { "Activated" } else { "Deactivated" },
                voucher.title
            ),
            Utc::now(),
        ))
        .await?;

    info!(voucher_id = %voucher.id, is_active, "Voucher toggled");
    Ok(voucher)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
