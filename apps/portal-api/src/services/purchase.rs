//! # Voucher Purchase Workflow
//!
//! Buying a voucher debits the buyer and creates an entitlement in one
//! transaction. Using it later is a separate one-shot transition on the
//! entitlement.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use perkhub_core::{
    ActivityAction, CoreError, Direction, LedgerEntry, Principal, TransactionType, UserRole,
    Voucher, VoucherPurchase,
};
use perkhub_db::{ClaimOutcome, Database};

use super::{activity, ledger, ServiceResult};
use crate::mail::{purchase_confirmation_email, Mailer};

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchase: VoucherPurchase,
    pub voucher: Voucher,
    pub new_balance: i64,
}

/// Buys `voucher_id` for the calling employee.
pub async fn purchase_voucher(
    db: &Database,
    principal: &Principal,
    voucher_id: &str,
) -> ServiceResult<PurchaseReceipt> {
    principal.require(UserRole::Employee)?;
    let now = Utc::now();

    let mut tx = db.begin().await?;

    // Re-read inside the transaction so a concurrent deactivation is seen.
    let voucher = db
        .vouchers()
        .get_active_in(&mut tx, voucher_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Voucher", voucher_id))?;

    let entry = LedgerEntry {
        transaction_type: TransactionType::Purchase,
        from_user_id: Some(principal.id.clone()),
        to_user_id: None,
        description: format!("Purchased voucher: {}", voucher.title),
    };
    let new_balance = ledger::apply_delta(
        db,
        &mut tx,
        &principal.id,
        voucher.coin_value,
        Direction::Debit,
        entry,
        now,
    )
    .await?;

    let purchase = VoucherPurchase {
        id: Uuid::new_v4().to_string(),
        voucher_id: voucher.id.clone(),
        employee_id: principal.id.clone(),
        purchased_at: now,
        is_redeemed: false,
        redeemed_at: None,
    };
    db.purchases().insert(&mut tx, &purchase).await?;

    db.activity()
        .insert(
            &mut tx,
            &activity(
                &principal.id,
                ActivityAction::VoucherPurchase,
                format!(
                    "Purchased {} for {} coins",
                    voucher.title, voucher.coin_value
                ),
                now,
            ),
        )
        .await?;

    Database::commit(tx).await?;

    info!(
        user_id = %principal.id,
        voucher_id = %voucher.id,
        purchase_id = %purchase.id,
        price = voucher.coin_value,
        new_balance,
        "Voucher purchased"
    );
    Ok(PurchaseReceipt {
        purchase,
        voucher,
        new_balance,
    })
}

/// Sends the purchase confirmation. Failures are logged only.
pub async fn send_confirmation(
    mailer: &dyn Mailer,
    principal: &Principal,
    receipt: &PurchaseReceipt,
    app_url: &str,
) {
    let html = purchase_confirmation_email(
        &principal.name,
        &receipt.voucher.title,
        receipt.voucher.coin_value,
        receipt.new_balance,
        app_url,
    );
    let outcome = mailer
        .send(
            &principal.email,
            &format!("Your voucher: {}", receipt.voucher.title),
            &html,
        )
        .await;
    if !outcome.success {
        warn!(
            purchase_id = %receipt.purchase.id,
            reason = %outcome.message,
            "Purchase confirmation not delivered"
        );
    }
}

/// Marks an owned voucher as used at the point of sale.
pub async fn use_purchase(
    db: &Database,
    principal: &Principal,
    purchase_id: &str,
) -> ServiceResult<VoucherPurchase> {
    principal.require(UserRole::Employee)?;
    let now = Utc::now();

    let mut tx = db.begin().await?;

    let purchase = match db
        .purchases()
        .mark_used(&mut tx, purchase_id, &principal.id, now)
        .await?
    {
        ClaimOutcome::Claimed(purchase) => purchase,
        ClaimOutcome::NotFound | ClaimOutcome::Expired => {
            return Err(CoreError::not_found("Purchase", purchase_id).into())
        }
        ClaimOutcome::AlreadyClaimed => {
            return Err(CoreError::AlreadyRedeemed {
                code: format!("Purchase {purchase_id}"),
            }
            .into())
        }
    };

    db.activity()
        .insert(
            &mut tx,
            &activity(
                &principal.id,
                ActivityAction::VoucherUse,
                format!("Used voucher purchase {}", purchase.id),
                now,
            ),
        )
        .await?;

    Database::commit(tx).await?;

    info!(user_id = %principal.id, purchase_id = %purchase.id, "Voucher used");
    Ok(purchase)
}
