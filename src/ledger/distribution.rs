//! Commission distribution engine.
//!
//! One distribution is one database transaction: the distribution row, every
//! wallet credit and every commission row commit together or not at all. The
//! distribution row is keyed by the originating transaction id, so repeating
//! a distribution returns the stored rows instead of crediting twice.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use super::config_store::get_active_config;
use super::hierarchy::{resolve_beneficiaries, Beneficiaries};
use super::money::{split_shares, TierShare};
use super::wallet;
use crate::audit::{log_ledger_action, LedgerAuditAction};
use crate::config::{CommissionSettings, OrphanPolicy};
use crate::errors::{AppError, AppResult};
use crate::models::commission::{
    CommissionDistribution, CommissionTransaction, DistributionReport, DistributionRequest, Tier,
};
use crate::validation::{validate_amount, validate_service_type, validate_transaction_id};
use crate::{log_info, log_ledger, log_warn};

/// A share bound to the user who receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub tier: Tier,
    pub recipient_user_id: i64,
    pub rate_bps: i64,
    pub amount: i64,
}

/// Bind shares to beneficiaries. Shares of tiers without a beneficiary are
/// redirected according to `policy`; the rest is returned as orphaned.
pub fn allocate(
    shares: &[TierShare],
    beneficiaries: &Beneficiaries,
    policy: OrphanPolicy,
) -> (Vec<Allocation>, i64) {
    let mut allocations: Vec<Allocation> = shares
        .iter()
        .filter_map(|s| {
            beneficiaries.for_tier(s.tier).map(|recipient| Allocation {
                tier: s.tier,
                recipient_user_id: recipient,
                rate_bps: s.rate_bps,
                amount: s.amount,
            })
        })
        .collect();

    let mut orphaned = 0;

    for share in shares.iter().filter(|s| beneficiaries.for_tier(s.tier).is_none()) {
        let target = match policy {
            OrphanPolicy::Vanish => None,
            OrphanPolicy::Admin => beneficiaries.admin.map(|_| Tier::Admin),
            OrphanPolicy::RollUp => {
                let mut tier = share.tier.parent();
                while let Some(t) = tier {
                    if beneficiaries.for_tier(t).is_some() {
                        break;
                    }
                    tier = t.parent();
                }
                tier
            }
        };

        let Some(target) = target else {
            orphaned += share.amount;
            continue;
        };

        match allocations.iter_mut().find(|a| a.tier == target) {
            Some(existing) => {
                existing.amount += share.amount;
                existing.rate_bps += share.rate_bps;
            }
            None => {
                if let Some(recipient) = beneficiaries.for_tier(target) {
                    allocations.push(Allocation {
                        tier: target,
                        recipient_user_id: recipient,
                        rate_bps: share.rate_bps,
                        amount: share.amount,
                    });
                }
            }
        }
    }

    allocations.retain(|a| a.amount > 0);
    allocations.sort_by_key(|a| a.tier);
    (allocations, orphaned)
}

/// Distribute commission for a completed transaction.
///
/// A service type without an active config is not an error here: the skip
/// is logged and audited and an empty list is returned without touching any
/// wallet. A repeated transaction id returns the rows of the first call.
pub async fn distribute(
    db: &SqlitePool,
    settings: &CommissionSettings,
    transaction_id: &str,
    service_type: &str,
    amount: i64,
    paying_user_id: i64,
) -> AppResult<Vec<CommissionTransaction>> {
    let request = DistributionRequest {
        transaction_id: transaction_id.to_string(),
        service_type: service_type.to_string(),
        amount,
        paying_user_id,
    };

    match distribute_detailed(db, settings, &request).await {
        Ok(report) => Ok(report.rows),
        Err(AppError::ConfigNotFound(st)) => {
            log_warn!("COMMISSION", "No active config, distribution skipped", serde_json::json!({
                "transaction_id": transaction_id,
                "service_type": st,
            }));
            log_ledger_action(
                db,
                Some(paying_user_id),
                LedgerAuditAction::CommissionSkipped,
                &format!("No active commission config for '{}'", st),
                Some(&serde_json::json!({
                    "transaction_id": transaction_id,
                    "service_type": st,
                    "amount": amount,
                })),
            )
            .await;
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Like [`distribute`], but reports orphaned amounts and repeat calls, and
/// returns `ConfigNotFound` as an error.
pub async fn distribute_detailed(
    db: &SqlitePool,
    settings: &CommissionSettings,
    request: &DistributionRequest,
) -> AppResult<DistributionReport> {
    validate_transaction_id(&request.transaction_id).map_err(AppError::Validation)?;
    validate_service_type(&request.service_type).map_err(AppError::Validation)?;
    validate_amount(request.amount, Some(1), None).map_err(AppError::Validation)?;

    let mut tx = db.begin().await?;

    // The claim must be the first statement: SQLite only waits on the busy
    // timeout for a write lock taken before the transaction has read anything.
    let claimed = sqlx::query(
        "INSERT INTO commission_distributions (
            original_transaction_id, service_type, amount, paying_user_id
        ) VALUES (?, ?, ?, ?)
        ON CONFLICT(original_transaction_id) DO NOTHING",
    )
    .bind(&request.transaction_id)
    .bind(&request.service_type)
    .bind(request.amount)
    .bind(request.paying_user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    if !claimed {
        let existing = find_distribution(&mut tx, &request.transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Distribution {} vanished", request.transaction_id))
            })?;
        let rows = rows_for_transaction(&mut tx, &request.transaction_id).await?;
        tx.rollback().await?;

        if existing.amount != request.amount || existing.service_type != request.service_type {
            log_warn!("COMMISSION", "Repeated distribution with different details", serde_json::json!({
                "transaction_id": request.transaction_id,
                "stored_amount": existing.amount,
                "requested_amount": request.amount,
                "stored_service_type": existing.service_type,
                "requested_service_type": request.service_type,
            }));
        }

        return Ok(DistributionReport {
            transaction_id: existing.original_transaction_id,
            rows,
            distributed_amount: existing.distributed_amount,
            orphaned_amount: existing.orphaned_amount,
            already_distributed: true,
        });
    }

    // Any error from here on drops `tx`, which also releases the claim.
    let config = get_active_config(&mut tx, &request.service_type).await?;
    let beneficiaries =
        resolve_beneficiaries(&mut tx, request.paying_user_id, settings.max_hierarchy_depth).await?;

    let shares = split_shares(request.amount, &config.rates());
    let (allocations, orphaned) = allocate(&shares, &beneficiaries, settings.orphan_policy);
    let distributed: i64 = allocations.iter().map(|a| a.amount).sum();

    sqlx::query(
        "UPDATE commission_distributions
         SET config_id = ?, distributed_amount = ?, orphaned_amount = ?
         WHERE original_transaction_id = ?",
    )
    .bind(config.id)
    .bind(distributed)
    .bind(orphaned)
    .bind(&request.transaction_id)
    .execute(&mut *tx)
    .await?;

    for allocation in &allocations {
        let description = format!(
            "{} commission ({} tier) for {}",
            request.service_type, allocation.tier, request.transaction_id
        );
        wallet::credit(
            &mut tx,
            allocation.recipient_user_id,
            allocation.amount,
            Some(&request.transaction_id),
            &description,
        )
        .await?;

        sqlx::query(
            "INSERT INTO commission_transactions (
                original_transaction_id, service_type, amount, recipient_user_id,
                tier, rate_bps, commission_amount
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.transaction_id)
        .bind(&request.service_type)
        .bind(request.amount)
        .bind(allocation.recipient_user_id)
        .bind(allocation.tier.as_str())
        .bind(allocation.rate_bps)
        .bind(allocation.amount)
        .execute(&mut *tx)
        .await?;
    }

    let rows = rows_for_transaction(&mut tx, &request.transaction_id).await?;
    tx.commit().await?;

    let summary = serde_json::json!({
        "transaction_id": request.transaction_id,
        "service_type": request.service_type,
        "amount": request.amount,
        "config_id": config.id,
        "rows": rows.len(),
        "distributed_amount": distributed,
        "orphaned_amount": orphaned,
        "missing_tiers": beneficiaries
            .missing_tiers()
            .iter()
            .map(Tier::as_str)
            .collect::<Vec<_>>(),
    });

    log_info!("COMMISSION", "Commission distributed", summary.clone());
    log_ledger!("commission_distributed", &summary);
    if orphaned > 0 {
        log_warn!("COMMISSION", "Orphaned commission not credited", serde_json::json!({
            "transaction_id": request.transaction_id,
            "orphaned_amount": orphaned,
            "policy": settings.orphan_policy.as_str(),
        }));
    }

    log_ledger_action(
        db,
        Some(request.paying_user_id),
        LedgerAuditAction::CommissionDistributed,
        &format!(
            "Distributed {} across {} beneficiaries for {}",
            distributed,
            rows.len(),
            request.transaction_id
        ),
        Some(&summary),
    )
    .await;

    Ok(DistributionReport {
        transaction_id: request.transaction_id.clone(),
        rows,
        distributed_amount: distributed,
        orphaned_amount: orphaned,
        already_distributed: false,
    })
}

pub async fn find_distribution(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> AppResult<Option<CommissionDistribution>> {
    Ok(sqlx::query_as::<_, CommissionDistribution>(
        "SELECT * FROM commission_distributions WHERE original_transaction_id = ?",
    )
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn rows_for_transaction(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> AppResult<Vec<CommissionTransaction>> {
    Ok(sqlx::query_as::<_, CommissionTransaction>(
        "SELECT * FROM commission_transactions WHERE original_transaction_id = ? ORDER BY id ASC",
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?)
}
