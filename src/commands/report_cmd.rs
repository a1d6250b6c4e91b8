use crate::errors::{AppError, AppResult};
use crate::ledger::distribution::{find_distribution, rows_for_transaction};
use crate::models::commission::{CommissionDistribution, CommissionTransaction};
use crate::models::report::{CommissionSummary, PaginatedCommissions, TierSummary};
use crate::AppState;

const PER_PAGE: i64 = 20;

/// Commission rows written for one originating transaction, by tier.
pub async fn commissions_for_transaction(
    state: &AppState,
    transaction_id: &str,
) -> AppResult<Vec<CommissionTransaction>> {
    let mut conn = state.db.acquire().await?;
    rows_for_transaction(&mut conn, transaction_id).await
}

/// The distribution event for a transaction, if it has been distributed.
pub async fn distribution_for(
    state: &AppState,
    transaction_id: &str,
) -> AppResult<Option<CommissionDistribution>> {
    let mut conn = state.db.acquire().await?;
    find_distribution(&mut conn, transaction_id).await
}

/// Commission earned by one user, newest first. Pages start at 1.
pub async fn commissions_for_recipient(
    state: &AppState,
    user_id: i64,
    page: i64,
) -> AppResult<PaginatedCommissions> {
    let page = page.clamp(1, i64::MAX / PER_PAGE);
    let offset = (page - 1) * PER_PAGE;

    let (total, total_commission): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(commission_amount), 0)
         FROM commission_transactions WHERE recipient_user_id = ?",
    )
    .bind(user_id)
    .fetch_one(&state.db)
    .await?;

    let data = sqlx::query_as::<_, CommissionTransaction>(
        "SELECT * FROM commission_transactions
         WHERE recipient_user_id = ?
         ORDER BY id DESC
         LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(PER_PAGE)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(PaginatedCommissions {
        data,
        total,
        total_commission,
        page,
        per_page: PER_PAGE,
    })
}

/// Totals per tier for distributions created between two dates (inclusive,
/// `YYYY-MM-DD`).
pub async fn tier_summary(
    state: &AppState,
    start_date: String,
    end_date: String,
) -> AppResult<CommissionSummary> {
    for date in [&start_date, &end_date] {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;
    }
    if start_date > end_date {
        return Err(AppError::Validation("Start date is after end date".into()));
    }

    let (distribution_count, transaction_volume, total_orphaned): (i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COALESCE(SUM(amount), 0),
            COALESCE(SUM(orphaned_amount), 0)
         FROM commission_distributions
         WHERE date(created_at) BETWEEN ? AND ?",
    )
    .bind(&start_date)
    .bind(&end_date)
    .fetch_one(&state.db)
    .await?;

    let tiers = sqlx::query_as::<_, TierSummary>(
        "SELECT
            tier,
            COUNT(*) as row_count,
            COALESCE(SUM(commission_amount), 0) as total_commission
         FROM commission_transactions
         WHERE date(created_at) BETWEEN ? AND ?
         GROUP BY tier
         ORDER BY total_commission DESC",
    )
    .bind(&start_date)
    .bind(&end_date)
    .fetch_all(&state.db)
    .await?;

    let total_commission = tiers.iter().map(|t| t.total_commission).sum();

    Ok(CommissionSummary {
        start_date,
        end_date,
        distribution_count,
        transaction_volume,
        total_commission,
        total_orphaned,
        tiers,
    })
}
