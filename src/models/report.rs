use serde::{Deserialize, Serialize};

use super::commission::CommissionTransaction;

/// Commission totals for one tier over a period.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TierSummary {
    pub tier: String,
    pub row_count: i64,
    pub total_commission: i64,
}

/// Commission totals across all tiers over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub start_date: String,
    pub end_date: String,
    pub distribution_count: i64,
    pub transaction_volume: i64,
    pub total_commission: i64,
    pub total_orphaned: i64,
    pub tiers: Vec<TierSummary>,
}

/// Paginated commission rows for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedCommissions {
    pub data: Vec<CommissionTransaction>,
    pub total: i64,
    pub total_commission: i64,
    pub page: i64,
    pub per_page: i64,
}
