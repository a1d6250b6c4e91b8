//! Completion hooks called by the service modules.
//!
//! A service payment has already succeeded by the time these run, so a
//! commission failure must never bubble back into it. Every error is logged,
//! written to the activity log and swallowed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audit::{log_ledger_action, public_error_message, LedgerAuditAction};
use crate::errors::AppError;
use crate::ledger::distribute;
use crate::log_error;
use crate::models::commission::CommissionTransaction;
use crate::AppState;

/// Services that pay commission on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Recharge,
    Booking,
    Grocery,
    ProductSale,
    Taxi,
    Delivery,
    Rental,
    Recycling,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        ServiceType::Recharge,
        ServiceType::Booking,
        ServiceType::Grocery,
        ServiceType::ProductSale,
        ServiceType::Taxi,
        ServiceType::Delivery,
        ServiceType::Rental,
        ServiceType::Recycling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Recharge => "recharge",
            ServiceType::Booking => "booking",
            ServiceType::Grocery => "grocery",
            ServiceType::ProductSale => "product_sale",
            ServiceType::Taxi => "taxi",
            ServiceType::Delivery => "delivery",
            ServiceType::Rental => "rental",
            ServiceType::Recycling => "recycling",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown service type '{}'", s)))
    }
}

/// Distribute commission for a completed service transaction.
///
/// Returns the rows written (or the stored rows for a repeated id), and an
/// empty list when nothing could be distributed.
pub async fn on_service_completed(
    state: &AppState,
    service_type: ServiceType,
    transaction_id: &str,
    amount: i64,
    paying_user_id: i64,
) -> Vec<CommissionTransaction> {
    match distribute(
        &state.db,
        &state.settings,
        transaction_id,
        service_type.as_str(),
        amount,
        paying_user_id,
    )
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log_error!("COMMISSION", "Commission distribution failed", e.to_string());
            log_ledger_action(
                &state.db,
                Some(paying_user_id),
                LedgerAuditAction::CommissionFailed,
                &public_error_message(&e),
                Some(&serde_json::json!({
                    "transaction_id": transaction_id,
                    "service_type": service_type.as_str(),
                    "amount": amount,
                    "error": e.to_string(),
                })),
            )
            .await;
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::commission::CommissionRates;
    use crate::test_support::{balance_of, insert_user, seed_chain, seed_config, state};

    fn one_percent_each() -> CommissionRates {
        CommissionRates {
            admin_bps: 100,
            branch_bps: 100,
            taluk_bps: 100,
            agent_bps: 100,
            user_bps: 100,
            total_bps: 500,
        }
    }

    #[test]
    fn test_service_type_parse() {
        assert_eq!("product_sale".parse::<ServiceType>().unwrap(), ServiceType::ProductSale);
        assert!("laundry".parse::<ServiceType>().is_err());
    }

    #[tokio::test]
    async fn test_completed_recharge_pays_chain() {
        let state = state().await;
        let chain = seed_chain(&state.db).await;
        seed_config(&state.db, "recharge", one_percent_each()).await;

        let rows =
            on_service_completed(&state, ServiceType::Recharge, "RCH-1001", 100_000, chain.customer).await;
        assert_eq!(rows.len(), 5);
        assert_eq!(balance_of(&state.db, chain.agent).await, 1_000);
        assert_eq!(balance_of(&state.db, chain.customer).await, 1_000);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed_and_audited() {
        let state = state().await;
        seed_config(&state.db, "taxi", one_percent_each()).await;
        // Self-parented user: the hierarchy walk detects the cycle.
        let user = insert_user(&state.db, "Loop", "customer", None).await;
        sqlx::query("UPDATE users SET parent_id = id WHERE id = ?")
            .bind(user)
            .execute(&state.db)
            .await
            .unwrap();

        let rows = on_service_completed(&state, ServiceType::Taxi, "TX-77", 50_000, user).await;
        assert!(rows.is_empty());
        assert_eq!(balance_of(&state.db, user).await, 0);

        let (action,): (String,) =
            sqlx::query_as("SELECT action FROM activity_logs ORDER BY id DESC LIMIT 1")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(action, "COMMISSION_FAILED");
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_skipped() {
        let state = state().await;
        let chain = seed_chain(&state.db).await;

        let rows = on_service_completed(&state, ServiceType::Rental, "RNT-5", 10_000, chain.customer).await;
        assert!(rows.is_empty());

        let (action,): (String,) =
            sqlx::query_as("SELECT action FROM activity_logs ORDER BY id DESC LIMIT 1")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(action, "COMMISSION_SKIPPED");
    }
}
