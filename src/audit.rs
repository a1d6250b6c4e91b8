use sqlx::SqlitePool;

use crate::errors::AppError;

/// Audit log actions for the commission ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAuditAction {
    ConfigCreate,
    ConfigDeactivate,
    UserRegister,
    WalletCredit,
    WalletDebit,
    CommissionDistributed,
    CommissionSkipped,
    CommissionFailed,
}

impl LedgerAuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAuditAction::ConfigCreate => "COMMISSION_CONFIG_CREATE",
            LedgerAuditAction::ConfigDeactivate => "COMMISSION_CONFIG_DEACTIVATE",
            LedgerAuditAction::UserRegister => "USER_REGISTER",
            LedgerAuditAction::WalletCredit => "WALLET_CREDIT",
            LedgerAuditAction::WalletDebit => "WALLET_DEBIT",
            LedgerAuditAction::CommissionDistributed => "COMMISSION_DISTRIBUTED",
            LedgerAuditAction::CommissionSkipped => "COMMISSION_SKIPPED",
            LedgerAuditAction::CommissionFailed => "COMMISSION_FAILED",
        }
    }
}

/// Record a ledger action in activity_logs. Audit writes never fail the
/// caller; a failed insert is only logged.
pub async fn log_ledger_action(
    db: &SqlitePool,
    user_id: Option<i64>,
    action: LedgerAuditAction,
    description: &str,
    metadata: Option<&serde_json::Value>,
) {
    let metadata_str = metadata.map(|m| m.to_string());

    let result = sqlx::query(
        "INSERT INTO activity_logs (user_id, action, description, metadata) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(description)
    .bind(metadata_str.as_deref())
    .execute(db)
    .await;

    if let Err(e) = result {
        crate::log_error!("AUDIT", "Failed to write activity log", e.to_string());
    }
}

/// Short, non-internal message for an error surfaced to callers outside the
/// ledger (reporting screens, service modules).
pub fn public_error_message(error: &AppError) -> String {
    match error {
        AppError::Database(_) | AppError::Internal(_) => {
            "Internal ledger error. Please contact the administrator.".to_string()
        }
        AppError::HierarchyCycle(_) | AppError::HierarchyTooDeep { .. } => {
            "The user's hierarchy is misconfigured. Please contact the administrator.".to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_ledger_action_writes_row() {
        let state = crate::test_support::state().await;
        log_ledger_action(
            &state.db,
            None,
            LedgerAuditAction::CommissionSkipped,
            "No config",
            Some(&serde_json::json!({ "service_type": "unknown_service" })),
        )
        .await;

        let (action, metadata): (String, Option<String>) =
            sqlx::query_as("SELECT action, metadata FROM activity_logs")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(action, "COMMISSION_SKIPPED");
        assert!(metadata.unwrap().contains("unknown_service"));
    }

    #[test]
    fn test_public_error_message_hides_internals() {
        let msg = public_error_message(&AppError::Internal("pool exhausted".into()));
        assert!(!msg.contains("pool"));
        let msg = public_error_message(&AppError::InsufficientFunds {
            user_id: 1,
            balance: 10,
            requested: 20,
        });
        assert!(msg.contains("Insufficient funds"));
    }
}
