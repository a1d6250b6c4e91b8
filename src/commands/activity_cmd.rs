use crate::errors::AppResult;
use crate::models::activity::ActivityLogWithUser;
use crate::AppState;

/// Latest ledger activity, optionally filtered by action
/// (e.g. `COMMISSION_FAILED`).
pub async fn get_activity_logs(
    state: &AppState,
    action: Option<String>,
    limit: i64,
) -> AppResult<Vec<ActivityLogWithUser>> {
    let mut query = r#"
        SELECT al.*, u.name as user_name
        FROM activity_logs al
        LEFT JOIN users u ON al.user_id = u.id
    "#
    .to_string();

    if action.is_some() {
        query.push_str(" WHERE al.action = ?");
    }

    query.push_str(" ORDER BY al.id DESC LIMIT ?");

    let mut sql_query = sqlx::query_as::<_, ActivityLogWithUser>(&query);

    if let Some(action) = &action {
        sql_query = sql_query.bind(action);
    }

    let logs = sql_query
        .bind(limit.clamp(1, 500))
        .fetch_all(&state.db)
        .await?;

    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{log_ledger_action, LedgerAuditAction};
    use crate::test_support::{insert_user, state};

    #[tokio::test]
    async fn test_logs_joined_with_user_and_filtered() {
        let state = state().await;
        let user = insert_user(&state.db, "Farida", "customer", None).await;

        log_ledger_action(&state.db, Some(user), LedgerAuditAction::WalletCredit, "Top up", None).await;
        log_ledger_action(&state.db, None, LedgerAuditAction::CommissionSkipped, "No config", None).await;

        let all = get_activity_logs(&state, None, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, "COMMISSION_SKIPPED");
        assert_eq!(all[1].user_name.as_deref(), Some("Farida"));

        let credits = get_activity_logs(&state, Some("WALLET_CREDIT".into()), 10).await.unwrap();
        assert_eq!(credits.len(), 1);
    }
}
