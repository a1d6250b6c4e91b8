use crate::audit::{log_ledger_action, LedgerAuditAction};
use crate::errors::AppResult;
use crate::ledger::config_store;
use crate::log_info;
use crate::models::commission::{CommissionConfig, CreateCommissionConfigPayload};
use crate::AppState;

/// Create a config and make it the active one for its service type. The
/// previously active config, if any, is deactivated in the same transaction.
pub async fn create_config(
    state: &AppState,
    payload: CreateCommissionConfigPayload,
) -> AppResult<CommissionConfig> {
    let mut tx = state.db.begin().await?;
    let (config, previous_id) = config_store::insert_active_config(&mut tx, &payload).await?;
    tx.commit().await?;

    log_info!("COMMISSION_CONFIG", "Config activated", serde_json::json!({
        "config_id": config.id,
        "service_type": config.service_type,
        "total_bps": config.total_bps,
        "replaced": previous_id,
    }));

    log_ledger_action(
        &state.db,
        None,
        LedgerAuditAction::ConfigCreate,
        &format!("Commission config for '{}' set to {} bps", config.service_type, config.total_bps),
        Some(&serde_json::json!({
            "config_id": config.id,
            "previous_config_id": previous_id,
            "rates": config.rates(),
        })),
    )
    .await;

    Ok(config)
}

pub async fn get_active_config(state: &AppState, service_type: &str) -> AppResult<CommissionConfig> {
    let mut conn = state.db.acquire().await?;
    config_store::get_active_config(&mut conn, service_type).await
}

pub async fn list_configs(state: &AppState, include_inactive: bool) -> AppResult<Vec<CommissionConfig>> {
    let mut conn = state.db.acquire().await?;
    config_store::list_configs(&mut conn, include_inactive).await
}

/// Turn off commissions for a service type. Later distributions for it are
/// skipped until a new config is created.
pub async fn deactivate_config(state: &AppState, service_type: &str) -> AppResult<CommissionConfig> {
    let mut tx = state.db.begin().await?;
    let config = config_store::deactivate_active_config(&mut tx, service_type).await?;
    tx.commit().await?;

    log_ledger_action(
        &state.db,
        None,
        LedgerAuditAction::ConfigDeactivate,
        &format!("Commission config for '{}' deactivated", config.service_type),
        Some(&serde_json::json!({ "config_id": config.id })),
    )
    .await;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::models::commission::CommissionRates;
    use crate::test_support::{cleanup, file_state, state};

    fn payload(service_type: &str, agent_bps: i64) -> CreateCommissionConfigPayload {
        CreateCommissionConfigPayload {
            service_type: service_type.to_string(),
            provider: Some("Airtel".into()),
            rates: CommissionRates {
                admin_bps: 50,
                branch_bps: 50,
                taluk_bps: 50,
                agent_bps,
                user_bps: 0,
                total_bps: 150 + agent_bps,
            },
        }
    }

    #[tokio::test]
    async fn test_create_replaces_active_config() {
        let state = state().await;
        let first = create_config(&state, payload("recharge", 100)).await.unwrap();
        let second = create_config(&state, payload("recharge", 200)).await.unwrap();

        let active = get_active_config(&state, "recharge").await.unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.agent_bps, 200);

        let all = list_configs(&state, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|c| c.id == first.id && !c.is_active));
        assert_eq!(list_configs(&state, false).await.unwrap().len(), 1);

        let (audits,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM activity_logs WHERE action = 'COMMISSION_CONFIG_CREATE'",
        )
        .fetch_one(&state.db)
        .await
        .unwrap();
        assert_eq!(audits, 2);
    }

    #[tokio::test]
    async fn test_unbalanced_config_rejected() {
        let state = state().await;
        let mut bad = payload("booking", 100);
        bad.rates.total_bps = 999;

        let err = create_config(&state, bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(list_configs(&state, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_config() {
        let state = state().await;
        create_config(&state, payload("taxi", 100)).await.unwrap();

        let off = deactivate_config(&state, "taxi").await.unwrap();
        assert!(!off.is_active);
        assert!(matches!(
            get_active_config(&state, "taxi").await.unwrap_err(),
            AppError::ConfigNotFound(_)
        ));
        assert!(matches!(
            deactivate_config(&state, "taxi").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_leave_one_active() {
        let (state, dir) = file_state().await;

        let handles: Vec<_> = (1..=10)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move { create_config(&state, payload("grocery", i * 10)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(list_configs(&state, true).await.unwrap().len(), 10);
        let active = list_configs(&state, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].service_type, "grocery");

        cleanup(state, dir).await;
    }
}
