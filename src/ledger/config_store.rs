//! Commission configuration store.

use sqlx::SqliteConnection;

use crate::errors::{AppError, AppResult};
use crate::models::commission::{CommissionConfig, CommissionRates, CreateCommissionConfigPayload, Tier};
use crate::validation::{validate_bps, validate_service_type};

/// Active config for a service type, or `ConfigNotFound`.
pub async fn get_active_config(
    conn: &mut SqliteConnection,
    service_type: &str,
) -> AppResult<CommissionConfig> {
    sqlx::query_as::<_, CommissionConfig>(
        "SELECT * FROM commission_configs WHERE service_type = ? AND is_active = 1",
    )
    .bind(service_type)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::ConfigNotFound(service_type.to_string()))
}

pub async fn get_config_by_id(conn: &mut SqliteConnection, id: i64) -> AppResult<CommissionConfig> {
    sqlx::query_as::<_, CommissionConfig>("SELECT * FROM commission_configs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Commission config {}", id)))
}

/// Every tier rate and the total must be valid basis points, and the tier
/// rates must add up to the total.
pub fn validate_rates(rates: &CommissionRates) -> AppResult<()> {
    for tier in Tier::ALL {
        validate_bps(&format!("{}_bps", tier.as_str()), rates.bps_for(tier))
            .map_err(AppError::Validation)?;
    }
    validate_bps("total_bps", rates.total_bps).map_err(AppError::Validation)?;

    if !rates.is_balanced() {
        return Err(AppError::Validation(format!(
            "Tier rates add up to {} bps but total is {} bps",
            rates.tier_sum(),
            rates.total_bps
        )));
    }

    Ok(())
}

/// Insert a config and make it the active one for its service type.
/// Must run inside a transaction so the swap is atomic.
pub async fn insert_active_config(
    conn: &mut SqliteConnection,
    payload: &CreateCommissionConfigPayload,
) -> AppResult<(CommissionConfig, Option<i64>)> {
    validate_service_type(&payload.service_type).map_err(AppError::Validation)?;
    validate_rates(&payload.rates)?;

    // Deactivating first takes the write lock before any read.
    let previous: Option<(i64,)> = sqlx::query_as(
        "UPDATE commission_configs SET is_active = 0, updated_at = CURRENT_TIMESTAMP
         WHERE service_type = ? AND is_active = 1
         RETURNING id",
    )
    .bind(&payload.service_type)
    .fetch_optional(&mut *conn)
    .await?;

    let rates = &payload.rates;
    let provider = payload
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let res = sqlx::query(
        "INSERT INTO commission_configs (
            service_type, provider, admin_bps, branch_bps, taluk_bps,
            agent_bps, user_bps, total_bps, is_active
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(&payload.service_type)
    .bind(provider)
    .bind(rates.admin_bps)
    .bind(rates.branch_bps)
    .bind(rates.taluk_bps)
    .bind(rates.agent_bps)
    .bind(rates.user_bps)
    .bind(rates.total_bps)
    .execute(&mut *conn)
    .await?;

    let config = get_config_by_id(conn, res.last_insert_rowid()).await?;
    Ok((config, previous.map(|(id,)| id)))
}

/// Turn off the active config for a service type.
pub async fn deactivate_active_config(
    conn: &mut SqliteConnection,
    service_type: &str,
) -> AppResult<CommissionConfig> {
    let deactivated: Option<(i64,)> = sqlx::query_as(
        "UPDATE commission_configs SET is_active = 0, updated_at = CURRENT_TIMESTAMP
         WHERE service_type = ? AND is_active = 1
         RETURNING id",
    )
    .bind(service_type)
    .fetch_optional(&mut *conn)
    .await?;

    let (id,) = deactivated
        .ok_or_else(|| AppError::NotFound(format!("Active config for '{}'", service_type)))?;

    get_config_by_id(conn, id).await
}

pub async fn list_configs(
    conn: &mut SqliteConnection,
    include_inactive: bool,
) -> AppResult<Vec<CommissionConfig>> {
    let sql = if include_inactive {
        "SELECT * FROM commission_configs ORDER BY service_type ASC, id DESC"
    } else {
        "SELECT * FROM commission_configs WHERE is_active = 1 ORDER BY service_type ASC"
    };

    Ok(sqlx::query_as::<_, CommissionConfig>(sql)
        .fetch_all(&mut *conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::init_memory_db;

    fn payload(service_type: &str, each: i64) -> CreateCommissionConfigPayload {
        CreateCommissionConfigPayload {
            service_type: service_type.to_string(),
            provider: None,
            rates: CommissionRates {
                admin_bps: each,
                branch_bps: each,
                taluk_bps: each,
                agent_bps: each,
                user_bps: each,
                total_bps: each * 5,
            },
        }
    }

    #[tokio::test]
    async fn test_missing_config_is_config_not_found() {
        let pool = init_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let err = get_active_config(&mut conn, "unknown_service").await.unwrap_err();
        assert!(matches!(err, AppError::ConfigNotFound(t) if t == "unknown_service"));
    }

    #[tokio::test]
    async fn test_new_config_replaces_active_one() {
        let pool = init_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let (first, prev) = insert_active_config(&mut conn, &payload("recharge", 100)).await.unwrap();
        assert!(prev.is_none());

        let (second, prev) = insert_active_config(&mut conn, &payload("recharge", 50)).await.unwrap();
        assert_eq!(prev, Some(first.id));

        let active = get_active_config(&mut conn, "recharge").await.unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.total_bps, 250);

        let all = list_configs(&mut conn, true).await.unwrap();
        assert_eq!(all.len(), 2);
        let old = all.iter().find(|c| c.id == first.id).unwrap();
        assert!(!old.is_active);
        assert!(old.updated_at.is_some());

        assert_eq!(list_configs(&mut conn, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unbalanced_rates_rejected() {
        let pool = init_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut p = payload("taxi", 100);
        p.rates.total_bps = 600;
        let err = insert_active_config(&mut conn, &p).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let pool = init_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        insert_active_config(&mut conn, &payload("grocery", 100)).await.unwrap();
        let off = deactivate_active_config(&mut conn, "grocery").await.unwrap();
        assert!(!off.is_active);

        let err = deactivate_active_config(&mut conn, "grocery").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
