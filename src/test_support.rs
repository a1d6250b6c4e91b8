//! Fixtures shared by the in-crate tests.

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{CommissionSettings, DatabaseConfig};
use crate::database::connection::init_db;
use crate::models::commission::CommissionRates;
use crate::AppState;

pub struct Chain {
    pub admin: i64,
    pub branch: i64,
    pub taluk: i64,
    pub agent: i64,
    pub customer: i64,
}

pub async fn state() -> AppState {
    AppState::in_memory(CommissionSettings::default()).await.unwrap()
}

/// Ledger on a WAL database file in a throwaway directory, with a pool of
/// several connections. Remove the directory with [`cleanup`].
pub async fn file_state() -> (AppState, PathBuf) {
    let dir = std::env::temp_dir().join(format!("ledger-db-{}", uuid::Uuid::new_v4()));
    let config = DatabaseConfig {
        path: "ledger.db".to_string(),
        max_connections: 10,
        min_connections: 1,
        connect_timeout_secs: 30,
        idle_timeout_secs: 600,
        busy_timeout_secs: 30,
    };
    let db = init_db(&dir, &config).await.unwrap();
    let state = AppState {
        db,
        settings: CommissionSettings::default(),
        started_at: Instant::now(),
    };
    (state, dir)
}

pub async fn cleanup(state: AppState, dir: PathBuf) {
    state.db.close().await;
    let _ = std::fs::remove_dir_all(dir);
}

pub async fn insert_user(db: &SqlitePool, name: &str, user_type: &str, parent: Option<i64>) -> i64 {
    sqlx::query("INSERT INTO users (name, user_type, parent_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(user_type)
        .bind(parent)
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// admin -> branch manager -> taluk manager -> service agent -> customer
pub async fn seed_chain(db: &SqlitePool) -> Chain {
    let admin = insert_user(db, "Admin", "admin", None).await;
    let branch = insert_user(db, "Branch Mgr", "branch_manager", Some(admin)).await;
    let taluk = insert_user(db, "Taluk Mgr", "taluk_manager", Some(branch)).await;
    let agent = insert_user(db, "Agent", "service_agent", Some(taluk)).await;
    let customer = insert_user(db, "Customer", "customer", Some(agent)).await;
    Chain {
        admin,
        branch,
        taluk,
        agent,
        customer,
    }
}

pub async fn seed_config(db: &SqlitePool, service_type: &str, rates: CommissionRates) -> i64 {
    sqlx::query(
        "INSERT INTO commission_configs (
            service_type, admin_bps, branch_bps, taluk_bps, agent_bps, user_bps, total_bps
        ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(service_type)
    .bind(rates.admin_bps)
    .bind(rates.branch_bps)
    .bind(rates.taluk_bps)
    .bind(rates.agent_bps)
    .bind(rates.user_bps)
    .bind(rates.total_bps)
    .execute(db)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn balance_of(db: &SqlitePool, user_id: i64) -> i64 {
    let (balance,): (i64,) = sqlx::query_as("SELECT wallet_balance FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await
        .unwrap();
    balance
}
