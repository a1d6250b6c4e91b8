use sqlx::SqlitePool;

use crate::log_warn;

/// Run all ledger migrations (CREATE TABLE IF NOT EXISTS + column upgrades).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: users (hierarchy + wallet balance)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            name            TEXT     NOT NULL,
            phone           TEXT,
            user_type       TEXT     NOT NULL CHECK(user_type IN (
                                'admin', 'branch_manager', 'taluk_manager',
                                'service_agent', 'customer', 'provider')),
            parent_id       INTEGER  REFERENCES users(id) ON DELETE RESTRICT,
            wallet_balance  INTEGER  NOT NULL DEFAULT 0 CHECK(wallet_balance >= 0),
            district        TEXT,
            taluk           TEXT,
            pincode         TEXT,
            is_active       INTEGER  NOT NULL DEFAULT 1,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_parent ON users(parent_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_phone ON users(phone) WHERE phone IS NOT NULL")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: commission_configs
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commission_configs (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            service_type  TEXT     NOT NULL,
            provider      TEXT,
            admin_bps     INTEGER  NOT NULL DEFAULT 0 CHECK(admin_bps  BETWEEN 0 AND 10000),
            branch_bps    INTEGER  NOT NULL DEFAULT 0 CHECK(branch_bps BETWEEN 0 AND 10000),
            taluk_bps     INTEGER  NOT NULL DEFAULT 0 CHECK(taluk_bps  BETWEEN 0 AND 10000),
            agent_bps     INTEGER  NOT NULL DEFAULT 0 CHECK(agent_bps  BETWEEN 0 AND 10000),
            user_bps      INTEGER  NOT NULL DEFAULT 0 CHECK(user_bps   BETWEEN 0 AND 10000),
            total_bps     INTEGER  NOT NULL CHECK(total_bps BETWEEN 0 AND 10000),
            is_active     INTEGER  NOT NULL DEFAULT 1,
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // One active config per service type
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_commission_configs_active
         ON commission_configs(service_type) WHERE is_active = 1",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: wallet_transactions (append-only history)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wallet_transactions (
            id             INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id        INTEGER  NOT NULL REFERENCES users(id),
            entry_type     TEXT     NOT NULL CHECK(entry_type IN ('credit', 'debit')),
            amount         INTEGER  NOT NULL CHECK(amount > 0),
            balance_after  INTEGER  NOT NULL CHECK(balance_after >= 0),
            reference      TEXT,
            description    TEXT     NOT NULL,
            created_at     DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_wallet_tx_user ON wallet_transactions(user_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: commission_distributions (one row per distribution event)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commission_distributions (
            original_transaction_id  TEXT     PRIMARY KEY,
            service_type             TEXT     NOT NULL,
            amount                   INTEGER  NOT NULL CHECK(amount >= 0),
            paying_user_id           INTEGER  NOT NULL
                                     REFERENCES users(id) DEFERRABLE INITIALLY DEFERRED,
            config_id                INTEGER  REFERENCES commission_configs(id),
            distributed_amount       INTEGER  NOT NULL DEFAULT 0,
            orphaned_amount          INTEGER  NOT NULL DEFAULT 0,
            created_at               DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: commission_transactions (audit trail, one row per beneficiary)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commission_transactions (
            id                       INTEGER  PRIMARY KEY AUTOINCREMENT,
            original_transaction_id  TEXT     NOT NULL
                                     REFERENCES commission_distributions(original_transaction_id),
            service_type             TEXT     NOT NULL,
            amount                   INTEGER  NOT NULL,
            recipient_user_id        INTEGER  NOT NULL REFERENCES users(id),
            tier                     TEXT     NOT NULL CHECK(tier IN ('admin', 'branch', 'taluk', 'agent', 'user')),
            rate_bps                 INTEGER  NOT NULL,
            commission_amount        INTEGER  NOT NULL CHECK(commission_amount > 0),
            created_at               DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(original_transaction_id, tier)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_commission_tx_recipient ON commission_transactions(recipient_user_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_commission_tx_created ON commission_transactions(created_at)",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: activity_logs (Audit Trail)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            action      TEXT    NOT NULL, -- 'COMMISSION_DISTRIBUTED', 'CONFIG_CREATE', etc.
            description TEXT    NOT NULL,
            metadata    TEXT,             -- JSON string for extra data
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // MIGRATION: later columns (ALTER TABLE, safe on existing data)
    // ═══════════════════════════════════════

    // Last edit of a config (set when it is deactivated)
    safe_add_column(pool, "commission_configs", "updated_at", "DATETIME").await;

    Ok(())
}

/// ALTER TABLE ADD COLUMN that ignores "duplicate column" errors.
async fn safe_add_column(pool: &SqlitePool, table: &str, column: &str, col_type: &str) {
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, col_type);
    if let Err(e) = sqlx::query(&sql).execute(pool).await {
        let msg = e.to_string();
        if !msg.contains("duplicate column") {
            log_warn!("DATABASE", &format!("Migration warning: {}", msg));
        }
    }
}
