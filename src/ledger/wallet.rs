//! Wallet ledger. The only code that writes `users.wallet_balance`.
//!
//! Every movement is a single conditional UPDATE followed by an append to
//! `wallet_transactions`; callers run both inside their database transaction.

use sqlx::SqliteConnection;

use crate::errors::{AppError, AppResult};
use crate::models::wallet::{WalletEntryType, WalletTransaction};

/// Current balance of a user.
pub async fn balance(conn: &mut SqliteConnection, user_id: i64) -> AppResult<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT wallet_balance FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|(b,)| b)
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
}

/// Add `amount` to the wallet and return the new balance.
pub async fn credit(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: i64,
    reference: Option<&str>,
    description: &str,
) -> AppResult<i64> {
    ensure_positive(amount)?;

    let updated = sqlx::query("UPDATE users SET wallet_balance = wallet_balance + ? WHERE id = ?")
        .bind(amount)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {}", user_id)));
    }

    let new_balance = balance(conn, user_id).await?;
    append_entry(conn, user_id, WalletEntryType::Credit, amount, new_balance, reference, description)
        .await?;

    Ok(new_balance)
}

/// Remove `amount` from the wallet and return the new balance, or
/// `InsufficientFunds` when the balance is smaller than `amount`.
pub async fn debit(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: i64,
    reference: Option<&str>,
    description: &str,
) -> AppResult<i64> {
    ensure_positive(amount)?;

    let updated = sqlx::query(
        "UPDATE users SET wallet_balance = wallet_balance - ? WHERE id = ? AND wallet_balance >= ?",
    )
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        // Either the user is missing or the balance is too low.
        let current = balance(conn, user_id).await?;
        return Err(AppError::InsufficientFunds {
            user_id,
            balance: current,
            requested: amount,
        });
    }

    let new_balance = balance(conn, user_id).await?;
    append_entry(conn, user_id, WalletEntryType::Debit, amount, new_balance, reference, description)
        .await?;

    Ok(new_balance)
}

/// Wallet history, newest first.
pub async fn history(
    conn: &mut SqliteConnection,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<WalletTransaction>> {
    Ok(sqlx::query_as::<_, WalletTransaction>(
        "SELECT * FROM wallet_transactions WHERE user_id = ? ORDER BY id DESC LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?)
}

pub async fn history_count(conn: &mut SqliteConnection, user_id: i64) -> AppResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

fn ensure_positive(amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::Validation(format!(
            "Wallet amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

async fn append_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    entry_type: WalletEntryType,
    amount: i64,
    balance_after: i64,
    reference: Option<&str>,
    description: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO wallet_transactions (user_id, entry_type, amount, balance_after, reference, description)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(entry_type.as_str())
    .bind(amount)
    .bind(balance_after)
    .bind(reference)
    .bind(description)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, state};

    #[tokio::test]
    async fn test_credit_then_debit() {
        let state = state().await;
        let user = insert_user(&state.db, "Kavya", "customer", None).await;
        let mut conn = state.db.acquire().await.unwrap();

        assert_eq!(credit(&mut conn, user, 5_000, Some("TOPUP-1"), "Top up").await.unwrap(), 5_000);
        assert_eq!(debit(&mut conn, user, 1_200, Some("RCH-9"), "Recharge").await.unwrap(), 3_800);
        assert_eq!(balance(&mut conn, user).await.unwrap(), 3_800);

        let entries = history(&mut conn, user, 10, 0).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, "debit");
        assert_eq!(entries[0].balance_after, 3_800);
        assert_eq!(entries[1].entry_type, "credit");
        assert_eq!(entries[1].reference.as_deref(), Some("TOPUP-1"));
        assert_eq!(history_count(&mut conn, user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_debit_insufficient_funds_leaves_balance() {
        let state = state().await;
        let user = insert_user(&state.db, "Kavya", "customer", None).await;
        let mut conn = state.db.acquire().await.unwrap();

        credit(&mut conn, user, 500, None, "Top up").await.unwrap();
        let err = debit(&mut conn, user, 501, None, "Too much").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientFunds { balance: 500, requested: 501, .. }
        ));
        assert_eq!(balance(&mut conn, user).await.unwrap(), 500);
        assert_eq!(history_count(&mut conn, user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_and_bad_amounts() {
        let state = state().await;
        let mut conn = state.db.acquire().await.unwrap();

        assert!(matches!(
            credit(&mut conn, 42, 100, None, "x").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            debit(&mut conn, 42, 100, None, "x").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            credit(&mut conn, 42, 0, None, "x").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
