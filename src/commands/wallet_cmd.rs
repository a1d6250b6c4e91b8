use crate::audit::{log_ledger_action, LedgerAuditAction};
use crate::errors::{AppError, AppResult};
use crate::ledger::wallet;
use crate::models::wallet::{PaginatedWalletTransactions, WalletMovementPayload};
use crate::validation::{sanitize_string, validate_amount, validate_notes, MAX_AMOUNT_MINOR};
use crate::AppState;

const PER_PAGE: i64 = 20;

fn check_movement(payload: &WalletMovementPayload) -> AppResult<String> {
    validate_amount(payload.amount, Some(1), Some(MAX_AMOUNT_MINOR)).map_err(AppError::Validation)?;
    let description = sanitize_string(payload.description.trim());
    if description.is_empty() {
        return Err(AppError::Validation("Description is required".into()));
    }
    validate_notes(&description).map_err(AppError::Validation)?;
    Ok(description)
}

/// Manual credit (top-up, refund). Returns the new balance.
pub async fn credit_wallet(state: &AppState, payload: WalletMovementPayload) -> AppResult<i64> {
    let description = check_movement(&payload)?;

    let mut tx = state.db.begin().await?;
    let balance = wallet::credit(
        &mut tx,
        payload.user_id,
        payload.amount,
        payload.reference.as_deref(),
        &description,
    )
    .await?;
    tx.commit().await?;

    log_ledger_action(
        &state.db,
        Some(payload.user_id),
        LedgerAuditAction::WalletCredit,
        &description,
        Some(&serde_json::json!({
            "amount": payload.amount,
            "reference": payload.reference,
            "balance_after": balance,
        })),
    )
    .await;

    Ok(balance)
}

/// Payment out of a wallet. Fails with `InsufficientFunds` and leaves the
/// balance untouched when it would go negative.
pub async fn debit_wallet(state: &AppState, payload: WalletMovementPayload) -> AppResult<i64> {
    let description = check_movement(&payload)?;

    let mut tx = state.db.begin().await?;
    let balance = wallet::debit(
        &mut tx,
        payload.user_id,
        payload.amount,
        payload.reference.as_deref(),
        &description,
    )
    .await?;
    tx.commit().await?;

    log_ledger_action(
        &state.db,
        Some(payload.user_id),
        LedgerAuditAction::WalletDebit,
        &description,
        Some(&serde_json::json!({
            "amount": payload.amount,
            "reference": payload.reference,
            "balance_after": balance,
        })),
    )
    .await;

    Ok(balance)
}

pub async fn get_balance(state: &AppState, user_id: i64) -> AppResult<i64> {
    let mut conn = state.db.acquire().await?;
    wallet::balance(&mut conn, user_id).await
}

/// Wallet statement, newest first. Pages start at 1.
pub async fn get_wallet_history(
    state: &AppState,
    user_id: i64,
    page: i64,
) -> AppResult<PaginatedWalletTransactions> {
    let page = page.clamp(1, i64::MAX / PER_PAGE);
    let offset = (page - 1) * PER_PAGE;

    let mut conn = state.db.acquire().await?;
    let balance = wallet::balance(&mut conn, user_id).await?;
    let total = wallet::history_count(&mut conn, user_id).await?;
    let data = wallet::history(&mut conn, user_id, PER_PAGE, offset).await?;

    Ok(PaginatedWalletTransactions {
        data,
        balance,
        total,
        page,
        per_page: PER_PAGE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, state};

    fn movement(user_id: i64, amount: i64) -> WalletMovementPayload {
        WalletMovementPayload {
            user_id,
            amount,
            reference: Some("PAY-001".into()),
            description: "Mobile recharge".into(),
        }
    }

    #[tokio::test]
    async fn test_credit_and_debit_are_audited() {
        let state = state().await;
        let user = insert_user(&state.db, "Meena", "customer", None).await;

        assert_eq!(credit_wallet(&state, movement(user, 10_000)).await.unwrap(), 10_000);
        assert_eq!(debit_wallet(&state, movement(user, 2_500)).await.unwrap(), 7_500);
        assert_eq!(get_balance(&state, user).await.unwrap(), 7_500);

        let actions: Vec<(String,)> =
            sqlx::query_as("SELECT action FROM activity_logs WHERE user_id = ? ORDER BY id")
                .bind(user)
                .fetch_all(&state.db)
                .await
                .unwrap();
        assert_eq!(
            actions.into_iter().map(|(a,)| a).collect::<Vec<_>>(),
            vec!["WALLET_CREDIT", "WALLET_DEBIT"]
        );
    }

    #[tokio::test]
    async fn test_overdraw_rejected() {
        let state = state().await;
        let user = insert_user(&state.db, "Meena", "customer", None).await;
        credit_wallet(&state, movement(user, 1_000)).await.unwrap();

        let err = debit_wallet(&state, movement(user, 1_001)).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));
        assert_eq!(get_balance(&state, user).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_invalid_movements() {
        let state = state().await;
        let user = insert_user(&state.db, "Meena", "customer", None).await;

        assert!(matches!(
            credit_wallet(&state, movement(user, 0)).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let mut blank = movement(user, 100);
        blank.description = "   ".into();
        assert!(matches!(
            credit_wallet(&state, blank).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let state = state().await;
        let user = insert_user(&state.db, "Meena", "customer", None).await;
        for _ in 0..25 {
            credit_wallet(&state, movement(user, 100)).await.unwrap();
        }

        let first = get_wallet_history(&state, user, 1).await.unwrap();
        assert_eq!(first.total, 25);
        assert_eq!(first.data.len(), 20);
        assert_eq!(first.balance, 2_500);
        assert_eq!(first.data[0].balance_after, 2_500);

        let second = get_wallet_history(&state, user, 2).await.unwrap();
        assert_eq!(second.data.len(), 5);
        assert_eq!(second.data[4].balance_after, 100);

        // Page 0 is treated as the first page.
        assert_eq!(get_wallet_history(&state, user, 0).await.unwrap().page, 1);

        let beyond = get_wallet_history(&state, user, i64::MAX).await.unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total, 25);
    }
}
