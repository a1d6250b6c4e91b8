use crate::audit::{log_ledger_action, LedgerAuditAction};
use crate::errors::{AppError, AppResult};
use crate::ledger::hierarchy::{ancestor_chain, load_user};
use crate::models::user::{DbUser, RegisterUserPayload, User, UserType};
use crate::validation::{sanitize_string, validate_name, validate_phone, validate_pincode};
use crate::AppState;

/// Register a hierarchy member under a parent of a higher rank.
pub async fn register_user(state: &AppState, payload: RegisterUserPayload) -> AppResult<User> {
    let name = sanitize_string(payload.name.trim());
    validate_name(&name).map_err(AppError::Validation)?;

    let phone = payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if let Some(phone) = phone {
        validate_phone(phone).map_err(AppError::Validation)?;
    }

    let pincode = payload.pincode.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if let Some(pincode) = pincode {
        validate_pincode(pincode).map_err(AppError::Validation)?;
    }

    match (payload.user_type, payload.parent_id) {
        (UserType::Admin, Some(_)) => {
            return Err(AppError::Validation("An admin cannot have a parent".into()));
        }
        (UserType::Admin, None) => {}
        (_, None) => {
            return Err(AppError::Validation(format!(
                "A {} must be registered under a parent",
                payload.user_type
            )));
        }
        (user_type, Some(parent_id)) => {
            let mut conn = state.db.acquire().await?;
            let parent = load_user(&mut conn, parent_id).await?;

            if !parent.is_active {
                return Err(AppError::Validation(format!("Parent {} is inactive", parent_id)));
            }
            if !user_type.can_report_to(parent.user_type) {
                return Err(AppError::Validation(format!(
                    "A {} cannot be registered under a {}",
                    user_type, parent.user_type
                )));
            }
        }
    }

    let result = sqlx::query(
        "INSERT INTO users (name, phone, user_type, parent_id, district, taluk, pincode)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(phone)
    .bind(payload.user_type.as_str())
    .bind(payload.parent_id)
    .bind(payload.district.as_deref().map(str::trim))
    .bind(payload.taluk.as_deref().map(str::trim))
    .bind(pincode)
    .execute(&state.db)
    .await;

    let id = match result {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Validation("Phone number already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    log_ledger_action(
        &state.db,
        Some(id),
        LedgerAuditAction::UserRegister,
        &format!("Registered {} '{}'", payload.user_type, name),
        Some(&serde_json::json!({ "parent_id": payload.parent_id })),
    )
    .await;

    get_user(state, id).await
}

pub async fn get_user(state: &AppState, id: i64) -> AppResult<User> {
    let mut conn = state.db.acquire().await?;
    load_user(&mut conn, id).await
}

/// Direct children of a user, by name.
pub async fn list_children(state: &AppState, parent_id: i64) -> AppResult<Vec<User>> {
    let rows = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE parent_id = ? ORDER BY name ASC")
        .bind(parent_id)
        .fetch_all(&state.db)
        .await?;

    rows.into_iter().map(User::try_from).collect()
}

/// Ancestors of a user, nearest first, up to the admin.
pub async fn get_ancestors(state: &AppState, user_id: i64) -> AppResult<Vec<User>> {
    let mut conn = state.db.acquire().await?;
    let (_, chain) = ancestor_chain(&mut conn, user_id, state.settings.max_hierarchy_depth).await?;
    Ok(chain)
}

/// Enable or disable a user. Inactive users receive no commission.
pub async fn set_user_active(state: &AppState, user_id: i64, is_active: bool) -> AppResult<User> {
    let res = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(is_active)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {}", user_id)));
    }

    get_user(state, user_id).await
}
