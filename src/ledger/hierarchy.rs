//! Hierarchy resolver: finds the beneficiary of each tier above a paying user.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::HashSet;

use crate::errors::{AppError, AppResult};
use crate::log_debug;
use crate::models::commission::Tier;
use crate::models::user::{DbUser, User, UserType};

/// Beneficiary user ids per tier. The user tier is always the paying user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiaries {
    pub user: i64,
    pub agent: Option<i64>,
    pub taluk: Option<i64>,
    pub branch: Option<i64>,
    pub admin: Option<i64>,
}

impl Beneficiaries {
    pub fn new(paying_user_id: i64) -> Self {
        Self {
            user: paying_user_id,
            agent: None,
            taluk: None,
            branch: None,
            admin: None,
        }
    }

    pub fn for_tier(&self, tier: Tier) -> Option<i64> {
        match tier {
            Tier::User => Some(self.user),
            Tier::Agent => self.agent,
            Tier::Taluk => self.taluk,
            Tier::Branch => self.branch,
            Tier::Admin => self.admin,
        }
    }

    fn slot_mut(&mut self, tier: Tier) -> Option<&mut Option<i64>> {
        match tier {
            Tier::User => None,
            Tier::Agent => Some(&mut self.agent),
            Tier::Taluk => Some(&mut self.taluk),
            Tier::Branch => Some(&mut self.branch),
            Tier::Admin => Some(&mut self.admin),
        }
    }

    /// Tiers above the user tier with no beneficiary.
    pub fn missing_tiers(&self) -> Vec<Tier> {
        Tier::ALL
            .into_iter()
            .filter(|t| self.for_tier(*t).is_none())
            .collect()
    }
}

pub async fn load_user(conn: &mut SqliteConnection, user_id: i64) -> AppResult<User> {
    let row = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
    User::try_from(row)
}

/// Ancestors of `user_id`, nearest first, up to and including the first
/// admin. Fails on a parent cycle or a chain longer than `max_depth`.
pub async fn ancestor_chain(
    conn: &mut SqliteConnection,
    user_id: i64,
    max_depth: usize,
) -> AppResult<(User, Vec<User>)> {
    let start = load_user(conn, user_id).await?;

    let mut visited = HashSet::from([start.id]);
    let mut chain = Vec::new();
    let mut next = start.parent_id;

    while let Some(parent_id) = next {
        if !visited.insert(parent_id) {
            return Err(AppError::HierarchyCycle(parent_id));
        }
        if chain.len() >= max_depth {
            return Err(AppError::HierarchyTooDeep { user_id, max_depth });
        }

        let ancestor = load_user(conn, parent_id).await?;
        let is_root = ancestor.user_type == UserType::Admin;
        next = ancestor.parent_id;
        chain.push(ancestor);

        if is_root {
            break;
        }
    }

    Ok((start, chain))
}

/// Nearest active ancestor of each tier's user type. Inactive ancestors are
/// walked through but never fill a slot.
pub async fn resolve_beneficiaries(
    conn: &mut SqliteConnection,
    user_id: i64,
    max_depth: usize,
) -> AppResult<Beneficiaries> {
    let (payer, chain) = ancestor_chain(conn, user_id, max_depth).await?;
    let mut beneficiaries = Beneficiaries::new(payer.id);

    for ancestor in chain.iter().filter(|a| a.is_active) {
        let Some(tier) = ancestor.user_type.ancestor_tier() else {
            continue;
        };
        if let Some(slot) = beneficiaries.slot_mut(tier) {
            if slot.is_none() {
                *slot = Some(ancestor.id);
            }
        }
    }

    log_debug!("HIERARCHY", "Beneficiaries resolved", serde_json::json!({
        "user_id": user_id,
        "chain_length": chain.len(),
        "beneficiaries": beneficiaries,
    }));

    Ok(beneficiaries)
}
