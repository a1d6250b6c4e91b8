use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::commission::Tier;
use crate::errors::AppError;

/// Position of a user in the organizational hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Admin,
    BranchManager,
    TalukManager,
    ServiceAgent,
    Customer,
    Provider,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "admin",
            UserType::BranchManager => "branch_manager",
            UserType::TalukManager => "taluk_manager",
            UserType::ServiceAgent => "service_agent",
            UserType::Customer => "customer",
            UserType::Provider => "provider",
        }
    }

    /// Staff rank; higher ranks sit closer to the root. Customers and
    /// providers are leaves.
    pub fn rank(&self) -> u8 {
        match self {
            UserType::Admin => 4,
            UserType::BranchManager => 3,
            UserType::TalukManager => 2,
            UserType::ServiceAgent => 1,
            UserType::Customer | UserType::Provider => 0,
        }
    }

    /// Commission tier this user type fills when found above a paying user.
    pub fn ancestor_tier(&self) -> Option<Tier> {
        match self {
            UserType::Admin => Some(Tier::Admin),
            UserType::BranchManager => Some(Tier::Branch),
            UserType::TalukManager => Some(Tier::Taluk),
            UserType::ServiceAgent => Some(Tier::Agent),
            UserType::Customer | UserType::Provider => None,
        }
    }

    /// Whether a user of this type may hang under a parent of `parent` type.
    pub fn can_report_to(&self, parent: UserType) -> bool {
        match self {
            UserType::Admin => false,
            _ => parent.rank() > self.rank(),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserType::Admin),
            "branch_manager" => Ok(UserType::BranchManager),
            "taluk_manager" => Ok(UserType::TalukManager),
            "service_agent" => Ok(UserType::ServiceAgent),
            "customer" => Ok(UserType::Customer),
            "provider" => Ok(UserType::Provider),
            other => Err(AppError::Validation(format!("Unknown user type '{}'", other))),
        }
    }
}

/// Row from the users table, for query_as.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub user_type: String,
    pub parent_id: Option<i64>,
    pub wallet_balance: i64,
    pub district: Option<String>,
    pub taluk: Option<String>,
    pub pincode: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
}

/// User with a typed hierarchy position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub parent_id: Option<i64>,
    pub wallet_balance: i64,
    pub district: Option<String>,
    pub taluk: Option<String>,
    pub pincode: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(u: DbUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u.id,
            name: u.name,
            phone: u.phone,
            user_type: u.user_type.parse()?,
            parent_id: u.parent_id,
            wallet_balance: u.wallet_balance,
            district: u.district,
            taluk: u.taluk,
            pincode: u.pincode,
            is_active: u.is_active,
            created_at: u.created_at,
        })
    }
}

/// Payload for registering a hierarchy member.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserPayload {
    pub name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub parent_id: Option<i64>,
    pub district: Option<String>,
    pub taluk: Option<String>,
    pub pincode: Option<String>,
}
