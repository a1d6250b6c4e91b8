use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// One level of the commission hierarchy, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Admin,
    Branch,
    Taluk,
    Agent,
    User,
}

impl Tier {
    /// All tiers, highest first.
    pub const ALL: [Tier; 5] = [Tier::Admin, Tier::Branch, Tier::Taluk, Tier::Agent, Tier::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Admin => "admin",
            Tier::Branch => "branch",
            Tier::Taluk => "taluk",
            Tier::Agent => "agent",
            Tier::User => "user",
        }
    }

    /// The next tier up, if any.
    pub fn parent(&self) -> Option<Tier> {
        match self {
            Tier::Admin => None,
            Tier::Branch => Some(Tier::Admin),
            Tier::Taluk => Some(Tier::Branch),
            Tier::Agent => Some(Tier::Taluk),
            Tier::User => Some(Tier::Agent),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Tier::Admin),
            "branch" => Ok(Tier::Branch),
            "taluk" => Ok(Tier::Taluk),
            "agent" => Ok(Tier::Agent),
            "user" => Ok(Tier::User),
            other => Err(AppError::Validation(format!("Unknown tier '{}'", other))),
        }
    }
}

/// Percentage split for one service type. Rates are basis points.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommissionConfig {
    pub id: i64,
    pub service_type: String,
    pub provider: Option<String>,
    pub admin_bps: i64,
    pub branch_bps: i64,
    pub taluk_bps: i64,
    pub agent_bps: i64,
    pub user_bps: i64,
    pub total_bps: i64,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl CommissionConfig {
    pub fn rates(&self) -> CommissionRates {
        CommissionRates {
            admin_bps: self.admin_bps,
            branch_bps: self.branch_bps,
            taluk_bps: self.taluk_bps,
            agent_bps: self.agent_bps,
            user_bps: self.user_bps,
            total_bps: self.total_bps,
        }
    }
}

/// The numeric part of a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionRates {
    pub admin_bps: i64,
    pub branch_bps: i64,
    pub taluk_bps: i64,
    pub agent_bps: i64,
    pub user_bps: i64,
    pub total_bps: i64,
}

impl CommissionRates {
    pub fn bps_for(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Admin => self.admin_bps,
            Tier::Branch => self.branch_bps,
            Tier::Taluk => self.taluk_bps,
            Tier::Agent => self.agent_bps,
            Tier::User => self.user_bps,
        }
    }

    pub fn tier_sum(&self) -> i64 {
        Tier::ALL.iter().map(|t| self.bps_for(*t)).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.tier_sum() == self.total_bps
    }
}

/// Payload for creating (and activating) a config.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommissionConfigPayload {
    pub service_type: String,
    pub provider: Option<String>,
    pub rates: CommissionRates,
}

/// Audit row: one beneficiary's share of one distribution.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommissionTransaction {
    pub id: i64,
    pub original_transaction_id: String,
    pub service_type: String,
    pub amount: i64,
    pub recipient_user_id: i64,
    pub tier: String,
    pub rate_bps: i64,
    pub commission_amount: i64,
    pub created_at: Option<String>,
}

/// One distribution event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommissionDistribution {
    pub original_transaction_id: String,
    pub service_type: String,
    pub amount: i64,
    pub paying_user_id: i64,
    /// Set once the distribution has been computed; committed rows always have it.
    pub config_id: Option<i64>,
    pub distributed_amount: i64,
    pub orphaned_amount: i64,
    pub created_at: Option<String>,
}

/// Input of the distribution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub transaction_id: String,
    pub service_type: String,
    pub amount: i64,
    pub paying_user_id: i64,
}

/// Result of the distribution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub transaction_id: String,
    pub rows: Vec<CommissionTransaction>,
    pub distributed_amount: i64,
    pub orphaned_amount: i64,
    /// True when the transaction had been distributed by an earlier call.
    pub already_distributed: bool,
}
