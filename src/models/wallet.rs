use serde::{Deserialize, Serialize};

/// Direction of a wallet movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletEntryType {
    Credit,
    Debit,
}

impl WalletEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEntryType::Credit => "credit",
            WalletEntryType::Debit => "debit",
        }
    }
}

/// Append-only wallet history row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub entry_type: String, // "credit" | "debit"
    pub amount: i64,
    pub balance_after: i64,
    pub reference: Option<String>,
    pub description: String,
    pub created_at: Option<String>,
}

/// Payload for a manual wallet movement (service payments, top-ups).
#[derive(Debug, Clone, Deserialize)]
pub struct WalletMovementPayload {
    pub user_id: i64,
    pub amount: i64,
    pub reference: Option<String>,
    pub description: String,
}

/// Paginated wallet statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedWalletTransactions {
    pub data: Vec<WalletTransaction>,
    pub balance: i64,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
