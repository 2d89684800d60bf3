//! Wallet model for seller and delivery-partner earnings

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account types that own a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Seller,
    DeliveryPartner,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::DeliveryPartner => "delivery_partner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "seller" => Some(Self::Seller),
            "delivery_partner" => Some(Self::DeliveryPartner),
            _ => None,
        }
    }
}

/// Wallet aggregate row, one per (account_id, account_type).
///
/// `balance` always equals the signed sum of completed transactions for the
/// wallet; `withdrawable_balance` is maintained incrementally and excludes
/// funds still in a clearance hold. Created lazily on first credit, never
/// deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub account_id: Uuid,
    pub account_type: String,
    pub balance: Decimal,
    pub withdrawable_balance: Decimal,
    pub total_earnings: Decimal,
    pub pending_amount: Decimal,
    pub is_frozen: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Wallet {
    pub fn account_type(&self) -> Option<AccountType> {
        AccountType::from_str(&self.account_type)
    }
}
