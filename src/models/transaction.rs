//! Ledger transaction model: immutable, append-only entries

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sign/semantic class of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Cleared credit: increases balance and withdrawable balance
    Received,
    /// Credit held in clearance: increases pending amount only
    Pending,
    /// Debit: decreases balance and withdrawable balance
    Deducted,
    /// Cleared credit outside regular earnings flow
    Bonus,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Pending => "pending",
            Self::Deducted => "deducted",
            Self::Bonus => "bonus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "received" => Some(Self::Received),
            "pending" => Some(Self::Pending),
            "deducted" => Some(Self::Deducted),
            "bonus" => Some(Self::Bonus),
            _ => None,
        }
    }

    /// Whether this type increases the wallet balance once completed
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Received | Self::Bonus | Self::Pending)
    }

    /// The type a compensating reversal entry carries
    pub fn inverse(&self) -> Self {
        match self {
            Self::Received | Self::Bonus | Self::Pending => Self::Deducted,
            Self::Deducted => Self::Received,
        }
    }
}

/// Lifecycle status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Reversed => "reversed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }

    /// Human-readable label for display layers
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Reversed => "Reversed",
        }
    }
}

/// Business category of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    OrderEarning,
    DeliveryFee,
    Withdrawal,
    Bonus,
    Refund,
    Adjustment,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderEarning => "order_earning",
            Self::DeliveryFee => "delivery_fee",
            Self::Withdrawal => "withdrawal",
            Self::Bonus => "bonus",
            Self::Refund => "refund",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "order_earning" => Some(Self::OrderEarning),
            "delivery_fee" => Some(Self::DeliveryFee),
            "withdrawal" => Some(Self::Withdrawal),
            "bonus" => Some(Self::Bonus),
            "refund" => Some(Self::Refund),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            Self::OrderEarning => "Order earning",
            Self::DeliveryFee => "Delivery fee",
            Self::Withdrawal => "Withdrawal",
            Self::Bonus => "Bonus",
            Self::Refund => "Refund",
            Self::Adjustment => "Adjustment",
        }
    }
}

/// Ledger transaction row.
///
/// Once completed, a row is never mutated except to status `reversed`, which
/// is always paired with a compensating entry pointing back via `reversal_of`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: String,
    pub status: String,
    pub category: String,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub reversal_of: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl WalletTransaction {
    pub fn tx_type(&self) -> Option<TransactionType> {
        TransactionType::from_str(&self.transaction_type)
    }

    pub fn tx_status(&self) -> Option<TransactionStatus> {
        TransactionStatus::from_str(&self.status)
    }

    pub fn tx_category(&self) -> Option<TransactionCategory> {
        TransactionCategory::from_str(&self.category)
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Contribution of this entry to the wallet balance, signed by type.
    /// Only completed entries count toward the balance invariant.
    pub fn signed_amount(&self) -> Decimal {
        match self.tx_type() {
            Some(TransactionType::Deducted) => -self.amount,
            _ => self.amount,
        }
    }
}
