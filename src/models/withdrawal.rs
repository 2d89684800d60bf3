//! Withdrawal request model and state machine

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payout rails supported for withdrawals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::Upi => "upi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bank_transfer" => Some(Self::BankTransfer),
            "upi" => Some(Self::Upi),
            _ => None,
        }
    }
}

/// Payout destination, tagged by payment method and validated per variant.
/// Stored as JSONB on the request row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payment_method", rename_all = "snake_case")]
pub enum AccountDetails {
    BankTransfer {
        account_holder: String,
        account_number: String,
        ifsc_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bank_name: Option<String>,
    },
    Upi {
        upi_id: String,
    },
}

impl AccountDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::BankTransfer { .. } => PaymentMethod::BankTransfer,
            Self::Upi { .. } => PaymentMethod::Upi,
        }
    }

    /// Per-variant schema validation. Returns a human-readable reason on
    /// failure; the caller maps it into a validation error.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::BankTransfer {
                account_holder,
                account_number,
                ifsc_code,
                ..
            } => {
                if account_holder.trim().is_empty() {
                    return Err("account holder name is required".to_string());
                }
                if account_number.trim().is_empty()
                    || !account_number.chars().all(|c| c.is_ascii_digit())
                {
                    return Err("account number must be numeric".to_string());
                }
                if account_number.len() < 6 || account_number.len() > 18 {
                    return Err("account number must be 6-18 digits".to_string());
                }
                if ifsc_code.len() != 11 || !ifsc_code.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err("IFSC code must be 11 alphanumeric characters".to_string());
                }
                Ok(())
            }
            Self::Upi { upi_id } => {
                let (handle, bank) = match upi_id.split_once('@') {
                    Some(parts) => parts,
                    None => return Err("UPI id must be of the form handle@bank".to_string()),
                };
                if handle.is_empty() || bank.is_empty() {
                    return Err("UPI id must be of the form handle@bank".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Withdrawal request lifecycle states.
///
/// pending -> {approved, rejected, cancelled}
/// approved -> {processing, completed, rejected}
/// processing -> {completed, rejected}
/// completed, rejected, cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
    Cancelled,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Whether a request in this state still locks its amount against the
    /// wallet's effective withdrawable balance.
    pub fn locks_funds(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Processing)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Processing)
                | (Approved, Completed)
                | (Approved, Rejected)
                | (Processing, Completed)
                | (Processing, Rejected)
        )
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending review",
            Self::Approved => "Approved",
            Self::Processing => "Payout in progress",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Withdrawal request row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub account_details: serde_json::Value,
    pub status: String,
    pub requested_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub payout_reference_id: Option<String>,
}

impl WithdrawalRequest {
    pub fn request_status(&self) -> Option<WithdrawalStatus> {
        WithdrawalStatus::from_str(&self.status)
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_str(&self.payment_method)
    }

    pub fn details(&self) -> Result<AccountDetails, serde_json::Error> {
        serde_json::from_value(self.account_details.clone())
    }
}
