//! Domain models for the settlement backend.
//!
//! This module contains all database-backed models representing
//! wallets, ledger transactions and withdrawal requests.

pub mod transaction;
pub mod wallet;
pub mod withdrawal;

// Re-export all models for convenient access
pub use transaction::{TransactionCategory, TransactionStatus, TransactionType, WalletTransaction};
pub use wallet::{AccountType, Wallet};
pub use withdrawal::{AccountDetails, PaymentMethod, WithdrawalRequest, WithdrawalStatus};
