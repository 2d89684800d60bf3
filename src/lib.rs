//! Settlement Backend Library
//!
//! Order settlement and wallet ledger management for the marketplace:
//! converting delivered orders into seller / delivery-partner earnings,
//! tracking withdrawal requests against a mutable balance, and keeping every
//! wallet's balance equal to the sum of its ledger entries under concurrent
//! writes. The HTTP layer and payment gateway sit outside this crate and call
//! into the services exposed here.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repositories::*;
use std::sync::Arc;

/// Application state containing all repositories
pub struct AppState {
    pub wallet_repo: Arc<WalletRepository>,
    pub transaction_repo: Arc<TransactionRepository>,
    pub withdrawal_repo: Arc<WithdrawalRepository>,
}

impl AppState {
    /// Create a new AppState with initialized repositories
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            wallet_repo: Arc::new(WalletRepository::new(pool.clone())),
            transaction_repo: Arc::new(TransactionRepository::new(pool.clone())),
            withdrawal_repo: Arc::new(WithdrawalRepository::new(pool)),
        }
    }
}
