pub mod transaction_repository;
pub mod wallet_repository;
pub mod withdrawal_repository;

// Re-export all repositories for convenient access
pub use transaction_repository::{NewTransaction, TransactionRepository};
pub use wallet_repository::WalletRepository;
pub use withdrawal_repository::WithdrawalRepository;
