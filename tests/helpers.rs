use rust_decimal::Decimal;
use settlement_backend::models::*;
use settlement_backend::repositories::*;
use settlement_backend::services::*;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Test database wrapper holding the repositories under test
pub struct TestDatabase {
    pub pool: PgPool,
    pub wallet_repo: Arc<WalletRepository>,
    pub transaction_repo: Arc<TransactionRepository>,
    pub withdrawal_repo: Arc<WithdrawalRepository>,
}

impl TestDatabase {
    /// Create TestDatabase from an existing pool (used with sqlx::test, which
    /// provisions a fresh database and applies ./migrations)
    pub async fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: pool.clone(),
            wallet_repo: Arc::new(WalletRepository::new(pool.clone())),
            transaction_repo: Arc::new(TransactionRepository::new(pool.clone())),
            withdrawal_repo: Arc::new(WithdrawalRepository::new(pool)),
        }
    }

    pub fn settlement_service(&self) -> SettlementService {
        SettlementService::new(self.wallet_repo.clone(), self.transaction_repo.clone())
    }

    pub fn withdrawal_service(&self) -> WithdrawalService {
        WithdrawalService::new(self.wallet_repo.clone(), self.withdrawal_repo.clone())
    }

    pub fn reconciliation_service(&self) -> ReconciliationService {
        ReconciliationService::new(self.pool.clone(), self.wallet_repo.clone())
    }

    /// Create a seller wallet for a fresh account and credit it through the
    /// recorder so the ledger and aggregates agree
    pub async fn seeded_wallet(&self, amount: Decimal) -> Wallet {
        let account_id = Uuid::new_v4();
        let wallet = self
            .wallet_repo
            .get_or_create(account_id, AccountType::Seller)
            .await
            .expect("Failed to create wallet");

        if amount > Decimal::ZERO {
            self.transaction_repo
                .record(
                    wallet.id,
                    NewTransaction {
                        amount,
                        tx_type: TransactionType::Received,
                        category: TransactionCategory::OrderEarning,
                        reference_id: Some(format!("seed-{}", wallet.id)),
                        description: None,
                    },
                )
                .await
                .expect("Failed to seed wallet");
        }

        self.refresh(&wallet).await
    }

    /// Reload a wallet row
    pub async fn refresh(&self, wallet: &Wallet) -> Wallet {
        self.wallet_repo
            .find_by_id(wallet.id)
            .await
            .expect("Failed to reload wallet")
            .expect("Wallet disappeared")
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("Invalid decimal literal")
}

pub fn upi_details() -> AccountDetails {
    AccountDetails::Upi {
        upi_id: "seller@okbank".to_string(),
    }
}

pub fn bank_details() -> AccountDetails {
    AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: Some("HDFC Bank".to_string()),
    }
}
