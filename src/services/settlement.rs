//! Settlement trigger adapter: entry points the order pipeline calls when an
//! order is delivered, cancelled or refunded. All of them funnel into the
//! transaction recorder; this layer only resolves the wallet, applies the
//! clearance policy and handles logging.

use crate::error::{AppError, AppResult};
use crate::models::{AccountType, TransactionCategory, TransactionType, WalletTransaction};
use crate::repositories::{NewTransaction, TransactionRepository, WalletRepository};
use crate::services::AuditTrailService;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Decides whether a credited category is held in clearance before it becomes
/// withdrawable. The exact promotion rule (time window, manual admin action)
/// lives behind this trait rather than a hardcoded schedule.
pub trait ClearancePolicy: Send + Sync {
    fn holds(&self, category: TransactionCategory) -> bool;
}

/// Default policy: every credit clears immediately
pub struct ImmediateClearance;

impl ClearancePolicy for ImmediateClearance {
    fn holds(&self, _category: TransactionCategory) -> bool {
        false
    }
}

/// Holds the configured categories until an explicit clear_pending call
pub struct ManualClearance {
    held: Vec<TransactionCategory>,
}

impl ManualClearance {
    pub fn new(held: Vec<TransactionCategory>) -> Self {
        Self { held }
    }
}

impl ClearancePolicy for ManualClearance {
    fn holds(&self, category: TransactionCategory) -> bool {
        self.held.contains(&category)
    }
}

/// Direction of an admin balance adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentDirection {
    Credit,
    Debit,
}

/// Settlement service converting order lifecycle events into ledger entries
pub struct SettlementService {
    wallet_repo: Arc<WalletRepository>,
    transaction_repo: Arc<TransactionRepository>,
    clearance: Arc<dyn ClearancePolicy>,
    audit: Option<Arc<AuditTrailService>>,
}

impl SettlementService {
    pub fn new(
        wallet_repo: Arc<WalletRepository>,
        transaction_repo: Arc<TransactionRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            transaction_repo,
            clearance: Arc::new(ImmediateClearance),
            audit: None,
        }
    }

    pub fn with_clearance_policy(mut self, policy: Arc<dyn ClearancePolicy>) -> Self {
        self.clearance = policy;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Credit a seller's share of a delivered order
    pub async fn credit_order_earning(
        &self,
        seller_id: Uuid,
        amount: Decimal,
        order_ref: &str,
    ) -> AppResult<WalletTransaction> {
        self.credit(
            seller_id,
            AccountType::Seller,
            amount,
            TransactionCategory::OrderEarning,
            Some(order_ref.to_string()),
            Some(format!("Earning for order {}", order_ref)),
        )
        .await
    }

    /// Credit a delivery partner's fee for a delivered order
    pub async fn credit_delivery_fee(
        &self,
        partner_id: Uuid,
        amount: Decimal,
        order_ref: &str,
    ) -> AppResult<WalletTransaction> {
        self.credit(
            partner_id,
            AccountType::DeliveryPartner,
            amount,
            TransactionCategory::DeliveryFee,
            Some(order_ref.to_string()),
            Some(format!("Delivery fee for order {}", order_ref)),
        )
        .await
    }

    /// Credit a promotional or incentive bonus
    pub async fn credit_bonus(
        &self,
        account_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> AppResult<WalletTransaction> {
        let wallet = self.wallet_repo.get_or_create(account_id, account_type).await?;

        let transaction = self
            .transaction_repo
            .record(
                wallet.id,
                NewTransaction {
                    amount,
                    tx_type: TransactionType::Bonus,
                    category: TransactionCategory::Bonus,
                    reference_id,
                    description,
                },
            )
            .await?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            %amount,
            "Bonus credited"
        );

        self.audit_settlement(&transaction).await;

        Ok(transaction)
    }

    /// Debit a seller for a refunded order. Fails with InsufficientFunds if
    /// the earnings were already withdrawn; nothing is partially applied.
    pub async fn debit_refund(
        &self,
        seller_id: Uuid,
        amount: Decimal,
        order_ref: &str,
    ) -> AppResult<WalletTransaction> {
        let wallet = self
            .wallet_repo
            .get_or_create(seller_id, AccountType::Seller)
            .await?;

        let transaction = self
            .transaction_repo
            .record(
                wallet.id,
                NewTransaction {
                    amount,
                    tx_type: TransactionType::Deducted,
                    category: TransactionCategory::Refund,
                    reference_id: Some(order_ref.to_string()),
                    description: Some(format!("Refund for order {}", order_ref)),
                },
            )
            .await?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            %amount,
            order_ref,
            "Refund debited"
        );

        self.audit_settlement(&transaction).await;

        Ok(transaction)
    }

    /// Manual admin adjustment in either direction
    pub async fn apply_adjustment(
        &self,
        account_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        direction: AdjustmentDirection,
        note: &str,
    ) -> AppResult<WalletTransaction> {
        let wallet = self.wallet_repo.get_or_create(account_id, account_type).await?;

        let tx_type = match direction {
            AdjustmentDirection::Credit => TransactionType::Received,
            AdjustmentDirection::Debit => TransactionType::Deducted,
        };

        let transaction = self
            .transaction_repo
            .record(
                wallet.id,
                NewTransaction {
                    amount,
                    tx_type,
                    category: TransactionCategory::Adjustment,
                    reference_id: None,
                    description: Some(note.to_string()),
                },
            )
            .await?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            %amount,
            ?direction,
            "Adjustment applied"
        );

        self.audit_settlement(&transaction).await;

        Ok(transaction)
    }

    /// Reverse a previously settled transaction (e.g. order cancelled after
    /// settlement). Creates the compensating entry; never edits the original.
    pub async fn reverse_settlement(&self, transaction_id: Uuid) -> AppResult<WalletTransaction> {
        let reversal = self.transaction_repo.reverse(transaction_id).await?;

        info!(
            wallet_id = %reversal.wallet_id,
            original_id = %transaction_id,
            reversal_id = %reversal.id,
            "Settlement reversed"
        );

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_reversal(transaction_id, &reversal).await {
                tracing::warn!("Failed to write audit entry: {}", e);
            }
        }

        Ok(reversal)
    }

    /// Promote a held credit to the withdrawable balance
    pub async fn clear_pending(&self, transaction_id: Uuid) -> AppResult<WalletTransaction> {
        let cleared = self.transaction_repo.clear_pending(transaction_id).await?;

        info!(
            wallet_id = %cleared.wallet_id,
            transaction_id = %cleared.id,
            amount = %cleared.amount,
            "Pending credit cleared"
        );

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_pending_cleared(&cleared).await {
                tracing::warn!("Failed to write audit entry: {}", e);
            }
        }

        Ok(cleared)
    }

    async fn credit(
        &self,
        account_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        category: TransactionCategory,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> AppResult<WalletTransaction> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Settlement amount must be positive, got {}",
                amount
            )));
        }

        let wallet = self.wallet_repo.get_or_create(account_id, account_type).await?;

        // A held category records as a pending credit; it only reaches the
        // balance through clear_pending.
        let tx_type = if self.clearance.holds(category) {
            TransactionType::Pending
        } else {
            TransactionType::Received
        };

        let transaction = self
            .transaction_repo
            .record(
                wallet.id,
                NewTransaction {
                    amount,
                    tx_type,
                    category,
                    reference_id,
                    description,
                },
            )
            .await?;

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            %amount,
            category = category.as_str(),
            transaction_type = tx_type.as_str(),
            "Settlement credited"
        );

        self.audit_settlement(&transaction).await;

        Ok(transaction)
    }

    async fn audit_settlement(&self, transaction: &WalletTransaction) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_settlement(transaction).await {
                tracing::warn!("Failed to write audit entry: {}", e);
            }
        }
    }
}
