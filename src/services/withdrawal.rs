//! Withdrawal workflow service: validation, state transitions and logging on
//! top of the withdrawal repository.

use crate::error::{AppError, AppResult};
use crate::models::{AccountDetails, AccountType, Wallet, WithdrawalRequest};
use crate::repositories::{WalletRepository, WithdrawalRepository};
use crate::services::AuditTrailService;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct WithdrawalService {
    wallet_repo: Arc<WalletRepository>,
    withdrawal_repo: Arc<WithdrawalRepository>,
    audit: Option<Arc<AuditTrailService>>,
}

impl WithdrawalService {
    pub fn new(
        wallet_repo: Arc<WalletRepository>,
        withdrawal_repo: Arc<WithdrawalRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            withdrawal_repo,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Holder requests a withdrawal. Admission is serialized per wallet and
    /// bounded by the withdrawable balance minus all still-open requests.
    pub async fn create(
        &self,
        account_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        details: AccountDetails,
    ) -> AppResult<WithdrawalRequest> {
        details.validate().map_err(AppError::Validation)?;

        let wallet = self
            .wallet_repo
            .get(account_id, account_type)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No wallet for account {}", account_id))
            })?;

        let request = self.withdrawal_repo.create(wallet.id, amount, &details).await?;

        info!(
            wallet_id = %wallet.id,
            request_id = %request.id,
            %amount,
            payment_method = %request.payment_method,
            "Withdrawal requested"
        );

        self.audit_event("withdrawal_requested", &request).await;

        Ok(request)
    }

    /// Admin approves a pending request. Metadata only; no balance change.
    pub async fn approve(
        &self,
        request_id: Uuid,
        admin_notes: Option<&str>,
    ) -> AppResult<WithdrawalRequest> {
        let request = self.withdrawal_repo.approve(request_id, admin_notes).await?;

        info!(request_id = %request.id, "Withdrawal approved");
        self.audit_event("withdrawal_approved", &request).await;

        Ok(request)
    }

    /// Payout execution started by the payment gateway collaborator
    pub async fn start_processing(&self, request_id: Uuid) -> AppResult<WithdrawalRequest> {
        let request = self.withdrawal_repo.start_processing(request_id).await?;

        info!(request_id = %request.id, "Withdrawal processing");
        self.audit_event("withdrawal_processing", &request).await;

        Ok(request)
    }

    /// Payout confirmed: debits the wallet and finalizes the request as one
    /// atomic unit. A concurrent balance drop surfaces as InsufficientFunds
    /// and leaves the request in its prior state.
    pub async fn complete(
        &self,
        request_id: Uuid,
        payout_reference_id: &str,
    ) -> AppResult<WithdrawalRequest> {
        if payout_reference_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Payout reference id is required".to_string(),
            ));
        }

        let request = self
            .withdrawal_repo
            .complete(request_id, payout_reference_id)
            .await?;

        info!(
            request_id = %request.id,
            wallet_id = %request.wallet_id,
            amount = %request.amount,
            payout_reference_id,
            "Withdrawal completed"
        );

        self.audit_event("withdrawal_completed", &request).await;

        Ok(request)
    }

    /// Admin rejects a request at any non-terminal state
    pub async fn reject(
        &self,
        request_id: Uuid,
        rejection_reason: &str,
        admin_notes: Option<&str>,
    ) -> AppResult<WithdrawalRequest> {
        if rejection_reason.trim().is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let request = self
            .withdrawal_repo
            .reject(request_id, rejection_reason, admin_notes)
            .await?;

        info!(request_id = %request.id, rejection_reason, "Withdrawal rejected");
        self.audit_event("withdrawal_rejected", &request).await;

        Ok(request)
    }

    /// Holder cancels their own still-pending request
    pub async fn cancel(&self, request_id: Uuid) -> AppResult<WithdrawalRequest> {
        let request = self.withdrawal_repo.cancel(request_id).await?;

        info!(request_id = %request.id, "Withdrawal cancelled");
        self.audit_event("withdrawal_cancelled", &request).await;

        Ok(request)
    }

    /// Read view for the account holder: wallet plus the figure new requests
    /// are admitted against (withdrawable minus open request locks).
    pub async fn available_to_withdraw(
        &self,
        account_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<(Wallet, Decimal)> {
        let wallet = self
            .wallet_repo
            .get(account_id, account_type)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No wallet for account {}", account_id))
            })?;

        let locked = self.withdrawal_repo.open_total(wallet.id).await?;
        let available = (wallet.withdrawable_balance - locked).max(Decimal::ZERO);

        Ok((wallet, available))
    }

    async fn audit_event(&self, event_type: &str, request: &WithdrawalRequest) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_withdrawal(event_type, request).await {
                tracing::warn!("Failed to write audit entry: {}", e);
            }
        }
    }
}
