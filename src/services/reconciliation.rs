//! Ledger reconciliation: recomputes each wallet's balance from its completed
//! transactions and freezes the wallet on any mismatch. Never auto-corrects.

use crate::error::{AppError, AppResult};
use crate::repositories::transaction_repository::{sum_completed_in_tx, sum_pending_in_tx};
use crate::repositories::wallet_repository::lock_wallet;
use crate::repositories::WalletRepository;
use crate::services::AuditTrailService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of a single wallet check
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub wallet_id: Uuid,
    pub recorded_balance: Decimal,
    pub ledger_balance: Decimal,
    pub consistent: bool,
}

/// Totals for one reconciliation sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationSummary {
    pub checked: usize,
    pub flagged: usize,
}

pub struct ReconciliationService {
    pool: PgPool,
    wallet_repo: Arc<WalletRepository>,
    audit: Option<Arc<AuditTrailService>>,
    interval: Duration,
}

impl ReconciliationService {
    pub fn new(pool: PgPool, wallet_repo: Arc<WalletRepository>) -> Self {
        Self {
            pool,
            wallet_repo,
            audit: None,
            interval: Duration::from_secs(300),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Check one wallet against its ledger.
    ///
    /// On mismatch the wallet is frozen (halting all further writes), an
    /// operator alarm is emitted, and IntegrityViolation is returned. The
    /// discrepancy itself is never corrected here.
    pub async fn reconcile_wallet(&self, wallet_id: Uuid) -> AppResult<ReconciliationReport> {
        let mut tx = self.pool.begin().await?;

        let wallet = lock_wallet(&mut *tx, wallet_id).await.map_err(AppError::from)?;
        let ledger_balance = sum_completed_in_tx(&mut *tx, wallet_id)
            .await
            .map_err(AppError::from)?;
        let ledger_pending = sum_pending_in_tx(&mut *tx, wallet_id)
            .await
            .map_err(AppError::from)?;

        // Open withdrawal requests never reduce the stored withdrawable
        // balance (their locks are re-derived at admission), so outside a
        // clearance hold the two aggregates stay equal.
        let consistent = wallet.balance == ledger_balance
            && wallet.withdrawable_balance == wallet.balance
            && wallet.pending_amount == ledger_pending;

        if consistent {
            tx.commit().await?;
            return Ok(ReconciliationReport {
                wallet_id,
                recorded_balance: wallet.balance,
                ledger_balance,
                consistent: true,
            });
        }

        // Freeze before surfacing the alarm; the freeze must commit even
        // though the check failed.
        sqlx::query("UPDATE wallets SET is_frozen = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(wallet_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Sqlx(e))?;

        tx.commit().await?;

        error!(
            %wallet_id,
            recorded_balance = %wallet.balance,
            ledger_balance = %ledger_balance,
            withdrawable_balance = %wallet.withdrawable_balance,
            pending_amount = %wallet.pending_amount,
            ledger_pending = %ledger_pending,
            "Ledger mismatch detected, wallet frozen"
        );

        if let Some(audit) = &self.audit {
            let details = serde_json::json!({
                "recorded_balance": wallet.balance.to_string(),
                "ledger_balance": ledger_balance.to_string(),
                "withdrawable_balance": wallet.withdrawable_balance.to_string(),
                "pending_amount": wallet.pending_amount.to_string(),
                "ledger_pending": ledger_pending.to_string(),
            });
            if let Err(e) = audit.log_integrity_alarm(wallet_id, details).await {
                warn!("Failed to write audit entry: {}", e);
            }
        }

        Err(AppError::IntegrityViolation(format!(
            "Wallet {} balance {} does not match ledger sum {}",
            wallet_id, wallet.balance, ledger_balance
        )))
    }

    /// Sweep all wallets. Per-wallet failures are logged and counted, not
    /// propagated, so one bad wallet cannot stall the rest of the sweep.
    pub async fn reconcile_all(&self) -> AppResult<ReconciliationSummary> {
        let wallet_ids = self.wallet_repo.list_ids().await?;
        let mut summary = ReconciliationSummary::default();

        for wallet_id in wallet_ids {
            summary.checked += 1;
            match self.reconcile_wallet(wallet_id).await {
                Ok(_) => {}
                Err(AppError::IntegrityViolation(_)) => {
                    summary.flagged += 1;
                }
                Err(e) => {
                    error!(%wallet_id, "Reconciliation check failed: {}", e);
                }
            }
        }

        if summary.flagged > 0 {
            warn!(
                checked = summary.checked,
                flagged = summary.flagged,
                "Reconciliation sweep flagged wallets"
            );
        }

        Ok(summary)
    }

    /// Run the periodic sweep until the task is aborted
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!("Reconciliation sweep started, interval {:?}", self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.reconcile_all().await {
                error!("Reconciliation sweep error: {}", e);
            }
        }
    }
}
