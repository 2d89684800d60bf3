use crate::error::{AppError, AppResult};
use crate::models::{WalletTransaction, WithdrawalRequest};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "settlement_recorded", "withdrawal_completed", etc.
    pub wallet_id: Option<Uuid>,
    pub details: serde_json::Value,
}

/// Audit trail service logging every balance-affecting action to an
/// append-only JSONL file, one file per day.
pub struct AuditTrailService {
    #[allow(dead_code)]
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> AppResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        // Create log file with date
        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("ledger_audit_{}.log", date));

        // Open file in append mode
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry).map_err(AppError::Serialization)?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log a settlement credit or debit
    pub async fn log_settlement(&self, transaction: &WalletTransaction) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "settlement_recorded".to_string(),
            wallet_id: Some(transaction.wallet_id),
            details: serde_json::json!({
                "transaction_id": transaction.id.to_string(),
                "amount": transaction.amount.to_string(),
                "transaction_type": transaction.transaction_type,
                "category": transaction.category,
                "reference_id": transaction.reference_id,
            }),
        };

        self.log(entry).await
    }

    /// Log a reversal pair
    pub async fn log_reversal(
        &self,
        original_id: Uuid,
        reversal: &WalletTransaction,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "transaction_reversed".to_string(),
            wallet_id: Some(reversal.wallet_id),
            details: serde_json::json!({
                "original_id": original_id.to_string(),
                "reversal_id": reversal.id.to_string(),
                "amount": reversal.amount.to_string(),
                "category": reversal.category,
            }),
        };

        self.log(entry).await
    }

    /// Log a pending credit clearing into the withdrawable balance
    pub async fn log_pending_cleared(&self, transaction: &WalletTransaction) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "pending_cleared".to_string(),
            wallet_id: Some(transaction.wallet_id),
            details: serde_json::json!({
                "transaction_id": transaction.id.to_string(),
                "amount": transaction.amount.to_string(),
                "category": transaction.category,
            }),
        };

        self.log(entry).await
    }

    /// Log a withdrawal request lifecycle event
    pub async fn log_withdrawal(
        &self,
        event_type: &str,
        request: &WithdrawalRequest,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: event_type.to_string(),
            wallet_id: Some(request.wallet_id),
            details: serde_json::json!({
                "request_id": request.id.to_string(),
                "amount": request.amount.to_string(),
                "payment_method": request.payment_method,
                "status": request.status,
                "payout_reference_id": request.payout_reference_id,
            }),
        };

        self.log(entry).await
    }

    /// Log a reconciliation mismatch. Operator-facing only.
    pub async fn log_integrity_alarm(
        &self,
        wallet_id: Uuid,
        details: serde_json::Value,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "integrity_alarm".to_string(),
            wallet_id: Some(wallet_id),
            details,
        };

        self.log(entry).await
    }
}
