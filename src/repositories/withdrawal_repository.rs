//! Repository for withdrawal requests and their state machine.
//!
//! Admission re-derives the effective withdrawable balance under the wallet
//! row lock, so two simultaneous creates against the same wallet serialize
//! and can never jointly admit more than the balance available at admission
//! time. The debiting transaction is created only on completion, inside the
//! same database transaction as the status update.

use crate::error::RepositoryError;
use crate::models::{
    AccountDetails, TransactionCategory, TransactionType, WithdrawalRequest, WithdrawalStatus,
};
use crate::repositories::transaction_repository::{record_in_tx, NewTransaction};
use crate::repositories::wallet_repository::lock_wallet;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct WithdrawalRepository {
    pool: PgPool,
}

impl WithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Admit a new withdrawal request.
    ///
    /// The wallet is not debited here; the request amount is only locked
    /// against future admissions. Fails with InsufficientFunds when the
    /// amount exceeds the withdrawable balance minus the sum of all open
    /// (pending/approved/processing) requests, leaving no row behind.
    pub async fn create(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
        details: &AccountDetails,
    ) -> Result<WithdrawalRequest, RepositoryError> {
        if amount <= Decimal::ZERO {
            return Err(RepositoryError::InvalidInput(format!(
                "Withdrawal amount must be positive, got {}",
                amount
            )));
        }

        let details_json = serde_json::to_value(details)
            .map_err(|e| RepositoryError::InvalidInput(format!("Invalid account details: {}", e)))?;

        let mut tx = self.pool.begin().await?;

        // Lock first, then derive the effective figure: the sum must not move
        // until this request is inserted.
        let wallet = lock_wallet(&mut *tx, wallet_id).await?;
        crate::repositories::transaction_repository::ensure_not_frozen(&wallet)?;

        let locked = open_request_total(&mut *tx, wallet_id).await?;
        let available = (wallet.withdrawable_balance - locked).max(Decimal::ZERO);

        if amount > available {
            return Err(RepositoryError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        let request = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            INSERT INTO withdrawal_requests (wallet_id, amount, payment_method, account_details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(wallet_id)
        .bind(amount)
        .bind(details.method().as_str())
        .bind(details_json)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(request)
    }

    /// Admin acknowledgment: pending -> approved. No balance change.
    pub async fn approve(
        &self,
        request_id: Uuid,
        admin_notes: Option<&str>,
    ) -> Result<WithdrawalRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        check_transition(&request, WithdrawalStatus::Approved)?;

        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'approved', admin_notes = COALESCE($2, admin_notes)
            WHERE id = $1
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(request_id)
        .bind(admin_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Payout execution picked up: approved -> processing.
    pub async fn start_processing(
        &self,
        request_id: Uuid,
    ) -> Result<WithdrawalRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        let from = request_status(&request)?;
        if from != WithdrawalStatus::Approved {
            return Err(RepositoryError::InvalidTransition {
                from,
                to: WithdrawalStatus::Processing,
            });
        }

        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'processing'
            WHERE id = $1
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Payout confirmed: approved|processing -> completed.
    ///
    /// The debiting ledger entry (type deducted, category withdrawal,
    /// reference = request id) is recorded in the same database transaction.
    /// If the wallet balance has since dropped below the request amount, the
    /// recorder fails with InsufficientFunds and the whole unit rolls back,
    /// leaving the request in its prior state.
    pub async fn complete(
        &self,
        request_id: Uuid,
        payout_reference_id: &str,
    ) -> Result<WithdrawalRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        check_transition(&request, WithdrawalStatus::Completed)?;

        record_in_tx(
            &mut *tx,
            request.wallet_id,
            &NewTransaction {
                amount: request.amount,
                tx_type: TransactionType::Deducted,
                category: TransactionCategory::Withdrawal,
                reference_id: Some(request.id.to_string()),
                description: Some(format!(
                    "Withdrawal payout {} for request {}",
                    payout_reference_id, request.id
                )),
            },
        )
        .await?;

        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'completed', payout_reference_id = $2, processed_at = NOW()
            WHERE id = $1
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(request_id)
        .bind(payout_reference_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Admin rejection: pending|approved|processing -> rejected. No debiting
    /// transaction exists at these states, so no compensating credit is
    /// needed; the amount simply stops counting against admissions.
    pub async fn reject(
        &self,
        request_id: Uuid,
        rejection_reason: &str,
        admin_notes: Option<&str>,
    ) -> Result<WithdrawalRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        check_transition(&request, WithdrawalStatus::Rejected)?;

        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'rejected', rejection_reason = $2,
                admin_notes = COALESCE($3, admin_notes), processed_at = NOW()
            WHERE id = $1
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(request_id)
        .bind(rejection_reason)
        .bind(admin_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Holder-initiated cancellation: pending -> cancelled only.
    pub async fn cancel(&self, request_id: Uuid) -> Result<WithdrawalRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        check_transition(&request, WithdrawalStatus::Cancelled)?;

        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'cancelled', processed_at = NOW()
            WHERE id = $1
            RETURNING id, wallet_id, amount, payment_method, account_details, status,
                      requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            "#,
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Get a request by id
    pub async fn find_by_id(
        &self,
        request_id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, RepositoryError> {
        let request = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            SELECT id, wallet_id, amount, payment_method, account_details, status,
                   requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            FROM withdrawal_requests
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Requests for a wallet, newest first
    pub async fn list_for_wallet(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WithdrawalRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            SELECT id, wallet_id, amount, payment_method, account_details, status,
                   requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            FROM withdrawal_requests
            WHERE wallet_id = $1
            ORDER BY requested_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Requests in a given state across wallets, oldest first (admin queue)
    pub async fn list_by_status(
        &self,
        status: WithdrawalStatus,
        limit: i64,
    ) -> Result<Vec<WithdrawalRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            SELECT id, wallet_id, amount, payment_method, account_details, status,
                   requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
            FROM withdrawal_requests
            WHERE status = $1
            ORDER BY requested_at ASC
            LIMIT $2
            "#,
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Sum of amounts locked by open requests for a wallet
    pub async fn open_total(&self, wallet_id: Uuid) -> Result<Decimal, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        open_request_total(&mut *conn, wallet_id).await
    }
}

pub(crate) async fn open_request_total(
    conn: &mut PgConnection,
    wallet_id: Uuid,
) -> Result<Decimal, RepositoryError> {
    let total = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM withdrawal_requests
        WHERE wallet_id = $1 AND status IN ('pending', 'approved', 'processing')
        "#,
    )
    .bind(wallet_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

async fn lock_request(
    conn: &mut PgConnection,
    request_id: Uuid,
) -> Result<WithdrawalRequest, RepositoryError> {
    let request = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        SELECT id, wallet_id, amount, payment_method, account_details, status,
               requested_at, processed_at, admin_notes, rejection_reason, payout_reference_id
        FROM withdrawal_requests
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        RepositoryError::NotFound(format!("Withdrawal request {} not found", request_id))
    })?;

    Ok(request)
}

fn request_status(request: &WithdrawalRequest) -> Result<WithdrawalStatus, RepositoryError> {
    request.request_status().ok_or_else(|| {
        RepositoryError::IntegrityViolation(format!(
            "Withdrawal request {} has unknown status {}",
            request.id, request.status
        ))
    })
}

fn check_transition(
    request: &WithdrawalRequest,
    to: WithdrawalStatus,
) -> Result<(), RepositoryError> {
    let from = request_status(request)?;
    if !from.can_transition_to(to) {
        return Err(RepositoryError::InvalidTransition { from, to });
    }
    Ok(())
}
