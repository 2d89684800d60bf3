//! Transaction recorder: the single point of wallet balance mutation.
//!
//! Every entry insert and the matching wallet aggregate update run inside one
//! database transaction holding the wallet row lock, so concurrent settlement
//! credits and withdrawal debits against the same wallet serialize.

use crate::error::RepositoryError;
use crate::models::{
    TransactionCategory, TransactionStatus, TransactionType, Wallet, WalletTransaction,
};
use crate::repositories::wallet_repository::lock_wallet;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Parameters for a new ledger entry
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub category: TransactionCategory,
    pub reference_id: Option<String>,
    pub description: Option<String>,
}

pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a ledger entry and update the owning wallet's aggregates as one
    /// atomic unit.
    ///
    /// Idempotent per (wallet_id, category, reference_id): a retried call with
    /// the same reference returns the prior entry without re-applying effects.
    pub async fn record(
        &self,
        wallet_id: Uuid,
        new: NewTransaction,
    ) -> Result<WalletTransaction, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let recorded = record_in_tx(&mut *tx, wallet_id, &new).await?;
        tx.commit().await?;

        Ok(recorded)
    }

    /// Reverse a completed transaction: append a compensating entry with the
    /// inverse type and mark both rows reversed. Amounts are never edited in
    /// place. Reversing a credit is bounds-checked like any other debit.
    pub async fn reverse(
        &self,
        transaction_id: Uuid,
    ) -> Result<WalletTransaction, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let original = lock_transaction(&mut *tx, transaction_id).await?;

        if original.status != TransactionStatus::Completed.as_str() {
            return Err(RepositoryError::InvalidInput(format!(
                "Only completed transactions can be reversed, transaction {} is {}",
                transaction_id, original.status
            )));
        }

        let original_type = original.tx_type().ok_or_else(|| {
            RepositoryError::IntegrityViolation(format!(
                "Transaction {} has unknown type {}",
                original.id, original.transaction_type
            ))
        })?;

        let wallet = lock_wallet(&mut *tx, original.wallet_id).await?;
        ensure_not_frozen(&wallet)?;

        // Undo the original's contribution. total_earnings is monotonic and
        // stays untouched when a credit is reversed.
        let mut balance = wallet.balance;
        let mut withdrawable = wallet.withdrawable_balance;
        match original_type {
            TransactionType::Received | TransactionType::Bonus | TransactionType::Pending => {
                balance -= original.amount;
                withdrawable -= original.amount;
                if balance < Decimal::ZERO || withdrawable < Decimal::ZERO {
                    return Err(RepositoryError::InsufficientFunds {
                        available: wallet.withdrawable_balance,
                        requested: original.amount,
                    });
                }
            }
            TransactionType::Deducted => {
                balance += original.amount;
                withdrawable += original.amount;
            }
        }

        update_wallet_aggregates(
            &mut *tx,
            wallet.id,
            balance,
            withdrawable,
            wallet.total_earnings,
            wallet.pending_amount,
        )
        .await?;

        let description = format!("Reversal of transaction {}", original.id);
        let reversal = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions
                (wallet_id, amount, transaction_type, status, category, reference_id, description, reversal_of)
            VALUES ($1, $2, $3, 'reversed', $4, $5, $6, $7)
            RETURNING id, wallet_id, amount, transaction_type, status, category,
                      reference_id, description, reversal_of, created_at
            "#,
        )
        .bind(original.wallet_id)
        .bind(original.amount)
        .bind(original_type.inverse().as_str())
        .bind(&original.category)
        .bind(&original.reference_id)
        .bind(description)
        .bind(original.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE wallet_transactions SET status = 'reversed' WHERE id = $1")
            .bind(original.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(reversal)
    }

    /// Promote a pending entry to completed, moving its amount out of the
    /// clearance hold into the spendable balance. The clearance policy decides
    /// when this is called; the ledger only provides the hook.
    pub async fn clear_pending(
        &self,
        transaction_id: Uuid,
    ) -> Result<WalletTransaction, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let entry = lock_transaction(&mut *tx, transaction_id).await?;

        if entry.status != TransactionStatus::Pending.as_str()
            || entry.transaction_type != TransactionType::Pending.as_str()
        {
            return Err(RepositoryError::InvalidInput(format!(
                "Transaction {} is not a pending credit",
                transaction_id
            )));
        }

        let wallet = lock_wallet(&mut *tx, entry.wallet_id).await?;
        ensure_not_frozen(&wallet)?;

        let pending = wallet.pending_amount - entry.amount;
        if pending < Decimal::ZERO {
            return Err(RepositoryError::IntegrityViolation(format!(
                "Wallet {} pending amount {} is less than entry amount {}",
                wallet.id, wallet.pending_amount, entry.amount
            )));
        }

        update_wallet_aggregates(
            &mut *tx,
            wallet.id,
            wallet.balance + entry.amount,
            wallet.withdrawable_balance + entry.amount,
            wallet.total_earnings + entry.amount,
            pending,
        )
        .await?;

        let cleared = sqlx::query_as::<_, WalletTransaction>(
            r#"
            UPDATE wallet_transactions
            SET status = 'completed'
            WHERE id = $1
            RETURNING id, wallet_id, amount, transaction_type, status, category,
                      reference_id, description, reversal_of, created_at
            "#,
        )
        .bind(entry.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cleared)
    }

    /// Get a transaction by id
    pub async fn find_by_id(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<WalletTransaction>, RepositoryError> {
        let entry = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, amount, transaction_type, status, category,
                   reference_id, description, reversal_of, created_at
            FROM wallet_transactions
            WHERE id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Transaction history for a wallet, newest first
    pub async fn history(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        let entries = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, amount, transaction_type, status, category,
                   reference_id, description, reversal_of, created_at
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Signed sum of completed entries for a wallet. Reconciliation compares
    /// this against the wallet's cached balance.
    pub async fn sum_completed(&self, wallet_id: Uuid) -> Result<Decimal, RepositoryError> {
        sum_completed_in_tx(&self.pool, wallet_id).await
    }
}

pub(crate) async fn sum_completed_in_tx<'e, E>(
    executor: E,
    wallet_id: Uuid,
) -> Result<Decimal, RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let sum = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN transaction_type = 'deducted' THEN -amount ELSE amount END
        ), 0)
        FROM wallet_transactions
        WHERE wallet_id = $1 AND status = 'completed'
        "#,
    )
    .bind(wallet_id)
    .fetch_one(executor)
    .await?;

    Ok(sum)
}

/// Sum of credits still held in clearance for a wallet. Reconciliation
/// compares this against the wallet's cached pending amount.
pub(crate) async fn sum_pending_in_tx<'e, E>(
    executor: E,
    wallet_id: Uuid,
) -> Result<Decimal, RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let sum = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM wallet_transactions
        WHERE wallet_id = $1 AND status = 'pending'
        "#,
    )
    .bind(wallet_id)
    .fetch_one(executor)
    .await?;

    Ok(sum)
}

/// Core of the recorder, shared with withdrawal completion so the debit and
/// the request status update commit or roll back together.
pub(crate) async fn record_in_tx(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    new: &NewTransaction,
) -> Result<WalletTransaction, RepositoryError> {
    if new.amount <= Decimal::ZERO {
        return Err(RepositoryError::InvalidInput(format!(
            "Transaction amount must be positive, got {}",
            new.amount
        )));
    }

    let wallet = lock_wallet(&mut *conn, wallet_id).await?;
    ensure_not_frozen(&wallet)?;

    // Idempotency: a live entry with the same settlement reference wins. The
    // lookup runs under the wallet lock, so a retry racing the original call
    // waits out the winner and then sees its committed entry.
    if let Some(reference_id) = &new.reference_id {
        let existing = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, amount, transaction_type, status, category,
                   reference_id, description, reversal_of, created_at
            FROM wallet_transactions
            WHERE wallet_id = $1 AND category = $2 AND reference_id = $3
              AND status IN ('completed', 'pending')
            "#,
        )
        .bind(wallet_id)
        .bind(new.category.as_str())
        .bind(reference_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(existing) = existing {
            return Ok(existing);
        }
    }

    let mut balance = wallet.balance;
    let mut withdrawable = wallet.withdrawable_balance;
    let mut total_earnings = wallet.total_earnings;
    let mut pending = wallet.pending_amount;

    let status = match new.tx_type {
        TransactionType::Received | TransactionType::Bonus => {
            balance += new.amount;
            withdrawable += new.amount;
            total_earnings += new.amount;
            TransactionStatus::Completed
        }
        TransactionType::Deducted => {
            balance -= new.amount;
            withdrawable -= new.amount;
            if balance < Decimal::ZERO || withdrawable < Decimal::ZERO {
                return Err(RepositoryError::InsufficientFunds {
                    available: wallet.withdrawable_balance,
                    requested: new.amount,
                });
            }
            TransactionStatus::Completed
        }
        TransactionType::Pending => {
            // Held in clearance: balance untouched until clear_pending()
            pending += new.amount;
            TransactionStatus::Pending
        }
    };

    update_wallet_aggregates(
        &mut *conn,
        wallet.id,
        balance,
        withdrawable,
        total_earnings,
        pending,
    )
    .await?;

    let entry = sqlx::query_as::<_, WalletTransaction>(
        r#"
        INSERT INTO wallet_transactions
            (wallet_id, amount, transaction_type, status, category, reference_id, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, wallet_id, amount, transaction_type, status, category,
                  reference_id, description, reversal_of, created_at
        "#,
    )
    .bind(wallet.id)
    .bind(new.amount)
    .bind(new.tx_type.as_str())
    .bind(status.as_str())
    .bind(new.category.as_str())
    .bind(&new.reference_id)
    .bind(&new.description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(entry)
}

async fn lock_transaction(
    conn: &mut PgConnection,
    transaction_id: Uuid,
) -> Result<WalletTransaction, RepositoryError> {
    let entry = sqlx::query_as::<_, WalletTransaction>(
        r#"
        SELECT id, wallet_id, amount, transaction_type, status, category,
               reference_id, description, reversal_of, created_at
        FROM wallet_transactions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("Transaction {} not found", transaction_id)))?;

    Ok(entry)
}

async fn update_wallet_aggregates(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    balance: Decimal,
    withdrawable: Decimal,
    total_earnings: Decimal,
    pending: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET balance = $2, withdrawable_balance = $3, total_earnings = $4,
            pending_amount = $5, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(wallet_id)
    .bind(balance)
    .bind(withdrawable)
    .bind(total_earnings)
    .bind(pending)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) fn ensure_not_frozen(wallet: &Wallet) -> Result<(), RepositoryError> {
    if wallet.is_frozen {
        return Err(RepositoryError::IntegrityViolation(format!(
            "Wallet {} is frozen pending reconciliation review",
            wallet.id
        )));
    }
    Ok(())
}
