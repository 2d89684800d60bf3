//! Repository for wallet lookup and lazy creation

use crate::error::RepositoryError;
use crate::models::{AccountType, Wallet};
use sqlx::PgPool;
use uuid::Uuid;

pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get or create the wallet for an account. Created zero-initialized on
    /// first use; wallets are never deleted.
    pub async fn get_or_create(
        &self,
        account_id: Uuid,
        account_type: AccountType,
    ) -> Result<Wallet, RepositoryError> {
        // Try to get existing wallet
        if let Some(wallet) = self.get(account_id, account_type).await? {
            return Ok(wallet);
        }

        // Create new wallet record
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (account_id, account_type)
            VALUES ($1, $2)
            ON CONFLICT (account_id, account_type) DO UPDATE SET updated_at = NOW()
            RETURNING id, account_id, account_type, balance, withdrawable_balance,
                      total_earnings, pending_amount, is_frozen, created_at, updated_at
            "#,
        )
        .bind(account_id)
        .bind(account_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Get a wallet by owning account
    pub async fn get(
        &self,
        account_id: Uuid,
        account_type: AccountType,
    ) -> Result<Option<Wallet>, RepositoryError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, account_id, account_type, balance, withdrawable_balance,
                   total_earnings, pending_amount, is_frozen, created_at, updated_at
            FROM wallets
            WHERE account_id = $1 AND account_type = $2
            "#,
        )
        .bind(account_id)
        .bind(account_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Get a wallet by id
    pub async fn find_by_id(&self, wallet_id: Uuid) -> Result<Option<Wallet>, RepositoryError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, account_id, account_type, balance, withdrawable_balance,
                   total_earnings, pending_amount, is_frozen, created_at, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// All wallet ids, used by the reconciliation sweep
    pub async fn list_ids(&self) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM wallets ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

/// Lock a wallet row for the duration of the enclosing database transaction.
///
/// Every balance-mutating sequence goes through this lock so that no two
/// read-modify-write sequences for the same wallet interleave.
pub(crate) async fn lock_wallet(
    conn: &mut sqlx::PgConnection,
    wallet_id: Uuid,
) -> Result<Wallet, RepositoryError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT id, account_id, account_type, balance, withdrawable_balance,
               total_earnings, pending_amount, is_frozen, created_at, updated_at
        FROM wallets
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("Wallet {} not found", wallet_id)))?;

    Ok(wallet)
}
