use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Funds, Limit, TierId, Wallet, WalletId};

use super::MIGRATION_001_INITIAL;

/// A wallet as read from the store, with the row version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWallet {
    pub wallet: Wallet,
    /// Bumped on every persisted replace
    pub version: i64,
}

/// Repository for persisting wallets and reading the limit catalog.
///
/// Every call is a single point query. Serialising read-modify-write cycles
/// is the job of [`super::WalletLocks`] and of the version check in
/// [`Repository::replace_wallet`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Limit catalog
    // ========================

    /// Get the limit for an identification level.
    pub async fn get_limit(&self, id: TierId) -> Result<Option<Limit>> {
        let row = sqlx::query(
            r#"
            SELECT id, identification_level, balance_min, balance_max
            FROM limit_law
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch limit")?;

        Ok(row.as_ref().map(Self::row_to_limit))
    }

    /// List every tier, ordered by identification level.
    pub async fn list_limits(&self) -> Result<Vec<Limit>> {
        let rows = sqlx::query(
            "SELECT id, identification_level, balance_min, balance_max FROM limit_law ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list limits")?;

        Ok(rows.iter().map(Self::row_to_limit).collect())
    }

    /// Insert or overwrite a tier definition. Used to seed reference data.
    pub async fn save_limit(&self, limit: &Limit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO limit_law (id, identification_level, balance_min, balance_max)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                identification_level = excluded.identification_level,
                balance_min = excluded.balance_min,
                balance_max = excluded.balance_max
            "#,
        )
        .bind(limit.id)
        .bind(&limit.name)
        .bind(limit.balance_min)
        .bind(limit.balance_max)
        .execute(&self.pool)
        .await
        .context("Failed to save limit")?;
        Ok(())
    }

    fn row_to_limit(row: &sqlx::sqlite::SqliteRow) -> Limit {
        Limit {
            id: row.get("id"),
            name: row.get("identification_level"),
            balance_min: row.get("balance_min"),
            balance_max: row.get("balance_max"),
        }
    }

    // ========================
    // Wallet operations
    // ========================

    /// Insert a new wallet at version 0 and assign its store-generated ID.
    pub async fn insert_wallet(&self, wallet: &mut Wallet) -> Result<WalletId> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallet (balance, hold, identification_level, version, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(wallet.balance())
        .bind(wallet.hold_amount())
        .bind(wallet.identification_level)
        .bind(wallet.created_at.to_rfc3339())
        .bind(wallet.updated_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert wallet")?;

        wallet.id = row.get("id");
        tracing::debug!(wallet_id = wallet.id, "wallet inserted");
        Ok(wallet.id)
    }

    /// Get a wallet by ID.
    pub async fn get_wallet(&self, id: WalletId) -> Result<Option<StoredWallet>> {
        let row = sqlx::query(
            r#"
            SELECT id, balance, hold, identification_level, version, created_at, updated_at
            FROM wallet
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_wallet(&row)?)),
            None => Ok(None),
        }
    }

    /// Write back a mutated wallet.
    ///
    /// The update only applies if the stored version still matches the one
    /// the wallet was read with. Returns `false` when another writer got there
    /// first; on success `stored.version` is advanced to the new row version.
    pub async fn replace_wallet(&self, stored: &mut StoredWallet) -> Result<bool> {
        let wallet = &stored.wallet;
        let result = sqlx::query(
            r#"
            UPDATE wallet
            SET balance = ?, hold = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(wallet.balance())
        .bind(wallet.hold_amount())
        .bind(wallet.updated_at.to_rfc3339())
        .bind(wallet.id)
        .bind(stored.version)
        .execute(&self.pool)
        .await
        .context("Failed to replace wallet")?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                wallet_id = wallet.id,
                version = stored.version,
                "wallet replace matched no row"
            );
            return Ok(false);
        }

        stored.version += 1;
        Ok(true)
    }

    fn row_to_wallet(row: &sqlx::sqlite::SqliteRow) -> Result<StoredWallet> {
        let id: WalletId = row.get("id");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        let wallet = Wallet {
            id,
            funds: Funds::new(row.get("balance"), row.get("hold"))
                .with_context(|| format!("Invalid funds stored for wallet {}", id))?,
            identification_level: row.get("identification_level"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        };

        Ok(StoredWallet {
            wallet,
            version: row.get("version"),
        })
    }
}
