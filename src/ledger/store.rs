//! SQLite ledger store

use crate::chain::Chain;
use crate::config::DatabaseConfig;
use crate::error::{LedgerError, LedgerResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Transfer,
    Bridge,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Transfer => "transfer",
            TxKind::Bridge => "bridge",
        }
    }
}

impl FromStr for TxKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(TxKind::Transfer),
            "bridge" => Ok(TxKind::Bridge),
            other => Err(format!("unknown transaction kind: {}", other)),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
        }
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TxStatus::Pending),
            "confirmed" => Ok(TxStatus::Confirmed),
            "failed" => Ok(TxStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Persisted, immutable transaction record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub tx_hash: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub from_user_id: String,
    pub to_user_id: String,
    pub chain: Chain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_chain: Option<Chain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_chain: Option<Chain>,
    pub amount: f64,
    pub gas_cost: f64,
    pub bridge_cost: f64,
    pub total_deducted: f64,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub bridged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
}

/// Per-chain balances plus the cross-chain sum
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub total: f64,
    pub by_chain: HashMap<Chain, f64>,
}

/// Ledger store for SQLite persistence
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    /// Create a new ledger store
    pub async fn new(config: &DatabaseConfig) -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(LedgerError::Database)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_with(options)
            .await
            .map_err(LedgerError::Database)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> LedgerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL REFERENCES users(id),
                chain TEXT NOT NULL,
                amount REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, chain)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_balances_user
            ON balances (user_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tx_hash TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                from_user_id TEXT NOT NULL REFERENCES users(id),
                to_user_id TEXT NOT NULL REFERENCES users(id),
                chain TEXT NOT NULL,
                from_chain TEXT,
                to_chain TEXT,
                amount REAL NOT NULL,
                gas_cost REAL NOT NULL DEFAULT 0,
                bridge_cost REAL NOT NULL DEFAULT 0,
                total_deducted REAL NOT NULL,
                status TEXT NOT NULL,
                block_number INTEGER,
                bridged INTEGER NOT NULL DEFAULT 0,
                bridge_tx_hash TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_from_user
            ON transactions (from_user_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(LedgerError::Database)?;
        Ok(())
    }

    /// Open an ambient atomic scope. Writes made through the returned
    /// transaction commit together or roll back together on drop.
    pub async fn begin(&self) -> LedgerResult<Transaction<'_, sqlx::Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Create a user
    pub async fn create_user(&self, id: &str, email: &str) -> LedgerResult<()> {
        sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(email)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Look up a user
    pub async fn get_user(&self, id: &str) -> LedgerResult<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, email FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            email: r.get("email"),
        }))
    }

    /// Current balance for one (user, chain) pair, 0 when no row exists
    pub async fn balance_of(&self, user_id: &str, chain: Chain) -> LedgerResult<f64> {
        let row = sqlx::query("SELECT amount FROM balances WHERE user_id = ?1 AND chain = ?2")
            .bind(user_id)
            .bind(chain.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<f64, _>("amount")).unwrap_or(0.0))
    }

    /// Per-chain balances and the sum across chains
    pub async fn totals(&self, user_id: &str) -> LedgerResult<BalanceSheet> {
        let rows = sqlx::query("SELECT chain, amount FROM balances WHERE user_id = ?1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut by_chain = HashMap::new();
        let mut total = 0.0;
        for row in rows {
            let chain: Chain = row
                .get::<String, _>("chain")
                .parse()
                .map_err(LedgerError::Internal)?;
            let amount: f64 = row.get("amount");
            by_chain.insert(chain, amount);
            total += amount;
        }

        Ok(BalanceSheet { total, by_chain })
    }

    /// Atomically adjust a balance by `delta` (negative for debits) inside a
    /// self-managed scope. Returns the new amount.
    pub async fn adjust(&self, user_id: &str, chain: Chain, delta: f64) -> LedgerResult<f64> {
        let mut scope = self.pool.begin().await?;
        let amount = self.adjust_in(&mut scope, user_id, chain, delta).await?;
        scope.commit().await?;
        Ok(amount)
    }

    /// Adjust a balance inside an ambient scope owned by the caller. The row
    /// is created at 0 on first touch; an adjustment that would go negative
    /// fails without writing.
    pub async fn adjust_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        chain: Chain,
        delta: f64,
    ) -> LedgerResult<f64> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, chain, amount, updated_at)
            VALUES (?1, ?2, 0, ?3)
            ON CONFLICT (user_id, chain) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(chain.as_str())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query("SELECT amount FROM balances WHERE user_id = ?1 AND chain = ?2")
            .bind(user_id)
            .bind(chain.as_str())
            .fetch_one(&mut *conn)
            .await?;
        let current: f64 = row.get("amount");

        let candidate = current + delta;
        if candidate < 0.0 {
            return Err(LedgerError::InsufficientBalance {
                chain,
                have: current,
                need: -delta,
            });
        }

        sqlx::query(
            "UPDATE balances SET amount = ?1, updated_at = ?2 WHERE user_id = ?3 AND chain = ?4",
        )
        .bind(candidate)
        .bind(Utc::now())
        .bind(user_id)
        .bind(chain.as_str())
        .execute(&mut *conn)
        .await?;

        debug!(user_id, %chain, delta, new_amount = candidate, "balance adjusted");
        Ok(candidate)
    }

    /// Persist a transaction record inside an ambient scope
    pub async fn insert_transaction_in(
        &self,
        conn: &mut SqliteConnection,
        record: &TransactionRecord,
    ) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (tx_hash, kind, from_user_id, to_user_id, chain, from_chain, to_chain,
                 amount, gas_cost, bridge_cost, total_deducted, status, block_number,
                 bridged, bridge_tx_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&record.tx_hash)
        .bind(record.kind.as_str())
        .bind(&record.from_user_id)
        .bind(&record.to_user_id)
        .bind(record.chain.as_str())
        .bind(record.from_chain.map(|c| c.as_str()))
        .bind(record.to_chain.map(|c| c.as_str()))
        .bind(record.amount)
        .bind(record.gas_cost)
        .bind(record.bridge_cost)
        .bind(record.total_deducted)
        .bind(record.status.as_str())
        .bind(record.block_number.map(|b| b as i64))
        .bind(record.bridged)
        .bind(record.bridge_tx_hash.as_deref())
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetch a transaction record by hash
    pub async fn get_transaction(&self, tx_hash: &str) -> LedgerResult<Option<TransactionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT tx_hash, kind, from_user_id, to_user_id, chain, from_chain, to_chain,
                   amount, gas_cost, bridge_cost, total_deducted, status, block_number,
                   bridged, bridge_tx_hash, created_at
            FROM transactions
            WHERE tx_hash = ?1
            "#,
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    /// Seed the demo users and their starting balances
    pub async fn seed_demo_data(&self) -> LedgerResult<()> {
        if self.get_user("user1").await?.is_some() {
            debug!("demo data already present, skipping seed");
            return Ok(());
        }

        self.create_user("user1", "apetsi@gmail.com").await?;
        self.create_user("user2", "apetsi@yahoo.com").await?;

        let seed: [(&str, Chain, f64); 10] = [
            ("user1", Chain::Ethereum, 1000.5),
            ("user1", Chain::Polygon, 500.25),
            ("user1", Chain::Arbitrum, 750.0),
            ("user1", Chain::Optimism, 250.75),
            ("user1", Chain::Solana, 500.25),
            ("user2", Chain::Ethereum, 2000.0),
            ("user2", Chain::Polygon, 1000.0),
            ("user2", Chain::Arbitrum, 1500.0),
            ("user2", Chain::Optimism, 500.0),
            ("user2", Chain::Solana, 350.0),
        ];
        for (user_id, chain, amount) in seed {
            self.adjust(user_id, chain, amount).await?;
        }

        info!("Seeded demo users and balances");
        Ok(())
    }
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> LedgerResult<TransactionRecord> {
    let chain: Chain = row
        .get::<String, _>("chain")
        .parse()
        .map_err(LedgerError::Internal)?;
    let from_chain = row
        .get::<Option<String>, _>("from_chain")
        .map(|c| c.parse::<Chain>())
        .transpose()
        .map_err(LedgerError::Internal)?;
    let to_chain = row
        .get::<Option<String>, _>("to_chain")
        .map(|c| c.parse::<Chain>())
        .transpose()
        .map_err(LedgerError::Internal)?;
    let kind: TxKind = row
        .get::<String, _>("kind")
        .parse()
        .map_err(LedgerError::Internal)?;
    let status: TxStatus = row
        .get::<String, _>("status")
        .parse()
        .map_err(LedgerError::Internal)?;

    Ok(TransactionRecord {
        tx_hash: row.get("tx_hash"),
        kind,
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        chain,
        from_chain,
        to_chain,
        amount: row.get("amount"),
        gas_cost: row.get("gas_cost"),
        bridge_cost: row.get("bridge_cost"),
        total_deducted: row.get("total_deducted"),
        status,
        block_number: row.get::<Option<i64>, _>("block_number").map(|b| b as u64),
        bridged: row.get("bridged"),
        bridge_tx_hash: row.get("bridge_tx_hash"),
        created_at: row.get("created_at"),
    })
}
