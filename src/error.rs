//! Error types for the SwiftWallet ledger

use crate::chain::Chain;
use thiserror::Error;

/// Main error type for the ledger service
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Sender {user_id} not found")]
    SenderNotFound { user_id: String },

    #[error("Recipient {user_id} not found")]
    RecipientNotFound { user_id: String },

    #[error("User {user_id} not found")]
    UserNotFound { user_id: String },

    #[error("Transaction {tx_hash} not found")]
    TransactionNotFound { tx_hash: String },

    #[error("Amount must be a positive number, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Chain {chain} is not quoted by the gas fee table")]
    UnsupportedChain { chain: Chain },

    #[error("Insufficient balance on {chain}: have {have}, need {need}")]
    InsufficientBalance { chain: Chain, have: f64, need: f64 },

    #[error("Insufficient total balance: have {total} across all chains, need {required}")]
    InsufficientTotalBalance { total: f64, required: f64 },

    #[error("No viable bridge route into {target_chain}")]
    NoViableBridgeRoute { target_chain: Chain },

    #[error("Insufficient balance to bridge: need {required}, can transfer {transferable}")]
    InsufficientBalanceToBridge { required: f64, transferable: f64 },

    #[error("Settlement failed on {chain}: {message}")]
    Submission { chain: Chain, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Stable label for failure metrics
    pub fn reason(&self) -> &'static str {
        match self {
            LedgerError::Config(_) => "config",
            LedgerError::Database(_) => "database",
            LedgerError::SenderNotFound { .. } => "sender_not_found",
            LedgerError::RecipientNotFound { .. } => "recipient_not_found",
            LedgerError::UserNotFound { .. } => "user_not_found",
            LedgerError::TransactionNotFound { .. } => "transaction_not_found",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::UnsupportedChain { .. } => "unsupported_chain",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InsufficientTotalBalance { .. } => "insufficient_total_balance",
            LedgerError::NoViableBridgeRoute { .. } => "no_viable_bridge_route",
            LedgerError::InsufficientBalanceToBridge { .. } => "insufficient_balance_to_bridge",
            LedgerError::Submission { .. } => "submission",
            LedgerError::Internal(_) => "internal",
        }
    }

    /// Check if the error is the caller's fault (maps to a 4xx response)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::SenderNotFound { .. }
                | LedgerError::RecipientNotFound { .. }
                | LedgerError::UserNotFound { .. }
                | LedgerError::TransactionNotFound { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientBalance { .. }
                | LedgerError::InsufficientTotalBalance { .. }
                | LedgerError::NoViableBridgeRoute { .. }
                | LedgerError::InsufficientBalanceToBridge { .. }
        )
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
