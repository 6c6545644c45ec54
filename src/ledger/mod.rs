//! Ledger persistence
//!
//! Handles:
//! - Per-(user, chain) balance rows behind the atomic adjust primitive
//! - Append-only transaction records
//! - User rows and demo seeding

mod store;

pub use store::{BalanceSheet, LedgerStore, TransactionRecord, TxKind, TxStatus, UserRecord};
