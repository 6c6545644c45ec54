//! Simulated chain settlement
//!
//! Stands in for real chain submission: accepts a transfer, returns a
//! confirmation receipt with a hash and block number. Consensus, signing and
//! fee markets live on the other side of this seam.

use super::{keccak_hex, Chain};
use crate::error::LedgerResult;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

/// Confirmation receipt from chain-level settlement
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub tx_hash: String,
    pub chain: Chain,
    pub block_number: u64,
    pub confirmed_at: DateTime<Utc>,
}

/// Settlement collaborator for the transaction engine
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    async fn submit_transfer(
        &self,
        chain: Chain,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> LedgerResult<SettlementReceipt>;
}

/// In-process settlement simulator; confirms every transfer immediately
pub struct SimulatedSubmitter;

#[async_trait]
impl ChainSubmitter for SimulatedSubmitter {
    async fn submit_transfer(
        &self,
        chain: Chain,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> LedgerResult<SettlementReceipt> {
        let nonce = Uuid::new_v4();
        let preimage = format!("{}:{}:{}:{}:{}", chain, from_user, to_user, amount, nonce);
        let tx_hash = keccak_hex(preimage.as_bytes());
        let block_number: u64 = rand::thread_rng().gen_range(1..1_000_000);

        debug!(%chain, %tx_hash, block_number, "settlement confirmed");

        Ok(SettlementReceipt {
            tx_hash,
            chain,
            block_number,
            confirmed_at: Utc::now(),
        })
    }
}
