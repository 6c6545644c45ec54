//! Transaction engine - send orchestration
//!
//! A logical send runs Validating -> Selecting -> DirectSettle or Bridging
//! -> Recording, with failure possible from any phase. The settlement call
//! always happens before the balance scope opens, so a slow or failed
//! submitter never holds the ledger.

use crate::chain::ChainSubmitter;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerStore, TransactionRecord, TxKind, TxStatus};
use crate::oracle::GasPriceOracle;
use crate::routing::{BridgeRouter, ChainChoice, ChainSelector, Selection};

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
enum SendPhase {
    Validating,
    Selecting,
    DirectSettle,
    Bridging,
    Recording,
}

/// Result of a successful send
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub transaction: TransactionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_transaction: Option<TransactionRecord>,
    pub bridged: bool,
    pub total_cost: f64,
}

/// Orchestrates transfers end to end: validation, chain selection, optional
/// bridging, settlement, and the atomic balance/record commit.
pub struct TransactionEngine {
    ledger: Arc<LedgerStore>,
    selector: ChainSelector,
    router: BridgeRouter,
    oracle: GasPriceOracle,
    submitter: Arc<dyn ChainSubmitter>,
}

impl TransactionEngine {
    pub fn new(
        ledger: Arc<LedgerStore>,
        selector: ChainSelector,
        router: BridgeRouter,
        oracle: GasPriceOracle,
        submitter: Arc<dyn ChainSubmitter>,
    ) -> Self {
        Self {
            ledger,
            selector,
            router,
            oracle,
            submitter,
        }
    }

    /// Execute a logical send from one user to another
    pub async fn send(
        &self,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> LedgerResult<SendReceipt> {
        let started = Instant::now();
        let result = self.send_inner(from_user, to_user, amount).await;

        match &result {
            Ok(receipt) => {
                let path = if receipt.bridged { "bridged" } else { "direct" };
                crate::metrics::record_send_latency(path, started.elapsed().as_secs_f64());
            }
            Err(e) => {
                warn!(from_user, to_user, amount, error = %e, "send failed");
                crate::metrics::record_send_failure(e.reason());
            }
        }

        result
    }

    async fn send_inner(
        &self,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> LedgerResult<SendReceipt> {
        debug!(phase = ?SendPhase::Validating, from_user, to_user, amount);

        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if self.ledger.get_user(from_user).await?.is_none() {
            return Err(LedgerError::SenderNotFound {
                user_id: from_user.to_string(),
            });
        }
        if self.ledger.get_user(to_user).await?.is_none() {
            return Err(LedgerError::RecipientNotFound {
                user_id: to_user.to_string(),
            });
        }

        debug!(phase = ?SendPhase::Selecting, from_user, amount);
        match self.selector.select_chain(from_user, amount).await? {
            Selection::Selected(choice) => {
                self.settle_direct(from_user, to_user, amount, choice).await
            }
            Selection::NeedsBridge { total_balance, .. } => {
                debug!(from_user, total_balance, "falling back to bridge path");
                self.settle_via_bridge(from_user, to_user, amount).await
            }
        }
    }

    /// Direct path: settle on the selected chain, then commit both balance
    /// legs and the transfer record in one scope.
    async fn settle_direct(
        &self,
        from_user: &str,
        to_user: &str,
        amount: f64,
        choice: ChainChoice,
    ) -> LedgerResult<SendReceipt> {
        let chain = choice.chain;
        let gas_cost = choice.gas_cost;

        debug!(phase = ?SendPhase::DirectSettle, %chain, gas_cost);
        let receipt = self
            .submitter
            .submit_transfer(chain, from_user, to_user, amount)
            .await?;

        debug!(phase = ?SendPhase::Recording, tx_hash = %receipt.tx_hash);
        let record = TransactionRecord {
            tx_hash: receipt.tx_hash,
            kind: TxKind::Transfer,
            from_user_id: from_user.to_string(),
            to_user_id: to_user.to_string(),
            chain,
            from_chain: None,
            to_chain: None,
            amount,
            gas_cost,
            bridge_cost: 0.0,
            total_deducted: amount + gas_cost,
            status: TxStatus::Confirmed,
            block_number: Some(receipt.block_number),
            bridged: false,
            bridge_tx_hash: None,
            created_at: receipt.confirmed_at,
        };

        let mut scope = self.ledger.begin().await?;
        self.ledger
            .adjust_in(&mut scope, from_user, chain, -(amount + gas_cost))
            .await?;
        self.ledger
            .adjust_in(&mut scope, to_user, chain, amount)
            .await?;
        self.ledger.insert_transaction_in(&mut scope, &record).await?;
        scope.commit().await?;

        info!(
            from_user,
            to_user,
            %chain,
            amount,
            tx_hash = %record.tx_hash,
            "transfer settled"
        );
        crate::metrics::record_transfer(chain);

        Ok(SendReceipt {
            transaction: record,
            bridge_transaction: None,
            bridged: false,
            total_cost: gas_cost,
        })
    }

    /// Bridge path: consolidate funds onto the globally cheapest settlement
    /// chain, then run the transfer there. The bridge and the final transfer
    /// commit as two separate scopes; a failure after the bridge committed
    /// leaves the user bridged but unsent, and the error surfaces.
    async fn settle_via_bridge(
        &self,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> LedgerResult<SendReceipt> {
        debug!(phase = ?SendPhase::Bridging, from_user, amount);

        let mut costs = self.oracle.all_costs();
        costs.sort_by(|a, b| a.usd_cost.total_cmp(&b.usd_cost));
        let target = costs
            .first()
            .ok_or_else(|| LedgerError::Internal("gas fee table is empty".to_string()))?;
        let target_chain = target.chain;
        let target_gas_cost = target.usd_cost;

        let amount_to_bridge = amount + target_gas_cost;
        let routes = self
            .router
            .find_routes(from_user, amount_to_bridge, target_chain)
            .await?;
        let best = routes
            .first()
            .ok_or(LedgerError::NoViableBridgeRoute { target_chain })?;
        if best.max_transferable < amount_to_bridge {
            return Err(LedgerError::InsufficientBalanceToBridge {
                required: amount_to_bridge,
                transferable: best.max_transferable,
            });
        }

        let bridge_tx = self
            .router
            .execute_bridge(from_user, best.from_chain, target_chain, amount_to_bridge)
            .await?;

        // From here on the bridge is durable. Settlement or the final scope
        // failing leaves a reported partial state, not a rollback.
        let receipt = self
            .submitter
            .submit_transfer(target_chain, from_user, to_user, amount)
            .await?;

        debug!(phase = ?SendPhase::Recording, tx_hash = %receipt.tx_hash);
        let record = TransactionRecord {
            tx_hash: receipt.tx_hash,
            kind: TxKind::Transfer,
            from_user_id: from_user.to_string(),
            to_user_id: to_user.to_string(),
            chain: target_chain,
            from_chain: None,
            to_chain: None,
            amount,
            gas_cost: target_gas_cost,
            bridge_cost: 0.0,
            total_deducted: amount + target_gas_cost,
            status: TxStatus::Confirmed,
            block_number: Some(receipt.block_number),
            bridged: true,
            bridge_tx_hash: Some(bridge_tx.tx_hash.clone()),
            created_at: receipt.confirmed_at,
        };

        let mut scope = self.ledger.begin().await?;
        self.ledger
            .adjust_in(&mut scope, from_user, target_chain, -(amount + target_gas_cost))
            .await?;
        self.ledger
            .adjust_in(&mut scope, to_user, target_chain, amount)
            .await?;
        self.ledger.insert_transaction_in(&mut scope, &record).await?;
        scope.commit().await?;

        info!(
            from_user,
            to_user,
            %target_chain,
            amount,
            bridge_tx = %bridge_tx.tx_hash,
            tx_hash = %record.tx_hash,
            "bridged transfer settled"
        );
        crate::metrics::record_transfer(target_chain);

        Ok(SendReceipt {
            transaction: record,
            bridge_transaction: Some(bridge_tx.clone()),
            bridged: true,
            total_cost: target_gas_cost + bridge_tx.bridge_cost,
        })
    }

    /// Pure lookup of a persisted transaction
    pub async fn get_status(&self, tx_hash: &str) -> LedgerResult<TransactionRecord> {
        self.ledger
            .get_transaction(tx_hash)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound {
                tx_hash: tx_hash.to_string(),
            })
    }
}
