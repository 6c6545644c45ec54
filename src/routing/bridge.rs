//! Cross-chain bridge routing and execution
//!
//! The bridge graph is a directed cost matrix over the chains that support
//! bridging. Solana sits outside the graph: it is quoted as a settlement
//! chain but value cannot be bridged into or out of it.

use crate::chain::{keccak_hex, Chain};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerStore, TransactionRecord, TxKind, TxStatus};

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Directed bridge fee matrix. Fees are flat USD amounts burned on the
/// source chain.
#[derive(Debug, Clone)]
pub struct BridgeCosts {
    matrix: HashMap<(Chain, Chain), f64>,
}

impl BridgeCosts {
    /// The production bridge graph
    pub fn defaults() -> Self {
        Self::new([
            ((Chain::Ethereum, Chain::Polygon), 5.0),
            ((Chain::Ethereum, Chain::Arbitrum), 10.0),
            ((Chain::Ethereum, Chain::Optimism), 10.0),
            ((Chain::Polygon, Chain::Ethereum), 15.0),
            ((Chain::Polygon, Chain::Arbitrum), 8.0),
            ((Chain::Polygon, Chain::Optimism), 8.0),
            ((Chain::Arbitrum, Chain::Ethereum), 12.0),
            ((Chain::Arbitrum, Chain::Polygon), 8.0),
            ((Chain::Arbitrum, Chain::Optimism), 5.0),
            ((Chain::Optimism, Chain::Ethereum), 12.0),
            ((Chain::Optimism, Chain::Polygon), 8.0),
            ((Chain::Optimism, Chain::Arbitrum), 5.0),
        ])
    }

    pub fn new(entries: impl IntoIterator<Item = ((Chain, Chain), f64)>) -> Self {
        Self {
            matrix: entries.into_iter().collect(),
        }
    }

    /// Fee to bridge from one chain to another: 0 on the same chain,
    /// infinite when no route exists.
    pub fn cost(&self, from: Chain, to: Chain) -> f64 {
        if from == to {
            return 0.0;
        }
        self.matrix
            .get(&(from, to))
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

impl Default for BridgeCosts {
    fn default() -> Self {
        Self::defaults()
    }
}

/// A candidate way to move value onto the target chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub from_chain: Chain,
    pub to_chain: Chain,
    pub available_balance: f64,
    pub bridge_cost: f64,
    pub max_transferable: f64,
    pub total_cost: f64,
    pub can_fulfill: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<f64>,
}

/// Discovers and executes bridge routes for a user
#[derive(Clone)]
pub struct BridgeRouter {
    ledger: Arc<LedgerStore>,
    costs: BridgeCosts,
}

impl BridgeRouter {
    pub fn new(ledger: Arc<LedgerStore>, costs: BridgeCosts) -> Self {
        Self { ledger, costs }
    }

    pub fn bridge_cost(&self, from: Chain, to: Chain) -> f64 {
        self.costs.cost(from, to)
    }

    /// Enumerate routes that could move `target_amount` onto `target_chain`,
    /// cheapest fee first.
    ///
    /// Pass one keeps only routes whose post-fee capacity covers the full
    /// amount. When none qualifies, pass two returns every route with any
    /// capacity at all, annotated with its shortfall, so the caller can still
    /// present the best partial option. An empty result is a valid answer,
    /// not an error.
    pub async fn find_routes(
        &self,
        user_id: &str,
        target_amount: f64,
        target_chain: Chain,
    ) -> LedgerResult<Vec<Route>> {
        if self.ledger.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }

        let sheet = self.ledger.totals(user_id).await?;

        let candidate = |chain: Chain, balance: f64| {
            let bridge_cost = self.costs.cost(chain, target_chain);
            let max_transferable = (balance - bridge_cost).max(0.0);
            Route {
                from_chain: chain,
                to_chain: target_chain,
                available_balance: balance,
                bridge_cost,
                max_transferable,
                total_cost: bridge_cost,
                can_fulfill: max_transferable >= target_amount,
                shortfall: None,
            }
        };

        let mut routes: Vec<Route> = sheet
            .by_chain
            .iter()
            .filter(|(chain, _)| **chain != target_chain)
            .map(|(chain, balance)| candidate(*chain, *balance))
            .filter(|r| r.can_fulfill)
            .collect();

        if routes.is_empty() {
            routes = sheet
                .by_chain
                .iter()
                .filter(|(chain, _)| **chain != target_chain)
                .map(|(chain, balance)| candidate(*chain, *balance))
                .filter(|r| r.max_transferable > 0.0)
                .map(|mut r| {
                    r.shortfall = Some(target_amount - r.max_transferable);
                    r
                })
                .collect();
        }

        routes.sort_by(|a, b| a.bridge_cost.total_cmp(&b.bridge_cost));

        debug!(
            user_id,
            %target_chain,
            target_amount,
            count = routes.len(),
            "bridge routes computed"
        );
        Ok(routes)
    }

    /// Move `amount` from one of the user's chains to another. The bridge fee
    /// is deducted on the source chain on top of the amount and credited
    /// nowhere. Debit, credit and the bridge record commit as one scope.
    pub async fn execute_bridge(
        &self,
        user_id: &str,
        from_chain: Chain,
        to_chain: Chain,
        amount: f64,
    ) -> LedgerResult<TransactionRecord> {
        if self.ledger.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }

        let bridge_cost = self.costs.cost(from_chain, to_chain);
        if !bridge_cost.is_finite() {
            return Err(LedgerError::NoViableBridgeRoute {
                target_chain: to_chain,
            });
        }
        let total_required = amount + bridge_cost;

        let current = self.ledger.balance_of(user_id, from_chain).await?;
        if current < total_required {
            return Err(LedgerError::InsufficientBalance {
                chain: from_chain,
                have: current,
                need: total_required,
            });
        }

        let nonce = Uuid::new_v4();
        let preimage = format!(
            "bridge:{}:{}:{}:{}:{}",
            user_id, from_chain, to_chain, amount, nonce
        );
        let record = TransactionRecord {
            tx_hash: keccak_hex(preimage.as_bytes()),
            kind: TxKind::Bridge,
            from_user_id: user_id.to_string(),
            to_user_id: user_id.to_string(),
            chain: to_chain,
            from_chain: Some(from_chain),
            to_chain: Some(to_chain),
            amount,
            gas_cost: 0.0,
            bridge_cost,
            total_deducted: total_required,
            status: TxStatus::Confirmed,
            block_number: None,
            bridged: true,
            bridge_tx_hash: None,
            created_at: Utc::now(),
        };

        let mut scope = self.ledger.begin().await?;
        self.ledger
            .adjust_in(&mut scope, user_id, from_chain, -total_required)
            .await?;
        self.ledger
            .adjust_in(&mut scope, user_id, to_chain, amount)
            .await?;
        self.ledger.insert_transaction_in(&mut scope, &record).await?;
        scope.commit().await?;

        info!(
            user_id,
            from = %from_chain,
            to = %to_chain,
            amount,
            bridge_cost,
            tx_hash = %record.tx_hash,
            "bridge executed"
        );
        crate::metrics::record_bridge(from_chain, to_chain);

        Ok(record)
    }
}
