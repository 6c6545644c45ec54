//! Optimal single-chain selection

use crate::chain::Chain;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::LedgerStore;
use crate::oracle::GasPriceOracle;

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A chain the user could settle on, with its cost breakdown
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuote {
    pub chain: Chain,
    pub gas_cost: f64,
    pub balance: f64,
    pub total_cost: f64,
}

/// The selected chain plus up to two runner-up quotes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainChoice {
    pub chain: Chain,
    pub gas_cost: f64,
    pub balance: f64,
    pub total_cost: f64,
    pub alternatives: Vec<ChainQuote>,
}

/// Outcome of chain selection. `NeedsBridge` is an expected, handled outcome,
/// not an error: the caller moves to the bridge path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum Selection {
    #[serde(rename = "selected")]
    Selected(ChainChoice),
    #[serde(rename = "needsBridge")]
    NeedsBridge {
        total_balance: f64,
        required_amount: f64,
    },
}

/// Picks the cheapest chain with sufficient balance for a transfer
#[derive(Clone)]
pub struct ChainSelector {
    ledger: Arc<LedgerStore>,
    oracle: GasPriceOracle,
}

impl ChainSelector {
    pub fn new(ledger: Arc<LedgerStore>, oracle: GasPriceOracle) -> Self {
        Self { ledger, oracle }
    }

    /// Select the optimal settlement chain for `user_id` sending `amount`.
    ///
    /// Candidates are the oracle-quoted chains holding at least `amount`;
    /// the cheapest by USD transfer cost wins. Equal-cost candidates resolve
    /// to fee-table order (stable sort). With no candidate but enough value
    /// spread across chains the outcome is [`Selection::NeedsBridge`].
    pub async fn select_chain(&self, user_id: &str, amount: f64) -> LedgerResult<Selection> {
        if self.ledger.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }

        let sheet = self.ledger.totals(user_id).await?;

        let mut viable: Vec<ChainQuote> = self
            .oracle
            .all_costs()
            .into_iter()
            .filter_map(|cost| {
                let balance = sheet.by_chain.get(&cost.chain).copied().unwrap_or(0.0);
                (balance >= amount).then(|| ChainQuote {
                    chain: cost.chain,
                    gas_cost: cost.usd_cost,
                    balance,
                    total_cost: amount + cost.usd_cost,
                })
            })
            .collect();
        viable.sort_by(|a, b| a.gas_cost.total_cmp(&b.gas_cost));

        if viable.is_empty() {
            if sheet.total >= amount {
                debug!(user_id, amount, total = sheet.total, "no single chain suffices, bridging required");
                return Ok(Selection::NeedsBridge {
                    total_balance: sheet.total,
                    required_amount: amount,
                });
            }
            return Err(LedgerError::InsufficientTotalBalance {
                total: sheet.total,
                required: amount,
            });
        }

        let alternatives: Vec<ChainQuote> = viable.iter().skip(1).take(2).cloned().collect();
        let best = viable.remove(0);

        debug!(user_id, chain = %best.chain, gas_cost = best.gas_cost, "selected settlement chain");

        Ok(Selection::Selected(ChainChoice {
            chain: best.chain,
            gas_cost: best.gas_cost,
            balance: best.balance,
            total_cost: best.total_cost,
            alternatives,
        }))
    }
}
