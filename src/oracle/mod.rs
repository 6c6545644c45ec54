//! Gas price oracle backed by static per-chain fee tables
//!
//! Costs are deterministic functions of the tables: gas price in gwei times
//! gas units, converted to the native token and then to USD. Outputs are
//! rounded to fixed precision so repeated quotes never drift.

use crate::chain::Chain;
use crate::error::{LedgerError, LedgerResult};

use serde::Serialize;

/// Native fee token of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NativeToken {
    Eth,
    Matic,
    Sol,
}

impl NativeToken {
    /// USD exchange rate of the fee token
    pub fn usd_rate(&self) -> f64 {
        match self {
            NativeToken::Eth => 3500.0,
            NativeToken::Matic => 0.85,
            NativeToken::Sol => 133.0,
        }
    }
}

/// One row of the fee table
#[derive(Debug, Clone, Copy)]
pub struct GasTable {
    pub chain: Chain,
    pub gas_price_gwei: f64,
    pub gas_units: f64,
    pub native_token: NativeToken,
}

/// Cost quote for a single transfer on one chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainCost {
    pub chain: Chain,
    pub gas_price_gwei: f64,
    pub gas_units: f64,
    pub native_token: NativeToken,
    pub native_cost: f64,
    pub exchange_rate: f64,
    pub usd_cost: f64,
}

const GWEI_PER_NATIVE: f64 = 1e9;

const DEFAULT_TABLES: [GasTable; 5] = [
    GasTable {
        chain: Chain::Ethereum,
        gas_price_gwei: 50.0,
        gas_units: 21_000.0,
        native_token: NativeToken::Eth,
    },
    GasTable {
        chain: Chain::Polygon,
        gas_price_gwei: 30.0,
        gas_units: 21_000.0,
        native_token: NativeToken::Matic,
    },
    GasTable {
        chain: Chain::Arbitrum,
        gas_price_gwei: 0.1,
        gas_units: 21_000.0,
        native_token: NativeToken::Eth,
    },
    GasTable {
        chain: Chain::Optimism,
        gas_price_gwei: 0.1,
        gas_units: 21_000.0,
        native_token: NativeToken::Eth,
    },
    GasTable {
        chain: Chain::Solana,
        gas_price_gwei: 0.05,
        gas_units: 21_000.0,
        native_token: NativeToken::Sol,
    },
];

/// Transfer cost oracle over the supported chains
#[derive(Debug, Clone)]
pub struct GasPriceOracle {
    tables: Vec<GasTable>,
}

impl GasPriceOracle {
    /// Oracle over the production fee tables
    pub fn new() -> Self {
        Self {
            tables: DEFAULT_TABLES.to_vec(),
        }
    }

    /// Oracle over caller-supplied tables. A deployment quotes the chains it
    /// chooses to; custody is not limited to quoted chains.
    pub fn with_tables(tables: Vec<GasTable>) -> Self {
        Self { tables }
    }

    /// Cost of one transfer on `chain`
    pub fn cost_of(&self, chain: Chain) -> LedgerResult<ChainCost> {
        let table = self
            .tables
            .iter()
            .find(|t| t.chain == chain)
            .ok_or(LedgerError::UnsupportedChain { chain })?;
        Ok(quote(table))
    }

    /// Cost of one transfer on every quoted chain, in table order
    pub fn all_costs(&self) -> Vec<ChainCost> {
        self.tables.iter().map(quote).collect()
    }
}

impl Default for GasPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn quote(table: &GasTable) -> ChainCost {
    let exchange_rate = table.native_token.usd_rate();
    let native_cost = table.gas_price_gwei * table.gas_units / GWEI_PER_NATIVE;
    let usd_cost = native_cost * exchange_rate;

    ChainCost {
        chain: table.chain,
        gas_price_gwei: table.gas_price_gwei,
        gas_units: table.gas_units,
        native_token: table.native_token,
        native_cost: round_dp(native_cost, 9),
        exchange_rate,
        usd_cost: round_dp(usd_cost, 6),
    }
}

fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
