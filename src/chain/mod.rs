//! Chain module - chain identity and simulated settlement
//!
//! A chain is an independent balance namespace with its own cost
//! characteristics. Settlement against a chain goes through the
//! [`ChainSubmitter`] seam so the simulator can be swapped out.

pub mod submitter;

pub use submitter::{ChainSubmitter, SettlementReceipt, SimulatedSubmitter};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Supported chains. Stored and serialized under their lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Solana,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Solana => "solana",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereum" => Ok(Chain::Ethereum),
            "polygon" => Ok(Chain::Polygon),
            "arbitrum" => Ok(Chain::Arbitrum),
            "optimism" => Ok(Chain::Optimism),
            "solana" => Ok(Chain::Solana),
            other => Err(format!("unknown chain: {}", other)),
        }
    }
}

/// Keccak-256 digest as a 0x-prefixed hex string
pub fn keccak_hex(input: &[u8]) -> String {
    let digest = Keccak256::digest(input);
    format!("0x{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_names_round_trip() {
        for chain in Chain::ALL {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
        }
        assert!("dogecoin".parse::<Chain>().is_err());
    }

    #[test]
    fn keccak_hex_is_stable() {
        let h = keccak_hex(b"swiftwallet");
        assert!(h.starts_with("0x"));
        assert_eq!(h.len(), 66);
        assert_eq!(h, keccak_hex(b"swiftwallet"));
    }
}
