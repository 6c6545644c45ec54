//! Routing - deciding where a logical send settles
//!
//! Two layers:
//! 1. The chain selector picks the cheapest single chain that can carry the
//!    full amount, or reports that bridging is required.
//! 2. The bridge router discovers and executes cross-chain routes when no
//!    single chain suffices.

pub mod bridge;
pub mod selector;

pub use bridge::{BridgeCosts, BridgeRouter, Route};
pub use selector::{ChainChoice, ChainQuote, ChainSelector, Selection};
