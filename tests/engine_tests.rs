//! Transaction engine integration tests

mod common;

use async_trait::async_trait;
use common::{assert_close, fund_user, test_store};
use std::sync::Arc;
use swiftwallet::chain::{Chain, ChainSubmitter, SettlementReceipt, SimulatedSubmitter};
use swiftwallet::engine::TransactionEngine;
use swiftwallet::error::{LedgerError, LedgerResult};
use swiftwallet::ledger::{LedgerStore, TxKind};
use swiftwallet::oracle::{GasPriceOracle, GasTable, NativeToken};
use swiftwallet::routing::{BridgeCosts, BridgeRouter, ChainSelector};

/// Submitter that refuses every settlement
struct FailingSubmitter;

#[async_trait]
impl ChainSubmitter for FailingSubmitter {
    async fn submit_transfer(
        &self,
        chain: Chain,
        _from_user: &str,
        _to_user: &str,
        _amount: f64,
    ) -> LedgerResult<SettlementReceipt> {
        Err(LedgerError::Submission {
            chain,
            message: "rpc unavailable".to_string(),
        })
    }
}

fn build_engine(
    store: Arc<LedgerStore>,
    oracle: GasPriceOracle,
    submitter: Arc<dyn ChainSubmitter>,
) -> TransactionEngine {
    let selector = ChainSelector::new(store.clone(), oracle.clone());
    let router = BridgeRouter::new(store.clone(), BridgeCosts::defaults());
    TransactionEngine::new(store, selector, router, oracle, submitter)
}

fn table(chain: Chain, gas_price_gwei: f64, native_token: NativeToken) -> GasTable {
    GasTable {
        chain,
        gas_price_gwei,
        gas_units: 21_000.0,
        native_token,
    }
}

#[tokio::test]
async fn direct_transfer_conserves_value() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 1000.0)]).await;
    fund_user(&store, "bob", &[]).await;

    // Ethereum is the only quoted chain
    let oracle = GasPriceOracle::with_tables(vec![table(Chain::Ethereum, 0.1, NativeToken::Eth)]);
    let gas = oracle.cost_of(Chain::Ethereum).unwrap().usd_cost;
    let engine = build_engine(store.clone(), oracle, Arc::new(SimulatedSubmitter));

    let receipt = engine.send("alice", "bob", 300.0).await.unwrap();

    assert!(!receipt.bridged);
    assert!(receipt.bridge_transaction.is_none());
    assert_close(receipt.total_cost, gas);

    let tx = &receipt.transaction;
    assert_eq!(tx.kind, TxKind::Transfer);
    assert_eq!(tx.chain, Chain::Ethereum);
    assert_close(tx.amount, 300.0);
    assert_close(tx.gas_cost, gas);
    assert_close(tx.total_deducted, 300.0 + gas);
    assert!(tx.block_number.is_some());

    // Sender loses amount + gas, recipient gains the amount, the ledger as a
    // whole shrinks by exactly the gas
    assert_close(
        store.balance_of("alice", Chain::Ethereum).await.unwrap(),
        1000.0 - 300.0 - gas,
    );
    assert_close(store.balance_of("bob", Chain::Ethereum).await.unwrap(), 300.0);

    let loaded = engine.get_status(&tx.tx_hash).await.unwrap();
    assert_eq!(loaded.tx_hash, tx.tx_hash);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected_without_side_effects() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 100.0)]).await;
    fund_user(&store, "bob", &[]).await;
    let engine = build_engine(store.clone(), GasPriceOracle::new(), Arc::new(SimulatedSubmitter));

    for amount in [0.0, -5.0] {
        let err = engine.send("alice", "bob", amount).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 100.0);
    assert_close(store.balance_of("bob", Chain::Ethereum).await.unwrap(), 0.0);
}

#[tokio::test]
async fn unknown_parties_are_rejected() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 100.0)]).await;
    let engine = build_engine(store.clone(), GasPriceOracle::new(), Arc::new(SimulatedSubmitter));

    let err = engine.send("ghost", "alice", 10.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::SenderNotFound { .. }));

    let err = engine.send("alice", "ghost", 10.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::RecipientNotFound { .. }));

    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 100.0);
}

#[tokio::test]
async fn total_insufficiency_surfaces_unchanged() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 100.0)]).await;
    fund_user(&store, "bob", &[]).await;
    let engine = build_engine(store.clone(), GasPriceOracle::new(), Arc::new(SimulatedSubmitter));

    let err = engine.send("alice", "bob", 500.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientTotalBalance { .. }));
    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 100.0);
}

#[tokio::test]
async fn failed_settlement_leaves_the_ledger_untouched() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 1000.0)]).await;
    fund_user(&store, "bob", &[]).await;

    let oracle = GasPriceOracle::with_tables(vec![table(Chain::Ethereum, 0.1, NativeToken::Eth)]);
    let engine = build_engine(store.clone(), oracle, Arc::new(FailingSubmitter));

    let err = engine.send("alice", "bob", 300.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::Submission { .. }));

    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 1000.0);
    assert_close(store.balance_of("bob", Chain::Ethereum).await.unwrap(), 0.0);
}

#[tokio::test]
async fn needs_bridge_into_an_unbridgeable_quote_reports_no_route() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[(Chain::Ethereum, 200.0), (Chain::Polygon, 150.0)],
    )
    .await;
    fund_user(&store, "bob", &[]).await;

    // Production tables: solana is the cheapest quote but sits outside the
    // bridge graph, so consolidation onto it can never route
    let engine = build_engine(store.clone(), GasPriceOracle::new(), Arc::new(SimulatedSubmitter));

    let err = engine.send("alice", "bob", 300.0).await.unwrap_err();
    match err {
        LedgerError::NoViableBridgeRoute { target_chain } => {
            assert_eq!(target_chain, Chain::Solana)
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 200.0);
    assert_close(store.balance_of("alice", Chain::Polygon).await.unwrap(), 150.0);
}

#[tokio::test]
async fn bridged_send_settles_on_the_cheapest_quoted_chain() {
    let store = test_store().await;
    // Custody on ethereum, but only polygon is quoted for settlement
    fund_user(&store, "alice", &[(Chain::Ethereum, 1000.0)]).await;
    fund_user(&store, "bob", &[]).await;

    let oracle = GasPriceOracle::with_tables(vec![table(Chain::Polygon, 30.0, NativeToken::Matic)]);
    let gas = oracle.cost_of(Chain::Polygon).unwrap().usd_cost;
    let engine = build_engine(store.clone(), oracle, Arc::new(SimulatedSubmitter));

    let receipt = engine.send("alice", "bob", 300.0).await.unwrap();

    assert!(receipt.bridged);
    let bridge_tx = receipt.bridge_transaction.as_ref().expect("bridge record");
    assert_eq!(bridge_tx.kind, TxKind::Bridge);
    assert_eq!(bridge_tx.from_chain, Some(Chain::Ethereum));
    assert_eq!(bridge_tx.to_chain, Some(Chain::Polygon));
    assert_close(bridge_tx.amount, 300.0 + gas);
    assert_close(bridge_tx.bridge_cost, 5.0);
    assert_close(receipt.total_cost, gas + 5.0);

    let tx = &receipt.transaction;
    assert_eq!(tx.kind, TxKind::Transfer);
    assert_eq!(tx.chain, Chain::Polygon);
    assert!(tx.bridged);
    assert_eq!(tx.bridge_tx_hash.as_deref(), Some(bridge_tx.tx_hash.as_str()));

    // Sender paid amount + gas + bridge fee out of ethereum custody; the
    // bridged funds passed through polygon and landed with the recipient
    assert_close(
        store.balance_of("alice", Chain::Ethereum).await.unwrap(),
        1000.0 - 300.0 - gas - 5.0,
    );
    assert_close(store.balance_of("alice", Chain::Polygon).await.unwrap(), 0.0);
    assert_close(store.balance_of("bob", Chain::Polygon).await.unwrap(), 300.0);

    // Both records are durable and linked
    assert!(engine.get_status(&tx.tx_hash).await.is_ok());
    assert!(engine.get_status(&bridge_tx.tx_hash).await.is_ok());
}

#[tokio::test]
async fn bridged_send_fails_when_the_best_route_is_short() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 304.0)]).await;
    fund_user(&store, "bob", &[]).await;

    let oracle = GasPriceOracle::with_tables(vec![table(Chain::Polygon, 30.0, NativeToken::Matic)]);
    let engine = build_engine(store.clone(), oracle, Arc::new(SimulatedSubmitter));

    // Route capacity is 304 - 5 = 299, short of amount + gas
    let err = engine.send("alice", "bob", 300.0).await.unwrap_err();
    match err {
        LedgerError::InsufficientBalanceToBridge {
            required,
            transferable,
        } => {
            assert!(required > 300.0);
            assert_close(transferable, 299.0);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_close(store.balance_of("alice", Chain::Ethereum).await.unwrap(), 304.0);
}

#[tokio::test]
async fn settlement_failure_after_the_bridge_leaves_a_durable_partial_state() {
    let store = test_store().await;
    fund_user(&store, "alice", &[(Chain::Ethereum, 1000.0)]).await;
    fund_user(&store, "bob", &[]).await;

    let oracle = GasPriceOracle::with_tables(vec![table(Chain::Polygon, 30.0, NativeToken::Matic)]);
    let gas = oracle.cost_of(Chain::Polygon).unwrap().usd_cost;
    let engine = build_engine(store.clone(), oracle, Arc::new(FailingSubmitter));

    let err = engine.send("alice", "bob", 300.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::Submission { .. }));

    // The bridge scope committed before settlement failed: the sender is
    // correctly bridged but unsent, and nothing reached the recipient
    assert_close(
        store.balance_of("alice", Chain::Ethereum).await.unwrap(),
        1000.0 - 300.0 - gas - 5.0,
    );
    assert_close(
        store.balance_of("alice", Chain::Polygon).await.unwrap(),
        300.0 + gas,
    );
    assert_close(store.balance_of("bob", Chain::Polygon).await.unwrap(), 0.0);
}

#[tokio::test]
async fn unknown_transaction_lookup_fails() {
    let store = test_store().await;
    let engine = build_engine(store, GasPriceOracle::new(), Arc::new(SimulatedSubmitter));

    let err = engine.get_status("0xmissing").await.unwrap_err();
    assert!(matches!(err, LedgerError::TransactionNotFound { .. }));
}
