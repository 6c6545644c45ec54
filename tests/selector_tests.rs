//! Chain selector integration tests

mod common;

use common::{assert_close, fund_user, test_store};
use swiftwallet::chain::Chain;
use swiftwallet::error::LedgerError;
use swiftwallet::oracle::{GasPriceOracle, GasTable, NativeToken};
use swiftwallet::routing::{ChainSelector, Selection};

fn table(chain: Chain, gas_price_gwei: f64, native_token: NativeToken) -> GasTable {
    GasTable {
        chain,
        gas_price_gwei,
        gas_units: 21_000.0,
        native_token,
    }
}

#[tokio::test]
async fn picks_cheapest_chain_with_sufficient_balance() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[(Chain::Ethereum, 1000.0), (Chain::Polygon, 500.0)],
    )
    .await;

    // Quote only ethereum and polygon, with ethereum the cheaper of the two
    let oracle = GasPriceOracle::with_tables(vec![
        table(Chain::Ethereum, 0.1, NativeToken::Eth),
        table(Chain::Polygon, 30.0, NativeToken::Eth),
    ]);
    let selector = ChainSelector::new(store, oracle);

    match selector.select_chain("alice", 300.0).await.unwrap() {
        Selection::Selected(choice) => {
            assert_eq!(choice.chain, Chain::Ethereum);
            assert_close(choice.gas_cost, 0.00735);
            assert_close(choice.balance, 1000.0);
            assert_close(choice.total_cost, 300.00735);
            assert_eq!(choice.alternatives.len(), 1);
            assert_eq!(choice.alternatives[0].chain, Chain::Polygon);
        }
        other => panic!("expected a selected chain, got {other:?}"),
    }
}

#[tokio::test]
async fn default_tables_prefer_the_cheapest_quote() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[
            (Chain::Ethereum, 1000.0),
            (Chain::Polygon, 1000.0),
            (Chain::Solana, 1000.0),
        ],
    )
    .await;

    let selector = ChainSelector::new(store, GasPriceOracle::new());

    // Solana is the cheapest production quote
    match selector.select_chain("alice", 500.0).await.unwrap() {
        Selection::Selected(choice) => assert_eq!(choice.chain, Chain::Solana),
        other => panic!("expected a selected chain, got {other:?}"),
    }
}

#[tokio::test]
async fn alternatives_are_capped_at_two() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[
            (Chain::Ethereum, 1000.0),
            (Chain::Polygon, 1000.0),
            (Chain::Arbitrum, 1000.0),
            (Chain::Optimism, 1000.0),
            (Chain::Solana, 1000.0),
        ],
    )
    .await;

    let selector = ChainSelector::new(store, GasPriceOracle::new());

    match selector.select_chain("alice", 100.0).await.unwrap() {
        Selection::Selected(choice) => {
            assert_eq!(choice.alternatives.len(), 2);
            // Next-cheapest quotes after solana
            assert_eq!(choice.alternatives[0].chain, Chain::Polygon);
        }
        other => panic!("expected a selected chain, got {other:?}"),
    }
}

#[tokio::test]
async fn reports_needs_bridge_when_only_the_sum_suffices() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[(Chain::Ethereum, 200.0), (Chain::Polygon, 150.0)],
    )
    .await;

    let selector = ChainSelector::new(store, GasPriceOracle::new());

    match selector.select_chain("alice", 300.0).await.unwrap() {
        Selection::NeedsBridge {
            total_balance,
            required_amount,
        } => {
            assert_close(total_balance, 350.0);
            assert_close(required_amount, 300.0);
        }
        other => panic!("expected needs-bridge, got {other:?}"),
    }
}

#[tokio::test]
async fn fails_when_total_balance_is_short() {
    let store = test_store().await;
    fund_user(
        &store,
        "alice",
        &[(Chain::Ethereum, 200.0), (Chain::Polygon, 150.0)],
    )
    .await;

    let selector = ChainSelector::new(store, GasPriceOracle::new());

    let err = selector.select_chain("alice", 1000.0).await.unwrap_err();
    match err {
        LedgerError::InsufficientTotalBalance { total, required } => {
            assert_close(total, 350.0);
            assert_close(required, 1000.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let store = test_store().await;
    let selector = ChainSelector::new(store, GasPriceOracle::new());

    let err = selector.select_chain("ghost", 10.0).await.unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound { .. }));
}
