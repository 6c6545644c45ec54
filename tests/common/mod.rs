//! Shared fixtures for integration tests

use std::sync::Arc;
use swiftwallet::chain::Chain;
use swiftwallet::config::DatabaseConfig;
use swiftwallet::ledger::LedgerStore;

/// Fresh in-memory store with migrations applied. A single pooled connection
/// keeps the whole test on one :memory: database.
pub async fn test_store() -> Arc<LedgerStore> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        seed_demo_data: false,
    };
    let store = LedgerStore::new(&config).await.expect("connect in-memory store");
    store.run_migrations().await.expect("run migrations");
    Arc::new(store)
}

/// Create a user and fund the given per-chain balances
pub async fn fund_user(store: &LedgerStore, user_id: &str, balances: &[(Chain, f64)]) {
    store
        .create_user(user_id, &format!("{}@example.com", user_id))
        .await
        .expect("create user");
    for (chain, amount) in balances {
        store.adjust(user_id, *chain, *amount).await.expect("fund balance");
    }
}

/// Assert two floats agree within ledger precision
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
