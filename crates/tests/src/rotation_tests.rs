//! Failover and rotation scenarios driven through the public contract.

use std::sync::Arc;

use weir_core::{
    dispatch::Orchestrator,
    types::{CallOptions, ChainId},
};

use super::mock_infrastructure::{
    init_tracing, test_settings, MockConnection, MockFactory, ScriptError,
};

const CHAIN: &str = "testnet";
const URL_A: &str = "http://a.example";
const URL_B: &str = "http://b.example";

fn orchestrator(urls: &[&str]) -> (Orchestrator<Arc<MockFactory>>, Arc<MockFactory>) {
    init_tracing();
    let factory = MockFactory::new();
    let orchestrator = Orchestrator::new(test_settings(CHAIN, urls), Arc::clone(&factory));
    (orchestrator, factory)
}

async fn succeed(connection: MockConnection) -> Result<String, ScriptError> {
    Ok(format!("ok:{}", connection.url()))
}

async fn fail_on_a(connection: MockConnection) -> Result<String, ScriptError> {
    if connection.url() == URL_A {
        Err(ScriptError::new("connection refused"))
    } else {
        Ok(format!("ok:{}", connection.url()))
    }
}

async fn always_fail(connection: MockConnection) -> Result<String, ScriptError> {
    Err(ScriptError::new(format!("unreachable: {}", connection.url())))
}

#[tokio::test]
async fn test_success_on_first_attempt_makes_no_further_attempts() {
    let (orchestrator, factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    let result = orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), succeed)
        .await
        .unwrap();

    assert_eq!(result, format!("ok:{URL_A}"));
    assert_eq!(factory.built_urls(), vec![URL_A]);

    let set = orchestrator.endpoint_registry().set_for(&chain);
    assert_eq!(set.get(0).unwrap().success_count(), 1);
    assert_eq!(set.get(1).unwrap().total_requests(), 0);
}

#[tokio::test]
async fn test_failover_resolves_with_second_endpoint() {
    let (orchestrator, factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    let result = orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), fail_on_a)
        .await
        .unwrap();

    assert_eq!(result, format!("ok:{URL_B}"));
    // Exactly two attempts: the failing endpoint, then its neighbor.
    assert_eq!(factory.built_urls(), vec![URL_A, URL_B]);

    // The chain-wide reset wipes the failed endpoint's counter on success.
    let set = orchestrator.endpoint_registry().set_for(&chain);
    assert_eq!(set.get(0).unwrap().failure_count(), 0);
    assert_eq!(set.get(1).unwrap().success_count(), 1);
}

#[tokio::test]
async fn test_exhaustion_lists_every_tried_url() {
    let (orchestrator, _factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    let error = orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), always_fail)
        .await
        .unwrap_err();

    assert_eq!(error.chain(), &chain);
    assert_eq!(error.attempted_urls().len(), 2);
    assert!(error.attempted_urls().contains(&URL_A.to_string()));
    assert!(error.attempted_urls().contains(&URL_B.to_string()));

    let message = error.to_string();
    assert!(message.contains(URL_A) && message.contains(URL_B), "message: {message}");
    assert!(message.contains("unreachable"), "message: {message}");
}

#[tokio::test]
async fn test_exhaustion_leaves_failure_counts_in_place() {
    let (orchestrator, _factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    let _ = orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), always_fail)
        .await
        .unwrap_err();

    let set = orchestrator.endpoint_registry().set_for(&chain);
    assert_eq!(set.get(0).unwrap().failure_count(), 1);
    assert_eq!(set.get(1).unwrap().failure_count(), 1);
}

#[tokio::test]
async fn test_single_endpoint_chain_gets_exactly_one_attempt() {
    let (orchestrator, factory) = orchestrator(&[URL_A]);
    let chain = ChainId::new(CHAIN);

    let error = orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), always_fail)
        .await
        .unwrap_err();

    assert_eq!(error.attempted_urls(), &[URL_A.to_string()]);
    assert_eq!(factory.built_urls().len(), 1);
}

#[tokio::test]
async fn test_connection_spec_carries_call_options() {
    let (orchestrator, factory) = orchestrator(&[URL_A]);
    let chain = ChainId::new(CHAIN);

    orchestrator
        .execute_with_rotation(&chain, CallOptions::batch_and_multicall(), succeed)
        .await
        .unwrap();

    let specs = factory.built_specs();
    assert_eq!(specs.len(), 1);
    assert!(specs[0].enable_batch);
    assert!(specs[0].enable_multicall);
    assert_eq!(specs[0].chain, chain);
}

#[tokio::test]
async fn test_proactive_selection_spreads_sequential_load() {
    let (orchestrator, factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    for _ in 0..2 {
        orchestrator
            .execute_with_rotation(&chain, CallOptions::default(), succeed)
            .await
            .unwrap();
    }

    // No failures anywhere, yet the second call lands on the fresher
    // endpoint purely because of utilization and idle time.
    assert_eq!(factory.built_urls(), vec![URL_A, URL_B]);
}

#[tokio::test]
async fn test_chain_stats_reflect_call_outcomes() {
    let (orchestrator, _factory) = orchestrator(&[URL_A, URL_B]);
    let chain = ChainId::new(CHAIN);

    orchestrator
        .execute_with_rotation(&chain, CallOptions::default(), fail_on_a)
        .await
        .unwrap();

    let stats = orchestrator.chain_stats(&chain);
    assert_eq!(stats.admission.active, 0);
    assert_eq!(stats.endpoints.len(), 2);
    // Ranked best-first; both endpoints have been attempted once.
    let total: u64 = stats.endpoints.iter().map(|(snapshot, _)| snapshot.total_requests).sum();
    assert_eq!(total, 2);
}
