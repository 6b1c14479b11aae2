//! Rate-limit delays observed end to end through the orchestrator.

use std::time::{Duration, Instant};

use weir_core::{
    dispatch::Orchestrator,
    types::{CallOptions, ChainId},
};

use super::mock_infrastructure::{test_settings, MockConnection, MockFactory, ScriptError};

const CHAIN: &str = "testnet";
const URL: &str = "http://a.example";

async fn noop(_: MockConnection) -> Result<(), ScriptError> {
    Ok(())
}

#[tokio::test]
async fn test_chain_bucket_delays_second_call() {
    // One-token burst refilling at 2/s: the second call must wait ~500ms.
    let mut settings = test_settings(CHAIN, &[URL]);
    {
        let chain = settings.chains.get_mut(CHAIN).unwrap();
        chain.rate_capacity = Some(1);
        chain.rate_limit = Some(2.0);
        // Keep the endpoint bucket out of the picture.
        chain.endpoints[0].rate_capacity = Some(10_000);
        chain.endpoints[0].rate_limit = Some(10_000.0);
    }

    let orchestrator = Orchestrator::new(settings, MockFactory::new());
    let chain = ChainId::new(CHAIN);

    let start = Instant::now();
    orchestrator.execute_with_rotation(&chain, CallOptions::default(), noop).await.unwrap();
    let first_elapsed = start.elapsed();
    orchestrator.execute_with_rotation(&chain, CallOptions::default(), noop).await.unwrap();
    let total_elapsed = start.elapsed();

    assert!(first_elapsed < Duration::from_millis(200), "first call waited {first_elapsed:?}");
    assert!(
        total_elapsed >= Duration::from_millis(300),
        "second call was not delayed: {total_elapsed:?}"
    );
    assert!(total_elapsed <= Duration::from_secs(3), "delay too long: {total_elapsed:?}");
}

#[tokio::test]
async fn test_endpoint_bucket_delays_attempts_on_single_endpoint() {
    // Chain bucket generous, endpoint bucket a one-token burst at 4/s.
    let mut settings = test_settings(CHAIN, &[URL]);
    {
        let chain = settings.chains.get_mut(CHAIN).unwrap();
        chain.endpoints[0].rate_capacity = Some(1);
        chain.endpoints[0].rate_limit = Some(4.0);
    }

    let orchestrator = Orchestrator::new(settings, MockFactory::new());
    let chain = ChainId::new(CHAIN);

    let start = Instant::now();
    for _ in 0..2 {
        orchestrator.execute_with_rotation(&chain, CallOptions::default(), noop).await.unwrap();
    }
    let elapsed = start.elapsed();

    // Second attempt pays the ~250ms endpoint deficit.
    assert!(elapsed >= Duration::from_millis(150), "no endpoint delay observed: {elapsed:?}");
}

#[tokio::test]
async fn test_generous_buckets_add_no_measurable_delay() {
    let orchestrator = Orchestrator::new(test_settings(CHAIN, &[URL]), MockFactory::new());
    let chain = ChainId::new(CHAIN);

    let start = Instant::now();
    for _ in 0..20 {
        orchestrator.execute_with_rotation(&chain, CallOptions::default(), noop).await.unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(1));
}
