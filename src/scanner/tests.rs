//! Pipeline tests through the public scanner entry point

use super::*;
use crate::sources::ReplaySource;
use crate::test_utils::{CodeScript, MockNetwork, MockSource, NetworkBehavior, ScriptedDecoder};
use crate::types::{ConnectionState, FrameFormat};
use anyhow::Result;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

const ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50));

#[tokio::test(start_paused = true)]
async fn credential_code_joins_network_and_stops_capture() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let source = Arc::new(MockSource::qvga());
    let decoder = ScriptedDecoder::qvga()
        .then(Vec::new())
        .then(vec![CodeScript::text("https://example.com"), CodeScript::text("S:Home;P:hunter2;")]);
    let (network, events) = MockNetwork::new(NetworkBehavior::ConnectOnAssociate(ADDRESS));
    let network = Arc::new(network);

    let mut handle =
        Scanner::spawn(ScannerConfig::default(), source.clone(), decoder, network.clone(), events)?;
    let outcome = handle.wait().await?;

    assert_eq!(outcome.credential, Some(Credential::new("Home", "hunter2")));
    assert_eq!(network.configured(), vec![Credential::new("Home", "hunter2")]);
    assert_eq!(outcome.link.state, ConnectionState::Connected);
    assert_eq!(outcome.link.address, Some(ADDRESS));
    assert_eq!(outcome.link.network.as_deref(), Some("Home"));
    assert_eq!(outcome.decode.attempts, 1);
    assert_eq!(outcome.decode.payloads, 2);

    assert!(handle.is_finished());
    assert!(!handle.stop(), "finish already happened");
    let stats = source.stats();
    assert!(stats.shut_down);
    assert!(stats.is_balanced(), "unbalanced frame ownership: {stats:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reassociates_after_connecting_while_handle_is_alive() -> Result<()> {
    let source = Arc::new(MockSource::qvga());
    let decoder = ScriptedDecoder::qvga().otherwise(vec![CodeScript::text("P:pw;S:Office;")]);
    let (network, events) = MockNetwork::new(NetworkBehavior::ConnectOnAssociate(ADDRESS));
    let network = Arc::new(network);

    let mut handle = Scanner::spawn(ScannerConfig::default(), source, decoder, network.clone(), events)?;
    handle.wait().await?;

    network.emit(NetworkEvent::Disconnected { reason: Some(8) });
    let mut status = handle.status();
    let link = status.wait_for(|s| s.reassociations == 1).await?.clone();

    assert_eq!(link.state, ConnectionState::Connected);
    assert_eq!(network.associate_calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_without_connecting() -> Result<()> {
    let source = Arc::new(MockSource::qvga());
    let decoder = ScriptedDecoder::qvga().otherwise(vec![CodeScript::text("just text")]);
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);

    let mut handle = Scanner::spawn(ScannerConfig::default(), source.clone(), decoder, Arc::new(network), events)?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.stop());

    let outcome = handle.wait().await?;
    assert!(outcome.credential.is_none());
    assert_eq!(outcome.link.state, ConnectionState::Idle);
    assert!(outcome.capture.acquired > 0);
    assert!(outcome.capture.delivered + outcome.capture.dropped <= outcome.capture.acquired);
    assert!(outcome.decode.frames > 0);

    let stats = source.stats();
    assert!(stats.shut_down);
    assert!(stats.is_balanced(), "unbalanced frame ownership: {stats:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unanswered_attempts_fail_and_retry() -> Result<()> {
    let source = Arc::new(MockSource::qvga());
    let decoder = ScriptedDecoder::qvga().otherwise(vec![CodeScript::text("S:Nowhere;P:x;")]);
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let network = Arc::new(network);
    let config = ScannerConfig::from_yaml_str("association: { poll_interval_ms: 10, max_polls: 5 }")?;

    let mut handle = Scanner::spawn(config, source.clone(), decoder, network.clone(), events)?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop();
    let outcome = handle.wait().await?;

    assert!(outcome.decode.attempts >= 2, "only {} attempts", outcome.decode.attempts);
    assert!(outcome.credential.is_none());
    assert_eq!(network.configured().len() as u64, outcome.decode.attempts);
    assert!(source.stats().is_balanced());
    Ok(())
}

#[tokio::test]
async fn spawn_rejects_mismatched_decoder() {
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let result = Scanner::spawn(
        ScannerConfig::default(),
        Arc::new(MockSource::qvga()),
        ScriptedDecoder::new(640, 480),
        Arc::new(network),
        events,
    );

    assert!(matches!(result, Err(ScanError::FrameFormat { .. })));
}

#[tokio::test]
async fn spawn_rejects_source_that_disagrees_with_config() {
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let source = MockSource::new(FrameFormat::new(160, 120, crate::types::PixelFormat::Grayscale));
    let result =
        Scanner::spawn(ScannerConfig::default(), Arc::new(source), ScriptedDecoder::qvga(), Arc::new(network), events);

    assert!(matches!(result, Err(ScanError::FrameFormat { .. })));
}

#[tokio::test]
async fn spawn_rejects_invalid_config() {
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let config = ScannerConfig { capture_period_ms: 0, ..Default::default() };
    let result = Scanner::spawn(config, Arc::new(MockSource::qvga()), ScriptedDecoder::qvga(), Arc::new(network), events);

    assert!(matches!(result, Err(ScanError::Config { .. })));
}

#[tokio::test(start_paused = true)]
async fn wait_twice_is_an_error() -> Result<()> {
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let mut handle =
        Scanner::spawn(ScannerConfig::default(), Arc::new(MockSource::qvga()), ScriptedDecoder::qvga(), Arc::new(network), events)?;

    handle.stop();
    handle.wait().await?;
    assert!(matches!(handle.wait().await, Err(ScanError::TaskFailed { .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_shuts_source_down() -> Result<()> {
    let source = Arc::new(MockSource::qvga());
    let (network, events) = MockNetwork::new(NetworkBehavior::Silent);
    let handle = Scanner::spawn(ScannerConfig::default(), source.clone(), ScriptedDecoder::qvga(), Arc::new(network), events)?;

    tokio::time::sleep(Duration::from_millis(60)).await;
    drop(handle);
    assert!(source.stats().shut_down);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(source.stats().is_balanced());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_source_drives_pipeline() -> Result<()> {
    let images = vec![vec![0u8; 320 * 240], vec![255u8; 320 * 240]];
    let source = Arc::new(ReplaySource::from_images(FrameFormat::QVGA_GRAYSCALE, images)?);
    let decoder = ScriptedDecoder::qvga().then(Vec::new()).otherwise(vec![CodeScript::text("S:Lab;P:;")]);
    let (network, events) = MockNetwork::new(NetworkBehavior::ConnectOnAssociate(ADDRESS));

    let mut handle = Scanner::spawn(ScannerConfig::default(), source.clone(), decoder, Arc::new(network), events)?;
    let outcome = handle.wait().await?;

    assert_eq!(outcome.credential, Some(Credential::new("Lab", "")));
    assert_eq!(source.outstanding(), 0);
    Ok(())
}
