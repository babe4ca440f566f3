//! Replay recorded frames through the scanner.
//!
//! Plays back a directory of PNM frames with a scripted decoder that reports
//! `payload` on every frame, and a network stand-in that grants an address after
//! each associate request.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example replay_scan --features test-support -- <frames-dir> 'S:Home;P:hunter2;'
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use anyhow::{Context, bail};
use scanlink::sources::ReplaySource;
use scanlink::test_utils::{CodeScript, MockNetwork, NetworkBehavior, ScriptedDecoder};
use scanlink::{FrameSource, Scanner, ScannerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(dir), Some(payload)) = (args.next(), args.next()) else {
        bail!("usage: replay_scan <frames-dir> <payload> [config.yaml]");
    };
    let config = match args.next() {
        Some(path) => ScannerConfig::from_path(&path).with_context(|| format!("loading {path}"))?,
        None => ScannerConfig::default(),
    };

    let source = Arc::new(ReplaySource::open(&dir).with_context(|| format!("opening {dir}"))?);
    let format = source.format();
    let config = ScannerConfig {
        frame: scanlink::config::FrameConfig { width: format.width, height: format.height },
        ..config
    };

    let decoder = ScriptedDecoder::new(format.width, format.height).otherwise(vec![CodeScript::text(&payload)]);
    let (network, events) = MockNetwork::new(NetworkBehavior::ConnectOnAssociate(IpAddr::V4(Ipv4Addr::new(
        192, 168, 4, 2,
    ))));

    println!("Replaying {} frames ({format}) from {dir}", source.frame_count());
    let mut scanner = Scanner::spawn(config, source, decoder, Arc::new(network), events)?;

    let outcome = scanner.wait().await?;

    println!();
    println!("Capture: {:?}", outcome.capture);
    println!("Decode:  {:?}", outcome.decode);
    match outcome.credential {
        Some(credential) => println!("Joined {} at {:?}", credential.network(), outcome.link.address),
        None => println!("Stopped without joining a network"),
    }

    Ok(())
}
