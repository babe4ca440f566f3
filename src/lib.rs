//! Scan QR-encoded network credentials from a camera and join the network.
//!
//! Scanlink runs a small three-stage pipeline: a capture task pulls frames from a
//! camera, a decode task looks for matrix codes carrying `S:<name>;P:<secret>;`
//! credentials, and a connection manager drives association through the network
//! stack. Once an address is obtained, capture shuts down.
//!
//! # Features
//!
//! - **Bounded memory**: a single-slot hand-off between capture and decode that drops
//!   the newest frame when the decoder is busy
//! - **Explicit ownership**: every frame buffer goes back to its source exactly once
//! - **Serialized state machine**: `Idle → Associating → Connected | Failed`, shared
//!   through a `watch` channel
//! - **Pluggable collaborators**: camera, decoder and network stack are traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scanlink::sources::ReplaySource;
//! use scanlink::{Decoder, NetworkEvent, NetworkInterface, Scanner, ScannerConfig};
//! use tokio::sync::mpsc::UnboundedReceiver;
//!
//! async fn provision<D, N>(
//!     decoder: D,
//!     network: Arc<N>,
//!     events: UnboundedReceiver<NetworkEvent>,
//! ) -> scanlink::Result<()>
//! where
//!     D: Decoder,
//!     N: NetworkInterface,
//! {
//!     let source = Arc::new(ReplaySource::open("frames/")?);
//!
//!     let mut scanner = Scanner::spawn(ScannerConfig::default(), source, decoder, network, events)?;
//!     let outcome = scanner.wait().await?;
//!
//!     if let Some(credential) = outcome.credential {
//!         println!("Joined {}", credential.network());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod types;

// Collaborator boundaries
pub mod decoder;
pub mod network;
pub mod source;
pub mod sources;

// Pipeline
pub mod config;
pub mod connection;
pub mod credential;
pub mod pixel;
pub mod pipeline;
pub mod scanner;
pub mod shutdown;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::ScannerConfig;
pub use connection::{AssociationResult, AssociationWait, ConnectionManager};
pub use credential::{CredentialParser, NotACredential, TruncationPolicy, parse_credential};
pub use decoder::{DecodeErrorKind, Decoder, DecoderError, LocatedCode};
pub use network::NetworkInterface;
pub use scanner::{ScanOutcome, Scanner, ScannerHandle};
pub use shutdown::ShutdownCoordinator;
pub use source::FrameSource;
