//! Scanner orchestration
//!
//! [`Scanner::spawn`] wires a frame source, a decoder and a network interface into
//! the pipeline and starts three tasks: capture, decode and the network event pump.
//! The returned [`ScannerHandle`] observes the link and joins the pipeline.

use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ScannerConfig;
use crate::connection::ConnectionManager;
use crate::credential::CredentialParser;
use crate::decoder::Decoder;
use crate::network::NetworkInterface;
use crate::pipeline::{CaptureLoop, CaptureStats, DecodeLoop, DecodeOutcome, DecodeStats, frame_channel};
use crate::shutdown::ShutdownCoordinator;
use crate::source::FrameSource;
use crate::types::{Credential, LinkStatus, NetworkEvent};
use crate::{Result, ScanError};

#[cfg(test)]
mod tests;

/// Everything the pipeline reports once it has stopped
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub capture: CaptureStats,
    pub decode: DecodeStats,
    /// Credential of the joined network; `None` when stopped without connecting
    pub credential: Option<Credential>,
    /// Link status at the time the pipeline stopped
    pub link: LinkStatus,
}

/// Entry point that spawns the pipeline tasks
pub struct Scanner;

impl Scanner {
    /// Validate the setup and start scanning.
    ///
    /// Must be called from within a tokio runtime. `events` carries the network
    /// collaborator's notifications; it is pumped into the connection manager
    /// until its sender is dropped or the handle goes away.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Config`] for an invalid configuration
    /// - [`ScanError::FrameFormat`] when the source, decoder and configured frame
    ///   size disagree
    pub fn spawn<S, D, N>(
        config: ScannerConfig,
        source: Arc<S>,
        decoder: D,
        network: Arc<N>,
        events: mpsc::UnboundedReceiver<NetworkEvent>,
    ) -> Result<ScannerHandle>
    where
        S: FrameSource,
        D: Decoder,
        N: NetworkInterface,
    {
        config.validate()?;

        let format = source.format();
        let configured = (config.frame.width, config.frame.height);
        if (format.width, format.height) != configured {
            return Err(ScanError::frame_format(
                format!("{}x{} (configured)", configured.0, configured.1),
                format.to_string(),
            ));
        }
        let (width, height) = decoder.dimensions();
        if (width, height) != configured {
            return Err(ScanError::frame_format(
                format!("{}x{} (configured)", configured.0, configured.1),
                format!("{width}x{height} (decoder)"),
            ));
        }

        let source: Arc<dyn FrameSource> = source;
        let connection = Arc::new(ConnectionManager::new(network));
        let shutdown = ShutdownCoordinator::new(Arc::clone(&source));
        let (sender, receiver) = frame_channel();

        let capture = CaptureLoop::new(
            Arc::clone(&source),
            sender,
            shutdown.token(),
            config.capture_period(),
            config.acquire_backoff(),
        )?;
        let decode = DecodeLoop::new(receiver, decoder, source, Arc::clone(&connection), shutdown.clone())
            .with_parser(CredentialParser::new(config.truncation))
            .with_association_wait(config.association_wait())
            .with_receive_timeout(config.decode_receive_timeout());

        let stop_events = CancellationToken::new();
        let capture = tokio::spawn(capture.run());
        let decode = tokio::spawn(decode.run());
        tokio::spawn(pump_events(events, Arc::clone(&connection), stop_events.clone()));

        info!("Scanner started ({})", format);

        Ok(ScannerHandle {
            connection,
            shutdown,
            capture: Some(capture),
            decode: Some(decode),
            stop_events,
        })
    }
}

/// Forward network notifications into the state machine
async fn pump_events(
    mut events: mpsc::UnboundedReceiver<NetworkEvent>,
    connection: Arc<ConnectionManager>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Some(event) => connection.handle_event(event).await,
            None => {
                debug!("Network event channel closed");
                break;
            }
        }
    }
    debug!("Network event pump stopped");
}

/// Handle to a running scanner.
///
/// Dropping the handle stops the pipeline and the event pump. Keep it alive after
/// [`wait`](Self::wait) to keep reassociating on disconnects.
pub struct ScannerHandle {
    connection: Arc<ConnectionManager>,
    shutdown: ShutdownCoordinator,
    capture: Option<JoinHandle<CaptureStats>>,
    decode: Option<JoinHandle<DecodeOutcome>>,
    stop_events: CancellationToken,
}

impl ScannerHandle {
    /// Receiver observing every link status change
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.connection.subscribe()
    }

    /// Link status changes as a stream, starting with the current value
    pub fn status_updates(&self) -> impl Stream<Item = LinkStatus> + 'static {
        self.connection.status_updates()
    }

    pub fn connection(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.connection)
    }

    /// Whether the pipeline has finished, by connecting or by [`stop`](Self::stop)
    pub fn is_finished(&self) -> bool {
        self.shutdown.is_finished()
    }

    /// Stop scanning without connecting. Returns `false` if already finished.
    pub fn stop(&self) -> bool {
        self.shutdown.finish()
    }

    /// Wait for capture and decode to stop and collect their results.
    ///
    /// # Errors
    ///
    /// [`ScanError::TaskFailed`] if a task panicked or the pipeline was already joined.
    pub async fn wait(&mut self) -> Result<ScanOutcome> {
        let (Some(capture), Some(decode)) = (self.capture.take(), self.decode.take()) else {
            return Err(ScanError::TaskFailed { task: "scanner", details: "already joined".into() });
        };

        let decode = decode
            .await
            .map_err(|e| ScanError::TaskFailed { task: "decode", details: e.to_string() })?;
        let capture = capture
            .await
            .map_err(|e| ScanError::TaskFailed { task: "capture", details: e.to_string() })?;

        Ok(ScanOutcome {
            capture,
            decode: decode.stats,
            credential: decode.connected,
            link: self.connection.status(),
        })
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        debug!("Dropping scanner handle");
        self.shutdown.finish();
        self.stop_events.cancel();
    }
}
