//! Decode stage: locates codes, classifies payloads and drives association

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::channel::{FrameReceiver, RecvOutcome};
use crate::connection::{AssociationResult, AssociationWait, ConnectionManager};
use crate::credential::CredentialParser;
use crate::decoder::Decoder;
use crate::pixel::to_grayscale;
use crate::shutdown::ShutdownCoordinator;
use crate::source::FrameSource;
use crate::types::{Credential, Frame};
use crate::{Result, ScanError};

/// Counters reported when the decode loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub frames: u64,
    /// Frames whose size or format the decoder could not take
    pub rejected_frames: u64,
    pub codes_located: u64,
    pub decode_failures: u64,
    pub payloads: u64,
    pub credentials: u64,
    pub attempts: u64,
}

/// What the decode loop achieved
#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub stats: DecodeStats,
    /// Credential of the network that was joined, if any
    pub connected: Option<Credential>,
}

/// Consumer side of the pipeline
pub struct DecodeLoop<D> {
    receiver: FrameReceiver,
    decoder: D,
    source: Arc<dyn FrameSource>,
    parser: CredentialParser,
    connection: Arc<ConnectionManager>,
    shutdown: ShutdownCoordinator,
    wait: AssociationWait,
    receive_timeout: Option<Duration>,
    stats: DecodeStats,
}

enum FrameResult {
    Continue,
    Connected(Credential),
    Stopped,
}

impl<D: Decoder> DecodeLoop<D> {
    pub fn new(
        receiver: FrameReceiver,
        decoder: D,
        source: Arc<dyn FrameSource>,
        connection: Arc<ConnectionManager>,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            receiver,
            decoder,
            source,
            parser: CredentialParser::default(),
            connection,
            shutdown,
            wait: AssociationWait::default(),
            receive_timeout: None,
            stats: DecodeStats::default(),
        }
    }

    pub fn with_parser(mut self, parser: CredentialParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_association_wait(mut self, wait: AssociationWait) -> Self {
        self.wait = wait;
        self
    }

    /// Bound each wait for a frame; `None` waits indefinitely
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Run until a network is joined, the pipeline is stopped or capture goes away.
    ///
    /// On exit the slot is closed and any frame left in it is released.
    pub async fn run(mut self) -> DecodeOutcome {
        info!(truncation = ?self.parser.policy(), "Decode loop started");
        let token = self.shutdown.token();
        let mut connected = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Decode loop cancelled");
                    break;
                }
                next = self.receiver.receive(self.receive_timeout) => next,
            };

            match next {
                RecvOutcome::Frame(frame) => match self.process_frame(frame).await {
                    FrameResult::Continue => {}
                    FrameResult::Connected(credential) => {
                        connected = Some(credential);
                        break;
                    }
                    FrameResult::Stopped => break,
                },
                RecvOutcome::TimedOut => trace!("No frame within {:?}", self.receive_timeout),
                RecvOutcome::Closed => {
                    debug!("Capture side closed the frame slot");
                    break;
                }
            }
        }

        let drained = self.receiver.close_and_drain();
        for frame in drained {
            self.source.release(frame);
        }

        info!(
            frames = self.stats.frames,
            codes = self.stats.codes_located,
            credentials = self.stats.credentials,
            connected = connected.is_some(),
            "Decode loop stopped"
        );
        DecodeOutcome { stats: self.stats, connected }
    }

    async fn process_frame(&mut self, frame: Frame) -> FrameResult {
        let started = Instant::now();
        let seq = frame.seq;
        self.stats.frames += 1;

        let loaded = self.load(&frame);
        // The decoder holds its own copy from here on
        self.source.release(frame);

        let codes = match loaded {
            Ok(codes) => codes,
            Err(e) => {
                self.stats.rejected_frames += 1;
                warn!(seq, "Frame rejected by decoder: {}", e);
                return FrameResult::Continue;
            }
        };
        self.stats.codes_located += codes as u64;

        let mut result = FrameResult::Continue;
        for index in 0..codes {
            let Some(code) = self.decoder.extract(index) else {
                continue;
            };

            let payload = match self.decoder.decode(&code) {
                Ok(payload) => payload,
                Err(kind) => {
                    self.stats.decode_failures += 1;
                    debug!(seq, index, "Decode failed: {}", kind);
                    continue;
                }
            };
            self.stats.payloads += 1;

            let credential = match self.parser.parse(&payload) {
                Ok(credential) => credential,
                Err(_) => {
                    info!(seq, index, "Decoded text: {}", String::from_utf8_lossy(&payload));
                    continue;
                }
            };
            self.stats.credentials += 1;

            match self.connect(&credential).await {
                Some(AssociationResult::Connected) => {
                    self.shutdown.finish();
                    result = FrameResult::Connected(credential);
                    break;
                }
                // Remaining codes in this frame are skipped once an attempt ran
                Some(AssociationResult::TimedOut) => break,
                None if self.shutdown.is_finished() => {
                    result = FrameResult::Stopped;
                    break;
                }
                None => {}
            }
        }

        info!(seq, codes, elapsed_ms = started.elapsed().as_millis() as u64, "Frame processed");
        result
    }

    fn load(&mut self, frame: &Frame) -> Result<usize> {
        let (width, height) = self.decoder.dimensions();
        if frame.format.width != width || frame.format.height != height {
            return Err(ScanError::frame_format(format!("{width}x{height}"), frame.format.to_string()));
        }
        if !frame.is_well_formed() {
            return Err(ScanError::frame_format(
                format!("{} bytes", frame.format.buffer_len()),
                format!("{} bytes", frame.len()),
            ));
        }

        let gray = to_grayscale(frame);
        self.decoder.load(&gray).map_err(|e| ScanError::Decoder { details: e.to_string() })
    }

    /// Start an attempt and wait for it. `None` when no attempt was started or the
    /// pipeline was stopped while waiting.
    async fn connect(&mut self, credential: &Credential) -> Option<AssociationResult> {
        match self.connection.attempt(credential).await {
            Ok(()) => {}
            Err(e @ ScanError::Busy { .. }) => {
                debug!(network = %credential.network, "Skipping credential: {}", e);
                return None;
            }
            Err(e) => {
                warn!(network = %credential.network, "Association not started: {}", e);
                return None;
            }
        }
        self.stats.attempts += 1;

        let token = self.shutdown.token();
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.connection.await_result(self.wait) => Some(result),
        }
    }
}
