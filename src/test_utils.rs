//! Test doubles for the external collaborators
//!
//! These stand in for the camera, the matrix-code decoder and the network stack so
//! the pipeline can be exercised without hardware. They record every interaction so
//! tests can assert on the frame ownership protocol and the association requests.

#![cfg(any(test, feature = "test-support"))]

use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::decoder::{CodeCorners, DecodeErrorKind, Decoder, DecoderError, LocatedCode};
use crate::network::NetworkInterface;
use crate::source::FrameSource;
use crate::types::{Credential, Frame, FrameFormat, NetworkEvent};
use crate::{Result, ScanError};

/// Counters describing how a [`MockSource`] was used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub acquired: u64,
    pub released: u64,
    pub failed_acquires: u64,
    /// Releases of frames that were not outstanding (double or foreign release)
    pub invalid_releases: u64,
    pub outstanding: usize,
    pub shut_down: bool,
}

impl SourceStats {
    /// Every acquired frame was released exactly once
    pub fn is_balanced(&self) -> bool {
        self.acquired == self.released && self.outstanding == 0 && self.invalid_releases == 0
    }
}

#[derive(Default)]
struct MockSourceState {
    next_seq: u64,
    outstanding: HashSet<u64>,
    stats: SourceStats,
    failure_plan: VecDeque<bool>,
}

/// Camera stand-in that hands out zero-filled frames and audits releases
pub struct MockSource {
    format: FrameFormat,
    acquire_delay: Duration,
    state: Mutex<MockSourceState>,
}

impl MockSource {
    pub fn new(format: FrameFormat) -> Self {
        Self { format, acquire_delay: Duration::ZERO, state: Mutex::new(MockSourceState::default()) }
    }

    /// Reference QVGA grayscale source
    pub fn qvga() -> Self {
        Self::new(FrameFormat::QVGA_GRAYSCALE)
    }

    /// Script acquisition outcomes: `true` entries fail, `false` entries succeed.
    /// Once the plan is exhausted every acquisition succeeds.
    pub fn with_failure_plan(self, plan: impl IntoIterator<Item = bool>) -> Self {
        self.lock().failure_plan = plan.into_iter().collect();
        self
    }

    /// Simulate exposure time on each acquisition
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn stats(&self) -> SourceStats {
        let state = self.lock();
        let mut stats = state.stats;
        stats.outstanding = state.outstanding.len();
        stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockSourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl FrameSource for MockSource {
    async fn acquire(&self) -> Result<Frame> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        let mut state = self.lock();
        if state.stats.shut_down {
            state.stats.failed_acquires += 1;
            return Err(ScanError::camera_unavailable("camera shut down"));
        }
        if state.failure_plan.pop_front().unwrap_or(false) {
            state.stats.failed_acquires += 1;
            return Err(ScanError::camera_unavailable("scripted capture failure"));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.outstanding.insert(seq);
        state.stats.acquired += 1;
        Ok(Frame::new(vec![0u8; self.format.buffer_len()], self.format, seq))
    }

    fn release(&self, frame: Frame) {
        let mut state = self.lock();
        if state.outstanding.remove(&frame.seq) {
            state.stats.released += 1;
        } else {
            state.stats.invalid_releases += 1;
        }
    }

    fn shutdown(&self) {
        self.lock().stats.shut_down = true;
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}

/// Scripted outcome for one located code
#[derive(Debug, Clone)]
pub enum CodeScript {
    Payload(Vec<u8>),
    Fails(DecodeErrorKind),
}

impl CodeScript {
    pub fn text(payload: &str) -> Self {
        CodeScript::Payload(payload.as_bytes().to_vec())
    }
}

/// Decoder stand-in that returns scripted codes for each loaded image.
///
/// Each `load` takes the next queued script; when the queue is empty the
/// fallback script (no codes by default) is used.
pub struct ScriptedDecoder {
    dimensions: (u32, u32),
    queued: VecDeque<Vec<CodeScript>>,
    fallback: Vec<CodeScript>,
    current: Vec<CodeScript>,
    loads: usize,
    decode_calls: std::sync::atomic::AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: (width, height),
            queued: VecDeque::new(),
            fallback: Vec::new(),
            current: Vec::new(),
            loads: 0,
            decode_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn qvga() -> Self {
        Self::new(320, 240)
    }

    /// Codes for the next loaded image
    pub fn then(mut self, codes: Vec<CodeScript>) -> Self {
        self.queued.push_back(codes);
        self
    }

    /// Images loaded so far
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Decode calls made so far, across all images
    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Codes for every image once the queue is exhausted
    pub fn otherwise(mut self, codes: Vec<CodeScript>) -> Self {
        self.fallback = codes;
        self
    }
}

impl Decoder for ScriptedDecoder {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn load(&mut self, gray: &[u8]) -> std::result::Result<usize, DecoderError> {
        let expected = self.dimensions.0 as usize * self.dimensions.1 as usize;
        if gray.len() != expected {
            return Err(DecoderError::SizeMismatch { expected, found: gray.len() });
        }
        self.loads += 1;
        self.current = self.queued.pop_front().unwrap_or_else(|| self.fallback.clone());
        Ok(self.current.len())
    }

    fn extract(&self, index: usize) -> Option<LocatedCode> {
        self.current.get(index).map(|_| LocatedCode {
            index,
            corners: CodeCorners([(0, 0), (20, 0), (20, 20), (0, 20)]),
            grid_size: 21,
            cells: Vec::new(),
        })
    }

    fn decode(&self, code: &LocatedCode) -> std::result::Result<Vec<u8>, DecodeErrorKind> {
        self.decode_calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        match self.current.get(code.index) {
            Some(CodeScript::Payload(bytes)) => Ok(bytes.clone()),
            Some(CodeScript::Fails(kind)) => Err(*kind),
            None => Err(DecodeErrorKind::InvalidGridSize),
        }
    }
}

/// How [`MockNetwork`] reacts to association requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkBehavior {
    /// Accept requests and report nothing; tests inject events themselves
    Silent,
    /// Report `GotAddress` after every associate request
    ConnectOnAssociate(IpAddr),
    /// Refuse configure calls
    RejectConfigure,
}

#[derive(Default)]
struct MockNetworkState {
    configured: Vec<Credential>,
    associate_calls: u32,
}

/// Network stack stand-in that records requests and emits scripted events
pub struct MockNetwork {
    behavior: NetworkBehavior,
    events: mpsc::UnboundedSender<NetworkEvent>,
    state: Mutex<MockNetworkState>,
}

impl MockNetwork {
    /// Create the mock and the event receiver the scanner should pump
    pub fn new(behavior: NetworkBehavior) -> (Self, mpsc::UnboundedReceiver<NetworkEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { behavior, events, state: Mutex::new(MockNetworkState::default()) }, rx)
    }

    /// Inject a notification as if it came from the network stack
    pub fn emit(&self, event: NetworkEvent) {
        let _ = self.events.send(event);
    }

    /// Credentials passed to `configure`, in order
    pub fn configured(&self) -> Vec<Credential> {
        self.lock().configured.clone()
    }

    pub fn associate_calls(&self) -> u32 {
        self.lock().associate_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockNetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl NetworkInterface for MockNetwork {
    async fn configure(&self, credential: &Credential) -> Result<()> {
        if self.behavior == NetworkBehavior::RejectConfigure {
            let refusal = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "credential refused");
            return Err(ScanError::network_failed_with_source("configure", Box::new(refusal)));
        }
        self.lock().configured.push(credential.clone());
        Ok(())
    }

    async fn associate(&self) -> Result<()> {
        self.lock().associate_calls += 1;
        if let NetworkBehavior::ConnectOnAssociate(address) = self.behavior {
            self.emit(NetworkEvent::GotAddress(address));
        }
        Ok(())
    }
}
