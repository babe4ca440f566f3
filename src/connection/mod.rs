//! Association state machine
//!
//! [`ConnectionManager`] owns the process-wide [`LinkStatus`]. The status lives in a
//! single `watch` channel: every transition, whether requested by the decode loop or
//! driven by a network notification, is applied inside one `send_if_modified`
//! critical section, so transitions from the two contexts are serialized.
//!
//! ```text
//!   Idle ──attempt──► Associating ──GotAddress──► Connected
//!                        │   ▲
//!               timeout/ │   │ attempt
//!               refused  ▼   │
//!                        Failed
//! ```

use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::network::NetworkInterface;
use crate::types::{ConnectionState, Credential, LinkStatus, NetworkEvent};
use crate::{Result, ScanError};


/// Bound on how long [`ConnectionManager::await_result`] waits for an address.
///
/// Expressed as a poll interval and a poll count; the total budget is their product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationWait {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl AssociationWait {
    pub fn new(poll_interval: Duration, max_polls: u32) -> Self {
        Self { poll_interval, max_polls }
    }

    /// Total time to wait before giving up
    pub fn budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls)
    }
}

impl Default for AssociationWait {
    /// 100 polls at 100ms, about ten seconds
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(100), max_polls: 100 }
    }
}

/// Outcome of waiting for an association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationResult {
    Connected,
    TimedOut,
}

/// Drives association attempts through a [`NetworkInterface`]
pub struct ConnectionManager {
    network: Arc<dyn NetworkInterface>,
    status: watch::Sender<LinkStatus>,
}

impl ConnectionManager {
    pub fn new(network: Arc<dyn NetworkInterface>) -> Self {
        let (status, _) = watch::channel(LinkStatus::default());
        Self { network, status }
    }

    /// Start associating with `credential`.
    ///
    /// Valid from `Idle` or `Failed` only. Returns as soon as the associate request
    /// has been issued; use [`await_result`](Self::await_result) to join.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Busy`] while another attempt is in flight (it is left untouched)
    /// - [`ScanError::InvalidTransition`] once connected
    /// - the network collaborator's error; the state is then `Failed`
    pub async fn attempt(&self, credential: &Credential) -> Result<()> {
        let mut refused = None;
        self.status.send_if_modified(|status| {
            if status.state.accepts_attempt() {
                status.state = ConnectionState::Associating;
                status.network = Some(credential.network().to_string());
                status.address = None;
                status.attempts += 1;
                true
            } else {
                refused = Some(status.state);
                false
            }
        });

        match refused {
            Some(ConnectionState::Associating) => {
                debug!(network = %credential.network, "Association already in progress");
                return Err(ScanError::Busy { state: ConnectionState::Associating });
            }
            Some(state) => {
                return Err(ScanError::InvalidTransition { from: state, to: ConnectionState::Associating });
            }
            None => {}
        }

        info!(network = %credential.network, "Connecting to network");

        if let Err(e) = self.request(credential).await {
            warn!(network = %credential.network, "Failed to initiate association: {}", e);
            self.transition(ConnectionState::Associating, ConnectionState::Failed);
            return Err(e);
        }

        Ok(())
    }

    /// Wait until the link is connected or the budget in `wait` runs out.
    ///
    /// On timeout an in-flight attempt is marked `Failed`, which allows the next
    /// discovered credential to retry.
    pub async fn await_result(&self, wait: AssociationWait) -> AssociationResult {
        let budget = wait.budget();
        let mut status = self.status.subscribe();

        let connected = tokio::time::timeout(budget, async {
            status.wait_for(LinkStatus::is_connected).await.map(|_| ())
        })
        .await;

        match connected {
            Ok(Ok(())) => AssociationResult::Connected,
            _ => {
                let result = self.settle_expired_attempt();
                if result == AssociationResult::TimedOut {
                    warn!("No address within {:?}, association failed", budget);
                }
                result
            }
        }
    }

    /// Resolve an attempt whose wait budget ran out.
    ///
    /// The address may arrive between the timer firing and this call, so the state is
    /// checked and failed in one critical section.
    fn settle_expired_attempt(&self) -> AssociationResult {
        let mut result = AssociationResult::TimedOut;
        self.status.send_if_modified(|status| match status.state {
            ConnectionState::Connected => {
                result = AssociationResult::Connected;
                false
            }
            ConnectionState::Associating => {
                status.state = ConnectionState::Failed;
                true
            }
            ConnectionState::Idle | ConnectionState::Failed => false,
        });
        result
    }

    /// Apply a notification from the network collaborator.
    ///
    /// A disconnect while associating or connected always triggers one reassociate
    /// request; it is never surfaced as a failure. A disconnect while `Idle` or
    /// `Failed` is ignored, unlike a station that reconnects on every disconnect: a
    /// failed attempt waits for the next scanned credential instead. `GotAddress` is
    /// the only success signal and is honoured only while associating.
    pub async fn handle_event(&self, event: NetworkEvent) {
        match event {
            NetworkEvent::StationStarted => info!("Network station started"),
            NetworkEvent::Disconnected { reason } => {
                let mut state = ConnectionState::Idle;
                let reassociate = self.status.send_if_modified(|status| {
                    state = status.state;
                    match status.state {
                        ConnectionState::Associating | ConnectionState::Connected => {
                            status.reassociations += 1;
                            true
                        }
                        ConnectionState::Idle | ConnectionState::Failed => false,
                    }
                });

                if !reassociate {
                    debug!(?reason, %state, "Disconnect ignored");
                    return;
                }

                info!(?reason, %state, "Network disconnected, trying to reconnect");
                if let Err(e) = self.network.associate().await {
                    warn!("Reassociate request failed: {}", e);
                }
            }
            NetworkEvent::GotAddress(address) => {
                let mut state = ConnectionState::Idle;
                let connected = self.status.send_if_modified(|status| {
                    state = status.state;
                    if status.state.can_transition_to(ConnectionState::Connected) {
                        status.state = ConnectionState::Connected;
                        status.address = Some(address);
                        true
                    } else {
                        false
                    }
                });

                if connected {
                    info!(%address, "Got address");
                } else {
                    debug!(%address, %state, "Address notification ignored");
                }
            }
        }
    }

    /// Current state machine position
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Snapshot of the link status
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// Status changes as a stream, starting with the current value
    pub fn status_updates(&self) -> impl Stream<Item = LinkStatus> + 'static {
        WatchStream::new(self.status.subscribe())
    }

    async fn request(&self, credential: &Credential) -> Result<()> {
        self.network.configure(credential).await?;
        self.network.associate().await
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.status.send_if_modified(|status| {
            if status.state == from && from.can_transition_to(to) {
                status.state = to;
                true
            } else {
                false
            }
        })
    }
}
