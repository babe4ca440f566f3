//! Connection state machine types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Association state of the network link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No association requested yet
    #[default]
    Idle,

    /// Association requested, waiting for an address
    Associating,

    /// Address obtained. Terminal for the scanner.
    Connected,

    /// Last association attempt timed out or was refused
    Failed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a permitted transition.
    ///
    /// Permitted: Idle→Associating, Associating→Connected, Associating→Failed,
    /// Failed→Associating. Connected has no outgoing transitions.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle, Associating) | (Associating, Connected) | (Associating, Failed) | (Failed, Associating)
        )
    }

    /// Whether `attempt` may start a new association from this state
    pub fn accepts_attempt(self) -> bool {
        self.can_transition_to(ConnectionState::Associating)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Associating => "associating",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the shared link state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkStatus {
    /// Current state machine position
    pub state: ConnectionState,

    /// Network name of the current or most recent attempt
    pub network: Option<String>,

    /// Address reported by the network on success
    pub address: Option<IpAddr>,

    /// Association attempts started through `attempt`
    pub attempts: u32,

    /// Automatic reassociations triggered by disconnect notifications
    pub reassociations: u32,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Asynchronous notification from the network collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Station interface came up
    StationStarted,

    /// Link dropped or association failed
    Disconnected { reason: Option<u16> },

    /// Address acquired; the only success signal
    GotAddress(IpAddr),
}
