//! Wi-Fi credential extraction from decoded QR payloads
//!
//! Recognises the `S:<name>;P:<secret>;` convention used by network-join QR codes,
//! including the common `WIFI:T:WPA;S:<name>;P:<secret>;;` form. The two markers are
//! located independently, so they may appear in either order.
//!
//! ```rust
//! use scanlink::credential::parse_credential;
//!
//! let credential = parse_credential(b"WIFI:T:WPA;S:Home;P:hunter2;;").unwrap();
//! assert_eq!(credential.network(), "Home");
//! assert_eq!(credential.secret(), "hunter2");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{BoundedText, Credential, MAX_FIELD_CHARS};

const NETWORK_MARKER: &str = "S:";
const SECRET_MARKER: &str = "P:";
const DELIMITER: char = ';';

/// What to do when a field is longer than [`MAX_FIELD_CHARS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Keep the first 63 characters without reporting anything
    #[default]
    Silent,

    /// Treat the payload as not a credential
    Reject,
}

/// Which credential field a verdict refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Network,
    Secret,
}

/// Reason a payload was classified as not a credential
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotACredential {
    #[error("payload is not UTF-8 text")]
    NotText,

    #[error("payload lacks the {0:?} marker")]
    MissingMarker(&'static str),

    #[error("network name is not terminated by ';'")]
    UnterminatedName,

    #[error("{field:?} field has {chars} characters, limit is {MAX_FIELD_CHARS}")]
    FieldTooLong { field: CredentialField, chars: usize },
}

/// Parses decoded payloads into [`Credential`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialParser {
    policy: TruncationPolicy,
}

impl CredentialParser {
    pub fn new(policy: TruncationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TruncationPolicy {
        self.policy
    }

    /// Classify a decoded payload.
    ///
    /// The payload is read up to its first NUL byte. The network name runs from
    /// `S:` to the next `;` and must be terminated. The secret runs from `P:` to the
    /// next `;` or to the end of the payload. Empty fields are valid.
    pub fn parse(&self, payload: &[u8]) -> Result<Credential, NotACredential> {
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        let text = std::str::from_utf8(&payload[..end]).map_err(|_| NotACredential::NotText)?;

        let network_at = text.find(NETWORK_MARKER).ok_or(NotACredential::MissingMarker(NETWORK_MARKER));
        let secret_at = text.find(SECRET_MARKER).ok_or(NotACredential::MissingMarker(SECRET_MARKER));
        let (network_at, secret_at) = match (network_at, secret_at) {
            (Ok(n), Ok(s)) => (n, s),
            (Err(e), _) | (_, Err(e)) => {
                debug!("Payload is not a network credential: {}", e);
                return Err(e);
            }
        };

        let network_tail = &text[network_at + NETWORK_MARKER.len()..];
        let network = match network_tail.find(DELIMITER) {
            Some(stop) => &network_tail[..stop],
            None => {
                warn!("Network name not terminated in credential payload");
                return Err(NotACredential::UnterminatedName);
            }
        };

        let secret_tail = &text[secret_at + SECRET_MARKER.len()..];
        let secret = secret_tail.find(DELIMITER).map_or(secret_tail, |stop| &secret_tail[..stop]);

        let network = self.bound(network, CredentialField::Network)?;
        let secret = self.bound(secret, CredentialField::Secret)?;

        debug!(network = %network, secret_chars = secret.char_len(), "Parsed network credential");
        Ok(Credential { network, secret })
    }

    fn bound(&self, text: &str, field: CredentialField) -> Result<BoundedText, NotACredential> {
        match self.policy {
            TruncationPolicy::Silent => Ok(BoundedText::truncating(text).0),
            TruncationPolicy::Reject => {
                BoundedText::exact(text).map_err(|chars| NotACredential::FieldTooLong { field, chars })
            }
        }
    }
}

/// Parse with the default (silent truncation) policy
pub fn parse_credential(payload: &[u8]) -> Result<Credential, NotACredential> {
    CredentialParser::default().parse(payload)
}
