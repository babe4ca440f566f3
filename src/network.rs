//! Network collaborator boundary

use crate::Result;
use crate::types::Credential;

/// Station-mode network interface that performs the actual association.
///
/// Outcomes are reported asynchronously as [`NetworkEvent`](crate::NetworkEvent)s
/// through the event channel handed to [`Scanner::spawn`](crate::Scanner::spawn);
/// `GotAddress` is the only success signal.
#[async_trait::async_trait]
pub trait NetworkInterface: Send + Sync + 'static {
    /// Apply the credential to the station configuration
    async fn configure(&self, credential: &Credential) -> Result<()>;

    /// Issue an asynchronous associate request with the current configuration
    async fn associate(&self) -> Result<()>;
}
