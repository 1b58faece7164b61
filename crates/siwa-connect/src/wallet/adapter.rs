/*
[INPUT]:  Encoded challenge bytes and the signing address
[OUTPUT]: SigningResult in a provider-independent shape
[POS]:    Wallet layer - the capability interface every provider implements
[UPDATE]: When the adapter contract changes
*/

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::http::{Result, SiwaError};
use crate::types::{Provider, SigningResult};

/// Callback a wallet client fires when the remote side ends the session
pub type DisconnectListener = Arc<dyn Fn() + Send + Sync>;

/// Handle an adapter uses to report that its wallet dropped the session
#[derive(Debug, Clone)]
pub struct DropNotifier {
    provider: Provider,
    tx: mpsc::UnboundedSender<Provider>,
}

impl DropNotifier {
    pub fn new(provider: Provider, tx: mpsc::UnboundedSender<Provider>) -> Self {
        Self { provider, tx }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Report the drop; ignored once nobody listens anymore
    pub fn notify(&self) {
        let _ = self.tx.send(self.provider);
    }

    /// Wrap this notifier as a wallet client disconnect callback
    pub fn into_listener(self) -> DisconnectListener {
        Arc::new(move || self.notify())
    }
}

/// Uniform signing contract over one wallet provider
///
/// The trait is async because every call may wait on the user approving in
/// an out-of-process wallet.
#[async_trait]
pub trait SigningAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Open a session and return the active address
    async fn connect(&self) -> Result<String>;

    /// Silently resume a previously established session.
    ///
    /// Only session-relay wallets keep a remote session; others have nothing
    /// to resume.
    async fn resume(&self) -> Result<()> {
        Ok(())
    }

    /// Sign the encoded challenge for `address`
    async fn sign(&self, encoded_challenge: &[u8], address: &str) -> Result<SigningResult>;

    async fn disconnect(&self) -> Result<()>;

    /// Register the notifier fired when the wallet ends the session on its own
    fn on_session_dropped(&self, _notifier: DropNotifier) {}
}

/// Keep connection-class errors, wrap anything else as a connection failure
pub(crate) fn connection_error(err: SiwaError) -> SiwaError {
    match err {
        SiwaError::Connection(_) | SiwaError::Cancelled => err,
        other => SiwaError::Connection(other.to_string()),
    }
}

/// Keep signing-class errors, wrap anything else as a signing failure
pub(crate) fn signing_error(err: SiwaError) -> SiwaError {
    match err {
        SiwaError::Signing(_) | SiwaError::ParametersUnavailable(_) | SiwaError::Cancelled => err,
        other => SiwaError::Signing(other.to_string()),
    }
}

/// First account of a wallet's account list
pub(crate) fn first_account(accounts: Vec<String>, provider: Provider) -> Result<String> {
    accounts
        .into_iter()
        .find(|account| !account.trim().is_empty())
        .ok_or_else(|| SiwaError::Connection(format!("{provider} returned no accounts")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drop_notifier_listener() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = DropNotifier::new(Provider::Defly, tx).into_listener();

        listener();
        assert_eq!(rx.recv().await, Some(Provider::Defly));
    }

    #[test]
    fn test_error_classification() {
        let err = connection_error(SiwaError::InvalidResponse("bad".to_string()));
        assert!(matches!(err, SiwaError::Connection(_)));

        let err = signing_error(SiwaError::ParametersUnavailable("node".to_string()));
        assert!(matches!(err, SiwaError::ParametersUnavailable(_)));
    }

    #[test]
    fn test_first_account() {
        let account = first_account(vec!["ADDR1".to_string(), "ADDR2".to_string()], Provider::Pera);
        assert_eq!(account.unwrap(), "ADDR1");

        let err = first_account(Vec::new(), Provider::Pera).unwrap_err();
        assert!(matches!(err, SiwaError::Connection(_)));
    }
}
