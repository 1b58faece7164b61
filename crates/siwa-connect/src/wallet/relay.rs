/*
[INPUT]:  Session-relay wallet clients (QR / deep-link bridge) and the chain node
[OUTPUT]: Pera and Defly signing adapters
[POS]:    Wallet layer - session-relay wallet implementations
[UPDATE]: When a relay wallet's session or signing API changes
*/

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::http::{ChainNode, Result, SiwaError};
use crate::types::{Provider, SigningResult};
use crate::wallet::adapter::{connection_error, first_account, signing_error};
use crate::wallet::carrier::{build_carrier_transaction, carrier_signing_result};
use crate::wallet::{DisconnectListener, DropNotifier, SigningAdapter};

/// Session lifecycle shared by relay wallets
#[async_trait]
pub trait RelaySession: Send + Sync {
    /// Run the relay handshake; resolves with the wallet's accounts
    async fn connect(&self) -> Result<Vec<String>>;

    /// Resume the last session without user interaction
    async fn reconnect_session(&self) -> Result<Vec<String>>;

    async fn disconnect(&self) -> Result<()>;

    /// Install the callback fired when the wallet ends the session
    fn set_disconnect_listener(&self, listener: DisconnectListener);

    fn clear_disconnect_listener(&self);
}

/// One arbitrary-bytes signing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDataRequest {
    pub data: Vec<u8>,
    /// Text the wallet shows next to the request
    pub message: String,
}

/// Relay wallet able to sign arbitrary bytes
#[async_trait]
pub trait DataSigningRelay: RelaySession {
    /// One signature per request, in order
    async fn sign_data(&self, requests: &[SignDataRequest], signer: &str) -> Result<Vec<Vec<u8>>>;
}

/// Unsigned transaction together with the addresses expected to sign it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerTransaction {
    /// Canonical unsigned transaction encoding
    pub txn: Vec<u8>,
    pub signers: Vec<String>,
}

/// Relay wallet that only signs transactions
#[async_trait]
pub trait TransactionSigningRelay: RelaySession {
    /// Signed transaction blobs, flattened across groups
    async fn sign_transaction(&self, groups: &[Vec<SignerTransaction>]) -> Result<Vec<Vec<u8>>>;
}

async fn relay_connect<C: RelaySession + ?Sized>(client: &C, provider: Provider) -> Result<String> {
    let accounts = client.connect().await.map_err(connection_error)?;
    debug!(%provider, account_count = accounts.len(), "relay handshake complete");
    first_account(accounts, provider)
}

async fn relay_resume<C: RelaySession + ?Sized>(client: &C, provider: Provider) -> Result<()> {
    let accounts = client.reconnect_session().await.map_err(connection_error)?;
    if accounts.is_empty() {
        return Err(SiwaError::Connection(format!(
            "{provider} session could not be resumed"
        )));
    }
    info!(%provider, "relay session resumed");
    Ok(())
}

async fn relay_disconnect<C: RelaySession + ?Sized>(client: &C) -> Result<()> {
    client.clear_disconnect_listener();
    client.disconnect().await
}

/// Adapter for the relay wallet that signs the encoded challenge directly
pub struct PeraAdapter {
    client: Arc<dyn DataSigningRelay>,
}

impl PeraAdapter {
    pub fn new(client: Arc<dyn DataSigningRelay>) -> Self {
        Self { client }
    }
}

impl fmt::Debug for PeraAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeraAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningAdapter for PeraAdapter {
    fn provider(&self) -> Provider {
        Provider::Pera
    }

    async fn connect(&self) -> Result<String> {
        relay_connect(self.client.as_ref(), Provider::Pera).await
    }

    async fn resume(&self) -> Result<()> {
        relay_resume(self.client.as_ref(), Provider::Pera).await
    }

    async fn sign(&self, encoded_challenge: &[u8], address: &str) -> Result<SigningResult> {
        let request = SignDataRequest {
            data: encoded_challenge.to_vec(),
            message: String::new(),
        };
        let signatures = self
            .client
            .sign_data(&[request], address)
            .await
            .map_err(signing_error)?;

        let signature = signatures
            .into_iter()
            .next()
            .filter(|signature| !signature.is_empty())
            .ok_or_else(|| SiwaError::Signing("Pera returned no signature".to_string()))?;

        Ok(SigningResult::direct(signature))
    }

    async fn disconnect(&self) -> Result<()> {
        relay_disconnect(self.client.as_ref()).await
    }

    fn on_session_dropped(&self, notifier: DropNotifier) {
        self.client.set_disconnect_listener(notifier.into_listener());
    }
}

/// Adapter for the relay wallet that only signs transactions.
///
/// The challenge travels in the note of a zero-amount self-payment; the
/// signed transaction is kept so the verifier can recompute the signed bytes.
pub struct DeflyAdapter {
    client: Arc<dyn TransactionSigningRelay>,
    node: Arc<dyn ChainNode>,
}

impl DeflyAdapter {
    pub fn new(client: Arc<dyn TransactionSigningRelay>, node: Arc<dyn ChainNode>) -> Self {
        Self { client, node }
    }
}

impl fmt::Debug for DeflyAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflyAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningAdapter for DeflyAdapter {
    fn provider(&self) -> Provider {
        Provider::Defly
    }

    async fn connect(&self) -> Result<String> {
        relay_connect(self.client.as_ref(), Provider::Defly).await
    }

    async fn resume(&self) -> Result<()> {
        relay_resume(self.client.as_ref(), Provider::Defly).await
    }

    async fn sign(&self, encoded_challenge: &[u8], address: &str) -> Result<SigningResult> {
        let txn = build_carrier_transaction(self.node.as_ref(), address, encoded_challenge).await?;
        let group = vec![SignerTransaction {
            txn: txn.encode()?,
            signers: vec![address.to_string()],
        }];

        let signed = self
            .client
            .sign_transaction(&[group])
            .await
            .map_err(signing_error)?;

        let blob = signed
            .into_iter()
            .next()
            .filter(|blob| !blob.is_empty())
            .ok_or_else(|| SiwaError::Signing("Defly returned no signed transaction".to_string()))?;

        carrier_signing_result(blob)
    }

    async fn disconnect(&self) -> Result<()> {
        relay_disconnect(self.client.as_ref()).await
    }

    fn on_session_dropped(&self, notifier: DropNotifier) {
        self.client.set_disconnect_listener(notifier.into_listener());
    }
}
