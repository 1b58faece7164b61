/*
[INPUT]:  Global injected wallet object (browser extension), when present
[OUTPUT]: Kibisis signing adapter
[POS]:    Wallet layer - browser-injected wallet implementation
[UPDATE]: When the injected wallet's enable or signBytes API changes
*/

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codec::injected_sign_payload;
use crate::http::{Result, SiwaError};
use crate::types::{Provider, SigningResult};
use crate::wallet::adapter::signing_error;
use crate::wallet::SigningAdapter;

/// Wallet id passed to `enable`
pub const KIBISIS_WALLET_ID: &str = "kibisis";

const NO_ACCOUNTS: &str = "User cancelled or no accounts available";

/// Account entry returned by `enable`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccount {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnableResult {
    #[serde(default)]
    pub accounts: Vec<InjectedAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignBytesResult {
    pub signature: Option<Vec<u8>>,
}

/// AVM wallet object an extension injects into the page
#[async_trait]
pub trait InjectedWalletObject: Send + Sync {
    /// Ask the extension to expose accounts for `wallet_id`
    async fn enable(&self, wallet_id: &str) -> Result<EnableResult>;

    async fn sign_bytes(&self, data: &[u8]) -> Result<SignBytesResult>;
}

/// Adapter for the browser-injected wallet.
///
/// Signs `"MX" ++ encoded challenge` as raw bytes.
pub struct KibisisAdapter {
    object: Option<Arc<dyn InjectedWalletObject>>,
}

impl KibisisAdapter {
    /// `object` is `None` when no extension injected a wallet object
    pub fn new(object: Option<Arc<dyn InjectedWalletObject>>) -> Self {
        Self { object }
    }

    fn object(&self) -> Option<&Arc<dyn InjectedWalletObject>> {
        self.object.as_ref()
    }
}

impl fmt::Debug for KibisisAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KibisisAdapter")
            .field("injected", &self.object.is_some())
            .finish()
    }
}

#[async_trait]
impl SigningAdapter for KibisisAdapter {
    fn provider(&self) -> Provider {
        Provider::Kibisis
    }

    async fn connect(&self) -> Result<String> {
        let Some(object) = self.object() else {
            warn!("AVM wallets not available");
            return Err(SiwaError::Connection("AVM wallets not available".to_string()));
        };

        let enabled = match object.enable(KIBISIS_WALLET_ID).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "error enabling injected wallet");
                return Err(SiwaError::Connection(NO_ACCOUNTS.to_string()));
            }
        };

        let address = enabled
            .accounts
            .into_iter()
            .map(|account| account.address)
            .find(|address| !address.trim().is_empty())
            .ok_or_else(|| SiwaError::Connection(NO_ACCOUNTS.to_string()))?;

        info!(%address, "injected wallet enabled");
        Ok(address)
    }

    async fn sign(&self, encoded_challenge: &[u8], _address: &str) -> Result<SigningResult> {
        let object = self
            .object()
            .ok_or_else(|| SiwaError::Signing("AVM wallets not available".to_string()))?;

        let payload = injected_sign_payload(encoded_challenge);
        let result = object.sign_bytes(&payload).await.map_err(signing_error)?;

        let signature = result
            .signature
            .filter(|signature| !signature.is_empty())
            .ok_or_else(|| SiwaError::Signing("Kibisis returned no signature".to_string()))?;

        Ok(SigningResult::direct(signature))
    }

    /// The extension keeps no session to tear down
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}
