/*
[INPUT]:  In-page connector client and the chain node
[OUTPUT]: Lute signing adapter
[POS]:    Wallet layer - page-embedded connector wallet implementation
[UPDATE]: When the connector's connect or signTxns API changes
*/

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http::{ChainNode, Result, SiwaError};
use crate::types::{Provider, SigningResult};
use crate::wallet::adapter::{connection_error, first_account, signing_error};
use crate::wallet::carrier::{build_carrier_transaction, carrier_signing_result};
use crate::wallet::SigningAdapter;

/// Unsigned transaction handed to the connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Base64 canonical unsigned transaction encoding
    pub txn: String,
}

/// Wallet reachable through a connector embedded in the page
#[async_trait]
pub trait EmbeddedConnector: Send + Sync {
    /// Connect on the network identified by `genesis_id`
    async fn connect(&self, genesis_id: &str) -> Result<Vec<String>>;

    /// One entry per transaction; `None` for transactions the wallet skipped
    async fn sign_txns(&self, txns: &[WalletTransaction]) -> Result<Vec<Option<Vec<u8>>>>;
}

/// Adapter for the page-embedded connector wallet
pub struct LuteAdapter {
    connector: Option<Arc<dyn EmbeddedConnector>>,
    node: Arc<dyn ChainNode>,
}

impl LuteAdapter {
    /// `connector` is `None` when the page has no connector available
    pub fn new(connector: Option<Arc<dyn EmbeddedConnector>>, node: Arc<dyn ChainNode>) -> Self {
        Self { connector, node }
    }

    fn connector(&self) -> Result<&Arc<dyn EmbeddedConnector>> {
        self.connector
            .as_ref()
            .ok_or_else(|| SiwaError::Connection("Lute wallet is not available".to_string()))
    }
}

impl fmt::Debug for LuteAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuteAdapter")
            .field("available", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningAdapter for LuteAdapter {
    fn provider(&self) -> Provider {
        Provider::Lute
    }

    async fn connect(&self) -> Result<String> {
        let connector = self.connector()?;

        let genesis_id = self.node.genesis_fingerprint().await.map_err(|err| {
            warn!(error = %err, "genesis fingerprint unavailable");
            SiwaError::Connection(format!("genesis fingerprint unavailable: {err}"))
        })?;

        let accounts = connector
            .connect(&genesis_id)
            .await
            .map_err(connection_error)?;
        let address = first_account(accounts, Provider::Lute)?;

        info!(%address, %genesis_id, "connector wallet connected");
        Ok(address)
    }

    async fn sign(&self, encoded_challenge: &[u8], address: &str) -> Result<SigningResult> {
        let connector = self.connector().map_err(signing_error)?;

        let txn = build_carrier_transaction(self.node.as_ref(), address, encoded_challenge).await?;
        let request = WalletTransaction {
            txn: BASE64.encode(txn.encode()?),
        };

        let signed = connector
            .sign_txns(&[request])
            .await
            .map_err(signing_error)?;

        let blob = signed
            .into_iter()
            .next()
            .flatten()
            .filter(|blob| !blob.is_empty())
            .ok_or_else(|| SiwaError::Signing("Lute signature array is empty".to_string()))?;

        carrier_signing_result(blob)
    }

    /// The connector keeps no session to tear down
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}
