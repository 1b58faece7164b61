/*
[INPUT]:  Chain node base URL
[OUTPUT]: Suggested transaction parameters and genesis fingerprint
[POS]:    HTTP layer - read-only chain node queries for carrier transactions
[UPDATE]: When node endpoints or response formats change
*/

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::http::{ClientConfig, HttpClient, Result};
use crate::types::SuggestedParams;

/// Public mainnet node
pub const MAINNET_NODE_URL: &str = "https://mainnet-api.algonode.cloud";

/// Rounds a carrier transaction stays valid for
const VALIDITY_WINDOW: u64 = 1000;

/// Read-only chain node queries used by the carrier-transaction wallets
#[async_trait]
pub trait ChainNode: Send + Sync {
    /// Fee, validity window and genesis for a new transaction
    async fn suggested_params(&self) -> Result<SuggestedParams>;

    /// Network fingerprint `"{network}-{id}"` from the genesis record
    async fn genesis_fingerprint(&self) -> Result<String>;
}

/// GET /v2/transactions/params response
#[derive(Debug, Deserialize)]
struct TransactionParamsResponse {
    fee: u64,
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "last-round")]
    last_round: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
}

/// GET /genesis response, only the identifying fields
#[derive(Debug, Deserialize)]
struct GenesisResponse {
    network: String,
    id: String,
}

/// REST client for an algod node
#[derive(Debug, Clone)]
pub struct AlgodClient {
    client: HttpClient,
}

impl AlgodClient {
    /// Client for the public mainnet node with default configuration
    pub fn mainnet() -> Result<Self> {
        Self::new(MAINNET_NODE_URL, &ClientConfig::default())
    }

    pub fn new(base_url: &str, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(base_url, config)?,
        })
    }
}

#[async_trait]
impl ChainNode for AlgodClient {
    /// GET /v2/transactions/params
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let builder = self.client.request(Method::GET, "/v2/transactions/params")?;
        let response: TransactionParamsResponse = self.client.send_json(builder).await?;

        Ok(SuggestedParams {
            fee: response.fee,
            min_fee: response.min_fee,
            flat_fee: false,
            first_round: response.last_round,
            last_round: response.last_round + VALIDITY_WINDOW,
            genesis_id: response.genesis_id,
            genesis_hash: response.genesis_hash,
        })
    }

    /// GET /genesis
    async fn genesis_fingerprint(&self) -> Result<String> {
        let builder = self.client.request(Method::GET, "/genesis")?;
        let genesis: GenesisResponse = self.client.send_json(builder).await?;
        Ok(format!("{}-{}", genesis.network, genesis.id))
    }
}
