/*
[INPUT]:  Verify endpoint URL and signed credentials
[OUTPUT]: Verification outcome mapped from the endpoint's status codes
[POS]:    HTTP layer - client of the relying party's verify endpoint
[UPDATE]: When the verify endpoint request or response shape changes
*/

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http::{ClientConfig, HttpClient, Result, SiwaError};
use crate::siwa::{SiwaMessage, SiwaVerifier, VerifyParams};
use crate::types::{Provider, VerificationResult};

/// POST body accepted by the verify endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    message: &'a SiwaMessage,
    signature: &'a str,
    address: &'a str,
    provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoded_transaction: Option<&'a str>,
}

/// Response body of the verify endpoint
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

/// Verifier backed by the relying party's HTTP verify endpoint
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: HttpClient,
    endpoint: String,
}

impl HttpVerifier {
    /// `endpoint_url` is the full URL of the verify route
    pub fn new(endpoint_url: &str, config: &ClientConfig) -> Result<Self> {
        let client = HttpClient::new(endpoint_url, config)?;
        let endpoint = client.base_url().path().to_string();
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SiwaVerifier for HttpVerifier {
    /// POST {endpoint}
    ///
    /// 200 means the signature verified, 400 means it did not, anything else
    /// is a failure of the verification call itself.
    async fn verify(&self, params: &VerifyParams) -> Result<VerificationResult> {
        let body = VerifyRequest {
            message: &params.message,
            signature: &params.signature,
            address: &params.address,
            provider: params.provider,
            encoded_transaction: params.carrier_transaction.as_deref(),
        };

        let builder = self.client.request(Method::POST, &self.endpoint)?.json(&body);
        let response = self.client.send(builder).await?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                let payload: VerifyResponse = response.json().await?;
                if payload.success {
                    info!(address = %params.address, "signature verified by endpoint");
                    Ok(VerificationResult::success())
                } else {
                    Ok(VerificationResult::failure(payload.message))
                }
            }
            StatusCode::BAD_REQUEST => {
                let payload: VerifyResponse = response.json().await?;
                warn!(address = %params.address, message = %payload.message, "endpoint rejected signature");
                Ok(VerificationResult::failure(payload.message))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SiwaError::Verification(format!(
                    "verify endpoint returned {}: {}",
                    status.as_u16(),
                    body
                )))
            }
        }
    }
}
