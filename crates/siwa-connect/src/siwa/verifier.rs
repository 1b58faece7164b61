/*
[INPUT]:  Signed challenge, signature, address, provider, carrier transaction
[OUTPUT]: Verification outcome from the SIWA verifier
[POS]:    SIWA layer - verifier capability consumed by the flow controller
[UPDATE]: When the verifier contract changes
*/

use async_trait::async_trait;
use serde::Serialize;

use crate::http::Result;
use crate::siwa::SiwaMessage;
use crate::types::{Provider, VerificationResult};

/// Everything the verifier needs to check one signed challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyParams {
    pub message: SiwaMessage,
    /// Base64 signature
    pub signature: String,
    pub address: String,
    pub domain: String,
    pub provider: Provider,
    /// Base64 signed carrier transaction
    #[serde(rename = "encodedTransaction", skip_serializing_if = "Option::is_none")]
    pub carrier_transaction: Option<String>,
}

/// External SIWA verification capability
///
/// Returns `Ok` with a failed outcome when the signature does not validate,
/// and `Err` when verification itself could not run.
#[async_trait]
pub trait SiwaVerifier: Send + Sync {
    async fn verify(&self, params: &VerifyParams) -> Result<VerificationResult>;
}

/// Verifier with a predetermined outcome, for tests
#[derive(Debug, Clone)]
pub struct MockVerifier {
    outcome: VerificationResult,
}

impl MockVerifier {
    pub fn new(outcome: VerificationResult) -> Self {
        Self { outcome }
    }

    pub fn accepting() -> Self {
        Self::new(VerificationResult::success())
    }

    pub fn rejecting(error: &str) -> Self {
        Self::new(VerificationResult::failure(error))
    }
}

#[async_trait]
impl SiwaVerifier for MockVerifier {
    async fn verify(&self, _params: &VerifyParams) -> Result<VerificationResult> {
        Ok(self.outcome.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VerifyParams {
        VerifyParams {
            message: SiwaMessage {
                domain: "example.com".to_string(),
                address: "ADDR1".to_string(),
                statement: None,
                uri: "https://example.com".to_string(),
                version: "1".to_string(),
                chain_id: 416001,
                nonce: "abcdefgh12345678x".to_string(),
                issued_at: None,
            },
            signature: "c2ln".to_string(),
            address: "ADDR1".to_string(),
            domain: "example.com".to_string(),
            provider: Provider::Defly,
            carrier_transaction: Some("dHhu".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mock_verifier() {
        let accepted = MockVerifier::accepting().verify(&params()).await.unwrap();
        assert!(accepted.success);

        let rejected = MockVerifier::rejecting("Invalid signature")
            .verify(&params())
            .await
            .unwrap();
        assert!(!rejected.success);
    }

    #[test]
    fn test_verify_params_json() {
        let value = serde_json::to_value(params()).unwrap();
        assert_eq!(value["encodedTransaction"], "dHhu");
        assert_eq!(value["provider"], "Defly");
        assert_eq!(value["message"]["chainId"], 416001);
    }
}
