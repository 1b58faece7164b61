/*
[INPUT]:  Wallet results, chain node responses, verifier outcomes
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - records passed between sign-in components
[UPDATE]: When the data model changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::Provider;

/// Account bound to a wallet provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: String,
    pub provider: Provider,
}

impl Session {
    pub fn new(address: impl Into<String>, provider: Provider) -> Self {
        Self {
            address: address.into(),
            provider,
        }
    }
}

/// Normalized output of every signing adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningResult {
    /// Raw signature bytes
    pub signature: Vec<u8>,
    /// Signed carrier transaction, for wallets that cannot sign bytes directly
    pub carrier_transaction: Option<Vec<u8>>,
}

impl SigningResult {
    pub fn direct(signature: Vec<u8>) -> Self {
        Self {
            signature,
            carrier_transaction: None,
        }
    }

    pub fn with_carrier(signature: Vec<u8>, carrier_transaction: Vec<u8>) -> Self {
        Self {
            signature,
            carrier_transaction: Some(carrier_transaction),
        }
    }
}

/// Bundle submitted for verification after a successful sign step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// JSON form of the signed challenge record
    pub serialized_challenge: String,
    /// Base64 signed carrier transaction
    pub carrier_transaction: Option<String>,
    pub provider: Provider,
    /// Base64 signature
    pub signature: String,
    pub address: String,
}

/// Suggested transaction parameters from the chain node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedParams {
    /// Fee per byte in microalgos, or the total fee when `flat_fee` is set
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_round: u64,
    pub last_round: u64,
    pub genesis_id: String,
    /// Base64 genesis hash
    pub genesis_hash: String,
}

/// Outcome reported by the SIWA verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_json_shape() {
        let credentials = Credentials {
            serialized_challenge: "{}".to_string(),
            carrier_transaction: None,
            provider: Provider::Pera,
            signature: "c2ln".to_string(),
            address: "ADDR1".to_string(),
        };

        let value = serde_json::to_value(&credentials).unwrap();
        assert_eq!(value["serializedChallenge"], "{}");
        assert_eq!(value["carrierTransaction"], serde_json::Value::Null);
        assert_eq!(value["provider"], "Pera");
        assert_eq!(value["address"], "ADDR1");
    }

    #[test]
    fn test_verification_result_failure() {
        let result = VerificationResult::failure("Invalid signature");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Invalid signature"));

        let parsed: VerificationResult = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(parsed, VerificationResult::success());
    }
}
