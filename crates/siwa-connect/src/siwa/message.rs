/*
[INPUT]:  Domain, URI, statement, chain id and the connected address
[OUTPUT]: Challenge records with fresh nonces and their signable text
[POS]:    SIWA layer - challenge construction
[UPDATE]: When the SIWA text format changes
*/

use chrono::{SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

const NONCE_LENGTH: usize = 17;

/// Fresh random alphanumeric nonce
pub fn generate_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Unsigned Sign-In with Algorand challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiwaMessage {
    pub domain: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
}

impl SiwaMessage {
    /// Canonical text the wallet is asked to sign
    pub fn prepare_message(&self) -> String {
        let mut text = format!(
            "{} wants you to sign in with your Algorand account:\n{}\n\n",
            self.domain, self.address
        );
        if let Some(statement) = &self.statement {
            text.push_str(statement);
            text.push_str("\n\n");
        }
        text.push_str(&format!("URI: {}\n", self.uri));
        text.push_str(&format!("Version: {}\n", self.version));
        text.push_str(&format!("Chain ID: {}\n", self.chain_id));
        text.push_str(&format!("Nonce: {}", self.nonce));
        if let Some(issued_at) = &self.issued_at {
            text.push_str(&format!("\nIssued At: {issued_at}"));
        }
        text
    }
}

/// Relying-party fields shared by every challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeSettings {
    pub domain: String,
    pub uri: String,
    pub statement: Option<String>,
    pub version: String,
    pub chain_id: u64,
}

impl ChallengeSettings {
    /// Build a new challenge for `address`; every call draws a new nonce
    pub fn issue(&self, address: &str) -> SiwaMessage {
        SiwaMessage {
            domain: self.domain.clone(),
            address: address.to_string(),
            statement: self.statement.clone(),
            uri: self.uri.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            nonce: generate_nonce(),
            issued_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ChallengeSettings {
        ChallengeSettings {
            domain: "example.com".to_string(),
            uri: "https://example.com".to_string(),
            statement: Some("Sign in with Algorand to the app.".to_string()),
            version: "1".to_string(),
            chain_id: 416001,
        }
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LENGTH);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_each_challenge_gets_new_nonce() {
        let settings = settings();
        let first = settings.issue("ADDR1");
        let second = settings.issue("ADDR1");
        assert_ne!(first.nonce, second.nonce);
    }

    #[test]
    fn test_prepare_message_format() {
        let message = SiwaMessage {
            domain: "example.com".to_string(),
            address: "ADDR1".to_string(),
            statement: Some("Sign in with Algorand to the app.".to_string()),
            uri: "https://example.com".to_string(),
            version: "1".to_string(),
            chain_id: 416001,
            nonce: "abcdefgh12345678x".to_string(),
            issued_at: Some("2024-01-01T00:00:00.000Z".to_string()),
        };

        assert_eq!(
            message.prepare_message(),
            "example.com wants you to sign in with your Algorand account:\n\
             ADDR1\n\
             \n\
             Sign in with Algorand to the app.\n\
             \n\
             URI: https://example.com\n\
             Version: 1\n\
             Chain ID: 416001\n\
             Nonce: abcdefgh12345678x\n\
             Issued At: 2024-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_prepare_message_without_statement() {
        let mut message = settings().issue("ADDR1");
        message.statement = None;
        message.issued_at = None;
        let text = message.prepare_message();
        assert!(text.contains("ADDR1\n\nURI: https://example.com"));
        assert!(text.ends_with(&format!("Nonce: {}", message.nonce)));
    }

    #[test]
    fn test_serialized_field_names() {
        let message = settings().issue("ADDR1");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["chainId"], 416001);
        assert!(value["issuedAt"].is_string());

        let parsed: SiwaMessage = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, message);
    }
}
