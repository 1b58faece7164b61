/*
[INPUT]:  Wallet provider names and flow progress markers
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - closed enumerations of the sign-in flow
[UPDATE]: When adding wallet providers or flow states
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wallet integration used to sign in
///
/// Serialized names match the persisted `walletProvider` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Session-relay wallet that signs arbitrary bytes
    Pera,
    /// Session-relay wallet that only signs transactions
    Defly,
    /// Browser-injected wallet
    Kibisis,
    /// Page-embedded connector wallet
    Lute,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Pera,
        Provider::Defly,
        Provider::Kibisis,
        Provider::Lute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Pera => "Pera",
            Provider::Defly => "Defly",
            Provider::Kibisis => "Kibisis",
            Provider::Lute => "Lute",
        }
    }

    /// Wallets reached over a relay bridge, which support silent session resume
    pub fn is_session_relay(&self) -> bool {
        matches!(self, Provider::Pera | Provider::Defly)
    }

    /// Wallets that can only sign the challenge inside a carrier transaction
    pub fn needs_carrier_transaction(&self) -> bool {
        matches!(self, Provider::Defly | Provider::Lute)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pera" => Ok(Provider::Pera),
            "defly" => Ok(Provider::Defly),
            "kibisis" => Ok(Provider::Kibisis),
            "lute" => Ok(Provider::Lute),
            other => Err(format!("unknown wallet provider: {other}")),
        }
    }
}

/// Step of the sign-in flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    AwaitingConnection,
    AwaitingSignature,
    AwaitingVerification,
    Verified,
}

impl FlowState {
    /// Derive the flow state from what has actually been accomplished.
    ///
    /// Without a bound address nothing else counts, and a verification
    /// outcome only matters once credentials exist.
    pub fn derive(has_session: bool, has_credentials: bool, verified: bool) -> Self {
        match (has_session, has_credentials, verified) {
            (false, _, _) => FlowState::AwaitingConnection,
            (true, false, _) => FlowState::AwaitingSignature,
            (true, true, false) => FlowState::AwaitingVerification,
            (true, true, true) => FlowState::Verified,
        }
    }

    /// Zero-based step number
    pub fn step(&self) -> usize {
        match self {
            FlowState::AwaitingConnection => 0,
            FlowState::AwaitingSignature => 1,
            FlowState::AwaitingVerification => 2,
            FlowState::Verified => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FlowState::AwaitingConnection => "Connect Wallet",
            FlowState::AwaitingSignature => "Sign Message",
            FlowState::AwaitingVerification => "Verify Signature",
            FlowState::Verified => "Success",
        }
    }
}
