/*
[INPUT]:  Optional 32-byte Ed25519 seed
[OUTPUT]: In-process wallet speaking every wallet client protocol
[POS]:    Wallet layer - local keypair wallet for the CLI and tests
[UPDATE]: When a wallet client trait gains methods
*/

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use tracing::{debug, info};

use crate::codec::{encode_address, encode_signed_transaction, PaymentTransaction};
use crate::http::{Result, SiwaError};
use crate::wallet::{
    DataSigningRelay, DisconnectListener, EmbeddedConnector, EnableResult, InjectedAccount,
    InjectedWalletObject, RelaySession, SignBytesResult, SignDataRequest, SignerTransaction,
    TransactionSigningRelay, WalletTransaction,
};

/// Wallet holding an Ed25519 keypair in process memory.
///
/// Approves every request for its own address and refuses anything addressed
/// to another account.
pub struct LocalWallet {
    signing_key: SigningKey,
    address: String,
    session_ended: AtomicBool,
    listener: Mutex<Option<DisconnectListener>>,
}

impl LocalWallet {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::with_key(SigningKey::generate(&mut OsRng))
    }

    /// Create a wallet from existing seed bytes (32 bytes)
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::with_key(SigningKey::from_bytes(seed))
    }

    fn with_key(signing_key: SigningKey) -> Self {
        let address = encode_address(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
            session_ended: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Verify a raw signature against a message
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.signing_key
            .verifying_key()
            .verify(message, &signature)
            .is_ok()
    }

    /// End the session from the wallet side, firing the disconnect listener
    pub fn drop_session(&self) {
        self.session_ended.store(true, Ordering::SeqCst);
        let listener = self.listener.lock().ok().and_then(|guard| guard.clone());
        info!(address = %self.address, "local wallet dropped its session");
        if let Some(listener) = listener {
            listener();
        }
    }

    fn sign_raw(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    fn ensure_signer(&self, signer: &str) -> Result<()> {
        if signer == self.address {
            Ok(())
        } else {
            Err(SiwaError::Signing(format!(
                "signer {signer} is not held by this wallet"
            )))
        }
    }

    fn sign_unsigned_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>> {
        let txn = PaymentTransaction::decode(unsigned)?;
        if txn.sender != self.public_key_bytes() {
            return Err(SiwaError::Signing(
                "transaction sender is not held by this wallet".to_string(),
            ));
        }
        let signature = self.sign_raw(&txn.bytes_to_sign()?);
        encode_signed_transaction(unsigned, &signature)
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("session_ended", &self.session_ended.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RelaySession for LocalWallet {
    async fn connect(&self) -> Result<Vec<String>> {
        self.session_ended.store(false, Ordering::SeqCst);
        Ok(vec![self.address.clone()])
    }

    async fn reconnect_session(&self) -> Result<Vec<String>> {
        if self.session_ended.load(Ordering::SeqCst) {
            return Err(SiwaError::Connection("wallet session has ended".to_string()));
        }
        Ok(vec![self.address.clone()])
    }

    async fn disconnect(&self) -> Result<()> {
        self.session_ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_disconnect_listener(&self, listener: DisconnectListener) {
        if let Ok(mut guard) = self.listener.lock() {
            *guard = Some(listener);
        }
    }

    fn clear_disconnect_listener(&self) {
        if let Ok(mut guard) = self.listener.lock() {
            guard.take();
        }
    }
}

#[async_trait]
impl DataSigningRelay for LocalWallet {
    async fn sign_data(&self, requests: &[SignDataRequest], signer: &str) -> Result<Vec<Vec<u8>>> {
        self.ensure_signer(signer)?;
        debug!(count = requests.len(), "signing data requests");
        Ok(requests
            .iter()
            .map(|request| self.sign_raw(&request.data))
            .collect())
    }
}

#[async_trait]
impl TransactionSigningRelay for LocalWallet {
    async fn sign_transaction(&self, groups: &[Vec<SignerTransaction>]) -> Result<Vec<Vec<u8>>> {
        let mut signed = Vec::new();
        for txn in groups.iter().flatten() {
            for signer in &txn.signers {
                self.ensure_signer(signer)?;
            }
            signed.push(self.sign_unsigned_transaction(&txn.txn)?);
        }
        Ok(signed)
    }
}

#[async_trait]
impl InjectedWalletObject for LocalWallet {
    async fn enable(&self, wallet_id: &str) -> Result<EnableResult> {
        debug!(%wallet_id, "enable requested");
        Ok(EnableResult {
            accounts: vec![InjectedAccount {
                address: self.address.clone(),
                name: Some("local".to_string()),
            }],
        })
    }

    async fn sign_bytes(&self, data: &[u8]) -> Result<SignBytesResult> {
        Ok(SignBytesResult {
            signature: Some(self.sign_raw(data)),
        })
    }
}

#[async_trait]
impl EmbeddedConnector for LocalWallet {
    async fn connect(&self, genesis_id: &str) -> Result<Vec<String>> {
        debug!(%genesis_id, "connector connect requested");
        Ok(vec![self.address.clone()])
    }

    async fn sign_txns(&self, txns: &[WalletTransaction]) -> Result<Vec<Option<Vec<u8>>>> {
        txns.iter()
            .map(|txn| {
                let unsigned = BASE64
                    .decode(&txn.txn)
                    .map_err(|err| SiwaError::Signing(format!("invalid base64 transaction: {err}")))?;
                self.sign_unsigned_transaction(&unsigned).map(Some)
            })
            .collect()
    }
}
