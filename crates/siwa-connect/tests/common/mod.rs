/*
[INPUT]:  Test scenarios needing controllable wallets and chain nodes
[OUTPUT]: Shared test utilities, scripted adapters and fixtures
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for siwa-connect tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use siwa_connect::{
    ChainNode, ChallengeSettings, DeflyAdapter, DropNotifier, KibisisAdapter, LocalWallet,
    LuteAdapter, MemoryStore, PeraAdapter, Provider, Result, SessionStore, SigningAdapter,
    SigningResult, SiwaError, SuggestedParams, WalletConnectionManager,
};
use tokio::sync::Notify;

/// Testnet genesis hash
pub const TESTNET_GENESIS_HASH: &str = "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=";

/// Deterministic wallet for `n`
pub fn local_wallet(n: u8) -> Arc<LocalWallet> {
    Arc::new(LocalWallet::from_seed(&[n; 32]))
}

pub fn challenge_settings() -> ChallengeSettings {
    ChallengeSettings {
        domain: "localhost:3000".to_string(),
        uri: "http://localhost:3000".to_string(),
        statement: Some("Sign in with Algorand to the app.".to_string()),
        version: "1".to_string(),
        chain_id: 416001,
    }
}

/// Session store over a shared in-memory medium
pub fn memory_store() -> (SessionStore, MemoryStore) {
    let memory = MemoryStore::new();
    (SessionStore::new(Arc::new(memory.clone())), memory)
}

/// Chain node answering with fixed testnet parameters
#[derive(Debug, Default)]
pub struct FixedNode;

#[async_trait]
impl ChainNode for FixedNode {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        Ok(SuggestedParams {
            fee: 0,
            min_fee: 1000,
            flat_fee: false,
            first_round: 100,
            last_round: 1100,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: TESTNET_GENESIS_HASH.to_string(),
        })
    }

    async fn genesis_fingerprint(&self) -> Result<String> {
        Ok("testnet-v1.0".to_string())
    }
}

/// All four real adapters, each backed by `wallet`
pub fn local_adapters(wallet: &Arc<LocalWallet>) -> Vec<Arc<dyn SigningAdapter>> {
    let node: Arc<dyn ChainNode> = Arc::new(FixedNode);
    vec![
        Arc::new(PeraAdapter::new(wallet.clone())),
        Arc::new(DeflyAdapter::new(wallet.clone(), node.clone())),
        Arc::new(KibisisAdapter::new(Some(wallet.clone()))),
        Arc::new(LuteAdapter::new(Some(wallet.clone()), node)),
    ]
}

/// Adapter whose behavior each test scripts
pub struct ScriptedAdapter {
    provider: Provider,
    address: String,
    gate: Option<Arc<Notify>>,
    reject_connect: bool,
    fail_resume: bool,
    fail_disconnect: AtomicBool,
    disconnect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    notifier: Mutex<Option<DropNotifier>>,
}

impl ScriptedAdapter {
    pub fn new(provider: Provider, address: &str) -> Self {
        Self {
            provider,
            address: address.to_string(),
            gate: None,
            reject_connect: false,
            fail_resume: false,
            fail_disconnect: AtomicBool::new(false),
            disconnect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            notifier: Mutex::new(None),
        }
    }

    /// Hold connect and sign until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn rejecting_connect(mut self) -> Self {
        self.reject_connect = true;
        self
    }

    pub fn failing_resume(mut self) -> Self {
        self.fail_resume = true;
        self
    }

    pub fn failing_disconnect(self) -> Self {
        self.fail_disconnect.store(true, Ordering::SeqCst);
        self
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Sign requests received so far, counted before the gate
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Simulate the wallet ending the session on its own
    pub fn drop_session(&self) {
        if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
            notifier.notify();
        }
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl SigningAdapter for ScriptedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn connect(&self) -> Result<String> {
        self.wait_gate().await;
        if self.reject_connect {
            return Err(SiwaError::Connection("User rejected the request".to_string()));
        }
        Ok(self.address.clone())
    }

    async fn resume(&self) -> Result<()> {
        if self.fail_resume {
            return Err(SiwaError::Connection("session expired".to_string()));
        }
        Ok(())
    }

    async fn sign(&self, _encoded_challenge: &[u8], _address: &str) -> Result<SigningResult> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        Ok(SigningResult::direct(vec![7u8; 64]))
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(SiwaError::Connection("bridge unreachable".to_string()));
        }
        Ok(())
    }

    fn on_session_dropped(&self, notifier: DropNotifier) {
        *self.notifier.lock().unwrap() = Some(notifier);
    }
}

/// Manager over the given adapters and a fresh in-memory store
pub fn manager_with(adapters: Vec<Arc<dyn SigningAdapter>>) -> (Arc<WalletConnectionManager>, MemoryStore) {
    let (store, memory) = memory_store();
    (Arc::new(WalletConnectionManager::new(adapters, store)), memory)
}

/// Yield until `condition` holds
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
