/*
[INPUT]:  Signing adapters (one per provider) and the session store
[OUTPUT]: Active session, loading state, signing results
[POS]:    Connection layer - owns the wallet connection lifecycle
[UPDATE]: When connect/disconnect semantics or session drop routing change
*/

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{encode_challenge, shorten_address};
use crate::http::{Result, SiwaError, StateError};
use crate::session::SessionStore;
use crate::types::{Provider, Session, SigningResult};
use crate::wallet::{DropNotifier, SigningAdapter};

#[derive(Debug, Default)]
struct ManagerState {
    session: Option<Session>,
    in_flight: usize,
    pending_provider: Option<Provider>,
    /// Bumped by every disconnect; results started under an older value are stale
    generation: u64,
}

/// Owns the connection lifecycle and dispatches to the active provider's adapter.
///
/// The in-memory session mirrors the persisted one: connect writes the store
/// before the mirror, disconnect clears both together.
pub struct WalletConnectionManager {
    adapters: HashMap<Provider, Arc<dyn SigningAdapter>>,
    store: SessionStore,
    state: RwLock<ManagerState>,
    drop_tx: mpsc::UnboundedSender<Provider>,
    drop_rx: Mutex<Option<mpsc::UnboundedReceiver<Provider>>>,
}

/// Keeps the loading flag raised while an operation is outstanding
struct InFlight<'a> {
    manager: &'a WalletConnectionManager,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.manager.write_state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            state.pending_provider = None;
        }
    }
}

impl WalletConnectionManager {
    /// Later adapters replace earlier ones registered for the same provider
    pub fn new(adapters: Vec<Arc<dyn SigningAdapter>>, store: SessionStore) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.provider(), adapter))
            .collect();
        let (drop_tx, drop_rx) = mpsc::unbounded_channel();

        Self {
            adapters,
            store,
            state: RwLock::new(ManagerState::default()),
            drop_tx,
            drop_rx: Mutex::new(Some(drop_rx)),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the loading flag for `provider`; returns the guard and current generation
    fn begin(&self, provider: Provider) -> (InFlight<'_>, u64) {
        let mut state = self.write_state();
        state.in_flight += 1;
        state.pending_provider = Some(provider);
        (InFlight { manager: self }, state.generation)
    }

    fn adapter(&self, provider: Provider) -> Result<Arc<dyn SigningAdapter>> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| StateError::UnsupportedProvider(provider).into())
    }

    /// Providers with a registered adapter
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.adapters.contains_key(provider))
            .collect()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn session(&self) -> Option<Session> {
        self.read_state().session.clone()
    }

    pub fn address(&self) -> Option<String> {
        self.read_state()
            .session
            .as_ref()
            .map(|session| session.address.clone())
    }

    pub fn provider(&self) -> Option<Provider> {
        self.read_state().session.as_ref().map(|session| session.provider)
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().in_flight > 0
    }

    /// Provider whose connect is outstanding
    pub fn pending_provider(&self) -> Option<Provider> {
        self.read_state().pending_provider
    }

    /// Whether `provider`'s control should show a busy indicator
    pub fn is_busy(&self, provider: Provider) -> bool {
        let state = self.read_state();
        state.in_flight > 0 && state.pending_provider == Some(provider)
    }

    pub fn generation(&self) -> u64 {
        self.read_state().generation
    }

    /// Connect through `provider`'s adapter and persist the resulting session.
    ///
    /// Fails with `AlreadyConnected` while a session exists; switching
    /// providers takes a disconnect first. Fails with `Cancelled` when a
    /// disconnect happened while the wallet was still deciding; the session
    /// is left untouched in that case.
    pub async fn connect(&self, provider: Provider) -> Result<Session> {
        let adapter = self.adapter(provider)?;
        if let Some(active) = self.provider() {
            return Err(StateError::AlreadyConnected(active).into());
        }
        let (_in_flight, generation) = self.begin(provider);
        info!(%provider, "connecting wallet");

        let address = adapter.connect().await.inspect_err(|err| {
            warn!(%provider, error = %err, "wallet connect failed");
        })?;
        let session = Session::new(address, provider);

        let committed = {
            let mut state = self.write_state();
            if state.generation != generation {
                debug!(%provider, "discarding connect result after disconnect");
                return Err(SiwaError::Cancelled);
            }
            self.store
                .save(&session)
                .map(|()| state.session.replace(session.clone()))
        };
        let replaced = match committed {
            Ok(replaced) => replaced,
            Err(err) => {
                warn!(%provider, error = %err, "failed to persist session");
                release(provider, adapter.as_ref()).await;
                return Err(err);
            }
        };

        // an overlapping connect to another wallet resolved first
        if let Some(previous) = replaced.filter(|previous| previous.provider != provider) {
            info!(provider = %previous.provider, "replaced by a later connect");
            if let Some(previous_adapter) = self.adapters.get(&previous.provider) {
                release(previous.provider, previous_adapter.as_ref()).await;
            }
        }

        adapter.on_session_dropped(DropNotifier::new(provider, self.drop_tx.clone()));
        info!(%provider, address = %shorten_address(&session.address, 4), "wallet connected");
        Ok(session)
    }

    /// Clear the session and tear down the active adapter.
    ///
    /// Never fails; adapter and storage errors are logged. Any connect or sign
    /// still outstanding will resolve as `Cancelled`.
    pub async fn disconnect(&self) {
        let previous = {
            let mut state = self.write_state();
            state.generation += 1;
            if let Err(err) = self.store.clear() {
                warn!(error = %err, "failed to clear persisted session");
            }
            state.session.take()
        };

        let Some(session) = previous else {
            debug!("disconnect without an active session");
            return;
        };

        if let Some(adapter) = self.adapters.get(&session.provider) {
            release(session.provider, adapter.as_ref()).await;
        }
        info!(provider = %session.provider, "wallet disconnected");
    }

    /// Restore the persisted session at startup.
    ///
    /// Relay wallets must resume their remote session silently; any failure
    /// is handled like an explicit disconnect.
    pub async fn reconnect_session(&self) -> Option<Session> {
        let stored = self.store.load()?;
        let provider = stored.provider;

        let adapter = match self.adapter(provider) {
            Ok(adapter) => adapter,
            Err(err) => {
                warn!(%provider, error = %err, "cannot restore persisted session");
                self.disconnect().await;
                return None;
            }
        };

        let (in_flight, generation) = self.begin(provider);
        if provider.is_session_relay() {
            if let Err(err) = adapter.resume().await {
                warn!(%provider, error = %err, "silent session resume failed");
                drop(in_flight);
                // the session was never mirrored, so disconnect alone would skip the wallet
                release(provider, adapter.as_ref()).await;
                self.disconnect().await;
                return None;
            }
        }
        drop(in_flight);

        {
            let mut state = self.write_state();
            if state.generation != generation {
                debug!(%provider, "discarding resumed session after disconnect");
                return None;
            }
            state.session = Some(stored.clone());
        }

        adapter.on_session_dropped(DropNotifier::new(provider, self.drop_tx.clone()));
        info!(%provider, address = %shorten_address(&stored.address, 4), "session restored");
        Some(stored)
    }

    /// Encode `message` and have the active provider sign it
    pub async fn sign_message(&self, message: &str) -> Result<SigningResult> {
        let (session, generation) = {
            let state = self.read_state();
            (state.session.clone(), state.generation)
        };
        let session = session
            .filter(|session| !session.address.is_empty())
            .ok_or(StateError::NoAddressConnected)?;
        let adapter = self.adapter(session.provider)?;

        let encoded = encode_challenge(message);
        debug!(provider = %session.provider, bytes = encoded.len(), "requesting signature");

        let result = adapter.sign(&encoded, &session.address).await?;

        if self.generation() != generation {
            debug!(provider = %session.provider, "discarding signature after disconnect");
            return Err(SiwaError::Cancelled);
        }
        if result.signature.is_empty() {
            return Err(SiwaError::Signing("wallet returned an empty signature".to_string()));
        }
        Ok(result)
    }

    /// Route a wallet-initiated session end into `disconnect`
    pub async fn handle_session_dropped(&self, provider: Provider) {
        if self.provider() != Some(provider) {
            debug!(%provider, "ignoring drop from inactive provider");
            return;
        }
        info!(%provider, "wallet ended the session");
        self.disconnect().await;
    }

    /// Spawn the task that forwards session drops to `handle_session_dropped`.
    ///
    /// Returns `None` if the watcher was already started.
    pub fn watch_session_drops(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self
            .drop_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let manager = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            while let Some(provider) = rx.recv().await {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.handle_session_dropped(provider).await;
            }
        }))
    }
}

/// Best-effort wallet teardown; failures are only logged
async fn release(provider: Provider, adapter: &dyn SigningAdapter) {
    if let Err(err) = adapter.disconnect().await {
        warn!(%provider, error = %err, "wallet disconnect failed");
    }
}

impl fmt::Debug for WalletConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("WalletConnectionManager")
            .field("providers", &self.providers())
            .field("session", &state.session)
            .field("in_flight", &state.in_flight)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}
