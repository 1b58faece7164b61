/*
[INPUT]:  Active session (provider + address) and optional storage medium
[OUTPUT]: Restored session or nothing; persisted walletProvider/address keys
[POS]:    Session layer - persistence contract used by the connection manager
[UPDATE]: When persisted keys change
*/

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::http::Result;
use crate::session::KeyValueStore;
use crate::types::{Provider, Session};

/// Storage key of the persisted provider
pub const PROVIDER_KEY: &str = "walletProvider";
/// Storage key of the persisted account address
pub const ADDRESS_KEY: &str = "address";

/// Persists the active session across restarts.
///
/// Without a storage medium every operation is a no-op and `load` returns
/// nothing. A partially persisted session is never surfaced.
#[derive(Clone, Default)]
pub struct SessionStore {
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    /// Store for execution contexts without persistent storage
    pub fn unavailable() -> Self {
        Self { storage: None }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    /// Load the persisted session, if both keys are present and valid
    pub fn load(&self) -> Option<Session> {
        let storage = self.storage.as_ref()?;

        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => {
                warn!(key, error = %err, "failed to read persisted session");
                None
            }
        };

        let provider = read(PROVIDER_KEY);
        let address = read(ADDRESS_KEY);

        match (provider, address) {
            (Some(provider), Some(address)) => match provider.parse::<Provider>() {
                Ok(provider) => Some(Session::new(address, provider)),
                Err(err) => {
                    warn!(error = %err, "ignoring persisted session with unknown provider");
                    None
                }
            },
            (None, None) => None,
            _ => {
                debug!("ignoring partially persisted session");
                None
            }
        }
    }

    /// Persist both session fields together
    pub fn save(&self, session: &Session) -> Result<()> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        storage.set_entries(&[
            (PROVIDER_KEY, session.provider.as_str()),
            (ADDRESS_KEY, session.address.as_str()),
        ])
    }

    /// Remove both session fields
    pub fn clear(&self) -> Result<()> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        storage.remove_entries(&[PROVIDER_KEY, ADDRESS_KEY])
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    fn store() -> (SessionStore, MemoryStore) {
        let memory = MemoryStore::new();
        (SessionStore::new(Arc::new(memory.clone())), memory)
    }

    #[test]
    fn test_save_then_load() {
        let (store, _) = store();
        let session = Session::new("ADDR1", Provider::Defly);
        store.save(&session).unwrap();
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn test_persisted_keys() {
        let (store, memory) = store();
        store.save(&Session::new("ADDR1", Provider::Lute)).unwrap();
        assert_eq!(memory.get(PROVIDER_KEY).unwrap(), Some("Lute".to_string()));
        assert_eq!(memory.get(ADDRESS_KEY).unwrap(), Some("ADDR1".to_string()));
    }

    #[test]
    fn test_partial_session_not_restored() {
        let (store, memory) = store();
        memory.set(ADDRESS_KEY, "ADDR1").unwrap();
        assert!(store.load().is_none());

        memory.remove(ADDRESS_KEY).unwrap();
        memory.set(PROVIDER_KEY, "Pera").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_unknown_provider_not_restored() {
        let (store, memory) = store();
        memory.set(PROVIDER_KEY, "MyAlgo").unwrap();
        memory.set(ADDRESS_KEY, "ADDR1").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clear() {
        let (store, memory) = store();
        store.save(&Session::new("ADDR1", Provider::Pera)).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        assert!(memory.is_empty());
    }

    #[test]
    fn test_unavailable_store_is_noop() {
        let store = SessionStore::unavailable();
        assert!(!store.is_available());
        store.save(&Session::new("ADDR1", Provider::Pera)).unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }
}
