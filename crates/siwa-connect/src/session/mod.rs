/*
[INPUT]:  Client-side key/value storage medium (optional)
[OUTPUT]: Persisted and restored wallet sessions
[POS]:    Session layer - survives restarts, drives silent reconnect
[UPDATE]: When persisted keys or storage backends change
*/

pub mod storage;
pub mod store;

pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{SessionStore, ADDRESS_KEY, PROVIDER_KEY};
