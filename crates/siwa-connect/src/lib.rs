/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Sign-In with Algorand client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod codec;
pub mod config;
pub mod flow;
pub mod http;
pub mod manager;
pub mod session;
pub mod siwa;
pub mod types;
pub mod wallet;

pub use config::SiwaConfig;
pub use flow::{FlowError, SiwaFlowController};
pub use manager::WalletConnectionManager;

// Re-export commonly used types from http
pub use http::{
    AlgodClient,
    ChainNode,
    ClientConfig,
    ErrorKind,
    HttpVerifier,
    Result,
    SiwaError,
    StateError,
};

// Re-export commonly used types from session
pub use session::{
    JsonFileStore,
    KeyValueStore,
    MemoryStore,
    SessionStore,
};

// Re-export commonly used types from siwa
pub use siwa::{
    ChallengeSettings,
    MockVerifier,
    SiwaMessage,
    SiwaVerifier,
    VerifyParams,
};

// Re-export all types
pub use types::*;

// Re-export wallet adapters
pub use wallet::{
    DeflyAdapter,
    DropNotifier,
    KibisisAdapter,
    LocalWallet,
    LuteAdapter,
    PeraAdapter,
    SigningAdapter,
};
