/*
[INPUT]:  HTTP client configuration, chain node and verify endpoints
[OUTPUT]: Typed responses from remote collaborators and the crate error type
[POS]:    HTTP layer - REST communication with the chain node and verifier
[UPDATE]: When adding endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod node;
pub mod verify;

pub use error::{ErrorKind, Result, SiwaError, StateError};

pub use client::{ClientConfig, HttpClient};
pub use node::{AlgodClient, ChainNode, MAINNET_NODE_URL};
pub use verify::HttpVerifier;
