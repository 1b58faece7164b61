/*
[INPUT]:  Relying-party settings, bound address, signing results
[OUTPUT]: Challenge records, prepared messages and the verifier seam
[POS]:    SIWA layer - boundary with the external SIWA message library
[UPDATE]: When the challenge format or verifier contract changes
*/

pub mod message;
pub mod verifier;

pub use message::{generate_nonce, ChallengeSettings, SiwaMessage};
pub use verifier::{MockVerifier, SiwaVerifier, VerifyParams};
