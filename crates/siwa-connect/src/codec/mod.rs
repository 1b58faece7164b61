/*
[INPUT]:  Prepared challenge messages, account addresses, suggested params
[OUTPUT]: Deterministic byte encodings handed to wallets and decoded signatures
[POS]:    Codec layer - everything byte-exact between the flow and the wallets
[UPDATE]: When a wallet's signing payload convention changes
*/

pub mod address;
pub mod message;
pub mod transaction;

pub use address::{decode_address, encode_address, is_valid_address};
pub use message::{
    encode_challenge, injected_sign_payload, shorten_address, signature_to_base64,
    INJECTED_MAGIC_PREFIX,
};
pub use transaction::{
    decode_signed_transaction, encode_signed_transaction, PaymentTransaction, SignedTransaction,
    SIGNATURE_LENGTH,
};
