/*
[INPUT]:  Prepared SIWA challenge text
[OUTPUT]: Byte payloads each wallet signs
[POS]:    Codec layer - challenge encoding
[UPDATE]: When a wallet's domain-separation convention changes
*/

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Marker the injected wallet expects in front of arbitrary signed bytes
pub const INJECTED_MAGIC_PREFIX: &[u8; 2] = b"MX";

/// Encode a prepared challenge into the bytes handed to every adapter.
///
/// The payload is the UTF-8 JSON string literal of the message, quotes and
/// escapes included. Verifiers recompute the same bytes, so this must stay
/// bit-exact.
pub fn encode_challenge(message: &str) -> Vec<u8> {
    serde_json::Value::String(message.to_owned())
        .to_string()
        .into_bytes()
}

/// Bytes the injected wallet is asked to sign
pub fn injected_sign_payload(encoded_challenge: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(INJECTED_MAGIC_PREFIX.len() + encoded_challenge.len());
    payload.extend_from_slice(INJECTED_MAGIC_PREFIX);
    payload.extend_from_slice(encoded_challenge);
    payload
}

/// Standard padded base64, the form credentials carry signatures in
pub fn signature_to_base64(signature: &[u8]) -> String {
    BASE64.encode(signature)
}

/// Shorten an address for display: first and last `chars` characters
pub fn shorten_address(address: &str, chars: usize) -> String {
    let count = address.chars().count();
    if count <= chars * 2 {
        return address.to_string();
    }
    let head: String = address.chars().take(chars).collect();
    let tail: String = address.chars().skip(count - chars).collect();
    format!("{head}...{tail}")
}
