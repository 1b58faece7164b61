/*
[INPUT]:  Ed25519 public keys and textual account addresses
[OUTPUT]: Checksummed base32 addresses and decoded public keys
[POS]:    Codec layer - account identifier format
[UPDATE]: When the address checksum scheme changes
*/

use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha512_256};

use crate::http::{Result, SiwaError};

pub const PUBLIC_KEY_LENGTH: usize = 32;
const CHECKSUM_LENGTH: usize = 4;
const ADDRESS_LENGTH: usize = 58;

fn checksum(public_key: &[u8; PUBLIC_KEY_LENGTH]) -> [u8; CHECKSUM_LENGTH] {
    let digest = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
    out
}

/// Encode a public key as a 58-character account address
pub fn encode_address(public_key: &[u8; PUBLIC_KEY_LENGTH]) -> String {
    let mut bytes = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
    bytes.extend_from_slice(public_key);
    bytes.extend_from_slice(&checksum(public_key));
    BASE32_NOPAD.encode(&bytes)
}

/// Decode an account address back into its public key, validating the checksum
pub fn decode_address(address: &str) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    let address = address.trim();
    if address.len() != ADDRESS_LENGTH {
        return Err(SiwaError::InvalidAddress(format!(
            "expected {ADDRESS_LENGTH} characters, got {}",
            address.len()
        )));
    }

    let bytes = BASE32_NOPAD
        .decode(address.as_bytes())
        .map_err(|e| SiwaError::InvalidAddress(format!("invalid base32: {e}")))?;
    if bytes.len() != PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
        return Err(SiwaError::InvalidAddress(format!(
            "decoded length {} is not {}",
            bytes.len(),
            PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH
        )));
    }

    let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
    public_key.copy_from_slice(&bytes[..PUBLIC_KEY_LENGTH]);
    if bytes[PUBLIC_KEY_LENGTH..] != checksum(&public_key) {
        return Err(SiwaError::InvalidAddress("checksum mismatch".to_string()));
    }

    Ok(public_key)
}

pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Address of the all-zero public key
    const ZERO_ADDRESS: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn test_zero_key_address() {
        assert_eq!(encode_address(&[0u8; 32]), ZERO_ADDRESS);
        assert_eq!(decode_address(ZERO_ADDRESS).unwrap(), [0u8; 32]);
    }

    #[test]
    fn test_address_roundtrip() {
        let key = [7u8; 32];
        let address = encode_address(&key);
        assert_eq!(address.len(), 58);
        assert_eq!(decode_address(&address).unwrap(), key);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut address = encode_address(&[9u8; 32]);
        // flip the last character, which only carries checksum bits
        let last = address.pop().unwrap();
        address.push(if last == 'A' { 'B' } else { 'A' });
        let err = decode_address(&address).unwrap_err();
        assert!(matches!(err, SiwaError::InvalidAddress(_)));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!is_valid_address("ADDR1"));
    }
}
