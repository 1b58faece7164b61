/*
[INPUT]:  Signing address, encoded challenge, suggested transaction params
[OUTPUT]: Canonical msgpack carrier transactions and extracted signatures
[POS]:    Codec layer - zero-amount self-payment used as a signing vehicle
[UPDATE]: When the transaction wire format or fee estimation changes
*/

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rmpv::Value;

use crate::codec::address::{decode_address, PUBLIC_KEY_LENGTH};
use crate::http::{Result, SiwaError};
use crate::types::SuggestedParams;

/// Size of an Ed25519 signature
pub const SIGNATURE_LENGTH: usize = 64;

/// Domain-separation tag wallets prepend before signing a transaction
const TRANSACTION_TAG: &[u8; 2] = b"TX";
/// Bytes a signature adds to the encoded transaction, used for fee estimation
const SIGNATURE_SIZE_OVERHEAD: u64 = 75;
const DEFAULT_MIN_FEE: u64 = 1000;
const PAYMENT_TYPE: &str = "pay";

/// Payment transaction in the subset of fields a carrier transaction uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    pub sender: [u8; PUBLIC_KEY_LENGTH],
    pub receiver: [u8; PUBLIC_KEY_LENGTH],
    pub amount: u64,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub note: Vec<u8>,
}

impl PaymentTransaction {
    /// Build a zero-amount payment from `address` to itself carrying `note`
    pub fn zero_self_payment(
        address: &str,
        note: Vec<u8>,
        params: &SuggestedParams,
    ) -> Result<Self> {
        let account = decode_address(address)?;
        let genesis_hash = decode_genesis_hash(&params.genesis_hash)?;

        let mut txn = Self {
            sender: account,
            receiver: account,
            amount: 0,
            fee: params.fee,
            first_valid: params.first_round,
            last_valid: params.last_round,
            genesis_id: params.genesis_id.clone(),
            genesis_hash,
            note,
        };

        if !params.flat_fee {
            let estimated_size = txn.encode()?.len() as u64 + SIGNATURE_SIZE_OVERHEAD;
            let min_fee = if params.min_fee == 0 {
                DEFAULT_MIN_FEE
            } else {
                params.min_fee
            };
            txn.fee = params.fee.saturating_mul(estimated_size).max(min_fee);
        }

        Ok(txn)
    }

    /// Canonical encoding: keys sorted, zero values omitted
    pub fn encode(&self) -> Result<Vec<u8>> {
        write_value(&self.to_value())
    }

    /// Bytes a wallet signs for this transaction
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>> {
        let encoded = self.encode()?;
        let mut bytes = Vec::with_capacity(TRANSACTION_TAG.len() + encoded.len());
        bytes.extend_from_slice(TRANSACTION_TAG);
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }

    /// Decode an unsigned transaction encoding
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = read_value(bytes)?;
        Self::from_value(&value)
    }

    fn to_value(&self) -> Value {
        // pushed in sorted key order
        let mut fields: Vec<(&str, Value)> = Vec::with_capacity(10);
        if self.amount != 0 {
            fields.push(("amt", Value::from(self.amount)));
        }
        if self.fee != 0 {
            fields.push(("fee", Value::from(self.fee)));
        }
        if self.first_valid != 0 {
            fields.push(("fv", Value::from(self.first_valid)));
        }
        if !self.genesis_id.is_empty() {
            fields.push(("gen", Value::from(self.genesis_id.as_str())));
        }
        fields.push(("gh", Value::Binary(self.genesis_hash.to_vec())));
        if self.last_valid != 0 {
            fields.push(("lv", Value::from(self.last_valid)));
        }
        if !self.note.is_empty() {
            fields.push(("note", Value::Binary(self.note.clone())));
        }
        if self.receiver != [0u8; PUBLIC_KEY_LENGTH] {
            fields.push(("rcv", Value::Binary(self.receiver.to_vec())));
        }
        fields.push(("snd", Value::Binary(self.sender.to_vec())));
        fields.push(("type", Value::from(PAYMENT_TYPE)));

        Value::Map(
            fields
                .into_iter()
                .map(|(key, value)| (Value::from(key), value))
                .collect(),
        )
    }

    fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| malformed("transaction is not a map"))?;

        let kind = map_field(map, "type").and_then(Value::as_str);
        if kind != Some(PAYMENT_TYPE) {
            return Err(malformed("not a payment transaction"));
        }

        let sender = map_field(map, "snd")
            .and_then(binary)
            .ok_or_else(|| malformed("missing sender"))
            .and_then(|bytes| fixed::<PUBLIC_KEY_LENGTH>(bytes, "sender"))?;
        let receiver = match map_field(map, "rcv").and_then(binary) {
            Some(bytes) => fixed::<PUBLIC_KEY_LENGTH>(bytes, "receiver")?,
            None => [0u8; PUBLIC_KEY_LENGTH],
        };
        let genesis_hash = map_field(map, "gh")
            .and_then(binary)
            .ok_or_else(|| malformed("missing genesis hash"))
            .and_then(|bytes| fixed::<32>(bytes, "genesis hash"))?;

        Ok(Self {
            sender,
            receiver,
            amount: uint_field(map, "amt"),
            fee: uint_field(map, "fee"),
            first_valid: uint_field(map, "fv"),
            last_valid: uint_field(map, "lv"),
            genesis_id: map_field(map, "gen")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            genesis_hash,
            note: map_field(map, "note")
                .and_then(binary)
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
        })
    }
}

/// Signature and transaction recovered from a signed transaction blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signature: Vec<u8>,
    pub transaction: PaymentTransaction,
}

/// Wrap an unsigned encoding and its signature into a signed transaction blob
pub fn encode_signed_transaction(unsigned: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(malformed(&format!(
            "signature must be {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }
    let txn = read_value(unsigned)?;
    if txn.as_map().is_none() {
        return Err(malformed("transaction is not a map"));
    }

    write_value(&Value::Map(vec![
        (Value::from("sig"), Value::Binary(signature.to_vec())),
        (Value::from("txn"), txn),
    ]))
}

/// Decode a signed transaction blob returned by a wallet
pub fn decode_signed_transaction(blob: &[u8]) -> Result<SignedTransaction> {
    let value = read_value(blob)?;
    let map = value
        .as_map()
        .ok_or_else(|| malformed("signed transaction is not a map"))?;

    let signature = map_field(map, "sig")
        .and_then(binary)
        .ok_or_else(|| malformed("signed transaction has no signature"))?;
    if signature.len() != SIGNATURE_LENGTH {
        return Err(malformed(&format!(
            "signature must be {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }

    let transaction = map_field(map, "txn")
        .ok_or_else(|| malformed("signed transaction has no body"))
        .and_then(PaymentTransaction::from_value)?;

    Ok(SignedTransaction {
        signature: signature.to_vec(),
        transaction,
    })
}

fn decode_genesis_hash(encoded: &str) -> Result<[u8; 32]> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| SiwaError::ParametersUnavailable(format!("invalid genesis hash: {e}")))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        SiwaError::ParametersUnavailable(format!(
            "genesis hash must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

fn write_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value)
        .map_err(|e| SiwaError::Signing(format!("failed to encode transaction: {e}")))?;
    Ok(buf)
}

fn read_value(mut bytes: &[u8]) -> Result<Value> {
    rmpv::decode::read_value(&mut bytes)
        .map_err(|e| SiwaError::Signing(format!("failed to decode transaction: {e}")))
}

fn map_field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn uint_field(map: &[(Value, Value)], key: &str) -> u64 {
    map_field(map, key).and_then(Value::as_u64).unwrap_or(0)
}

fn binary(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Binary(bytes) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes)
        .map_err(|_| malformed(&format!("{what} must be {N} bytes, got {}", bytes.len())))
}

fn malformed(message: &str) -> SiwaError {
    SiwaError::Signing(format!("malformed signed transaction: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::address::encode_address;
    use crate::codec::message::encode_challenge;

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1000,
            flat_fee: false,
            first_round: 40_000_000,
            last_round: 40_001_000,
            genesis_id: "mainnet-v1.0".to_string(),
            genesis_hash: "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=".to_string(),
        }
    }

    #[test]
    fn test_zero_self_payment_fields() {
        let address = encode_address(&[3u8; 32]);
        let note = encode_challenge("hello");
        let txn = PaymentTransaction::zero_self_payment(&address, note.clone(), &params()).unwrap();

        assert_eq!(txn.sender, [3u8; 32]);
        assert_eq!(txn.receiver, txn.sender);
        assert_eq!(txn.amount, 0);
        assert_eq!(txn.fee, 1000);
        assert_eq!(txn.note, note);
        assert_eq!(txn.genesis_id, "mainnet-v1.0");
    }

    #[test]
    fn test_fee_per_byte_applied() {
        let address = encode_address(&[3u8; 32]);
        let mut params = params();
        params.fee = 100;
        let txn = PaymentTransaction::zero_self_payment(&address, vec![1; 10], &params).unwrap();
        assert!(txn.fee > 1000);
        assert_eq!(txn.fee % 100, 0);
    }

    #[test]
    fn test_flat_fee_kept() {
        let address = encode_address(&[3u8; 32]);
        let mut params = params();
        params.fee = 2000;
        params.flat_fee = true;
        let txn = PaymentTransaction::zero_self_payment(&address, vec![], &params).unwrap();
        assert_eq!(txn.fee, 2000);
    }

    #[test]
    fn test_encoding_is_canonical() {
        let address = encode_address(&[5u8; 32]);
        let txn = PaymentTransaction::zero_self_payment(&address, b"n".to_vec(), &params()).unwrap();
        let value = read_value(&txn.encode().unwrap()).unwrap();
        let keys: Vec<&str> = value
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec!["fee", "fv", "gen", "gh", "lv", "note", "rcv", "snd", "type"]
        );
    }

    #[test]
    fn test_unsigned_roundtrip() {
        let address = encode_address(&[5u8; 32]);
        let txn = PaymentTransaction::zero_self_payment(&address, b"note".to_vec(), &params()).unwrap();
        let decoded = PaymentTransaction::decode(&txn.encode().unwrap()).unwrap();
        assert_eq!(decoded, txn);
    }

    #[test]
    fn test_bytes_to_sign_tagged() {
        let address = encode_address(&[5u8; 32]);
        let txn = PaymentTransaction::zero_self_payment(&address, vec![], &params()).unwrap();
        let bytes = txn.bytes_to_sign().unwrap();
        assert_eq!(&bytes[..2], b"TX");
        assert_eq!(&bytes[2..], txn.encode().unwrap().as_slice());
    }

    #[test]
    fn test_signed_transaction_extracts_signature() {
        let address = encode_address(&[5u8; 32]);
        let note = encode_challenge("challenge");
        let txn = PaymentTransaction::zero_self_payment(&address, note.clone(), &params()).unwrap();
        let blob = encode_signed_transaction(&txn.encode().unwrap(), &[0xab; 64]).unwrap();

        let signed = decode_signed_transaction(&blob).unwrap();
        assert_eq!(signed.signature, vec![0xab; 64]);
        assert_eq!(signed.transaction.note, note);
    }

    #[test]
    fn test_signed_transaction_missing_signature() {
        let blob = write_value(&Value::Map(vec![(Value::from("txn"), Value::Map(vec![]))])).unwrap();
        let err = decode_signed_transaction(&blob).unwrap_err();
        assert!(matches!(err, SiwaError::Signing(_)));
    }

    #[test]
    fn test_signed_transaction_not_msgpack_map() {
        let err = decode_signed_transaction(&[0x01]).unwrap_err();
        assert!(matches!(err, SiwaError::Signing(_)));
    }

    #[test]
    fn test_invalid_genesis_hash() {
        let address = encode_address(&[5u8; 32]);
        let mut params = params();
        params.genesis_hash = "c2hvcnQ=".to_string();
        let err = PaymentTransaction::zero_self_payment(&address, vec![], &params).unwrap_err();
        assert!(matches!(err, SiwaError::ParametersUnavailable(_)));
    }
}
