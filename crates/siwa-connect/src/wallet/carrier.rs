/*
[INPUT]:  Chain node, signing address, encoded challenge, signed blob
[OUTPUT]: Unsigned carrier transactions and signing results
[POS]:    Wallet layer - shared note-field workaround for transaction-only wallets
[UPDATE]: When the carrier transaction construction changes
*/

use tracing::{debug, warn};

use crate::codec::{decode_signed_transaction, PaymentTransaction};
use crate::http::{ChainNode, Result, SiwaError};
use crate::types::SigningResult;
use crate::wallet::adapter::signing_error;

/// Fetch suggested params and build the zero-amount self-payment carrying the challenge
pub(crate) async fn build_carrier_transaction(
    node: &dyn ChainNode,
    address: &str,
    encoded_challenge: &[u8],
) -> Result<PaymentTransaction> {
    let params = node.suggested_params().await.map_err(|err| {
        warn!(error = %err, "suggested params unavailable");
        match err {
            SiwaError::ParametersUnavailable(_) => err,
            other => SiwaError::ParametersUnavailable(other.to_string()),
        }
    })?;
    debug!(first_round = params.first_round, last_round = params.last_round, "building carrier transaction");

    PaymentTransaction::zero_self_payment(address, encoded_challenge.to_vec(), &params)
        .map_err(signing_error)
}

/// Extract the signature from a signed carrier transaction, keeping the blob
pub(crate) fn carrier_signing_result(signed: Vec<u8>) -> Result<SigningResult> {
    let decoded = decode_signed_transaction(&signed)?;
    Ok(SigningResult::with_carrier(decoded.signature, signed))
}
