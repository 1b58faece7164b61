/*
[INPUT]:  Connection manager, SIWA verifier, relying-party challenge settings
[OUTPUT]: Derived flow state, credentials, verification outcome, current error
[POS]:    Flow layer - sequences connect, sign and verify
[UPDATE]: When flow transitions or error capture rules change
*/

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, info, warn};

use crate::codec::signature_to_base64;
use crate::http::{ErrorKind, Result, SiwaError, StateError};
use crate::manager::WalletConnectionManager;
use crate::siwa::{ChallengeSettings, SiwaMessage, SiwaVerifier, VerifyParams};
use crate::types::{Credentials, FlowState, Provider, Session, VerificationResult};

const DEFAULT_VERIFY_ERROR: &str = "Error verifying SIWA signature";

/// Error captured from the last failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SiwaError> for FlowError {
    fn from(err: &SiwaError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct FlowData {
    challenge: Option<SiwaMessage>,
    credentials: Option<Credentials>,
    verification: Option<VerificationResult>,
    error: Option<FlowError>,
    signing: bool,
    /// Manager generation the credentials belong to
    generation: u64,
}

impl FlowData {
    fn clear_progress(&mut self) {
        self.challenge = None;
        self.credentials = None;
        self.verification = None;
    }
}

/// Clears the signing flag however the sign attempt ends
struct Signing<'a> {
    flow: &'a SiwaFlowController,
}

impl Drop for Signing<'_> {
    fn drop(&mut self) {
        self.flow.write_data().signing = false;
    }
}

/// Sign-in state machine over the connection manager.
///
/// The state is never stored: it is derived from the bound session, the
/// credentials of the current connection and the verification outcome.
pub struct SiwaFlowController {
    manager: Arc<WalletConnectionManager>,
    verifier: Arc<dyn SiwaVerifier>,
    settings: ChallengeSettings,
    data: RwLock<FlowData>,
}

impl SiwaFlowController {
    pub fn new(
        manager: Arc<WalletConnectionManager>,
        verifier: Arc<dyn SiwaVerifier>,
        settings: ChallengeSettings,
    ) -> Self {
        Self {
            manager,
            verifier,
            settings,
            data: RwLock::new(FlowData::default()),
        }
    }

    fn read_data(&self) -> RwLockReadGuard<'_, FlowData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, FlowData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manager(&self) -> &Arc<WalletConnectionManager> {
        &self.manager
    }

    pub fn settings(&self) -> &ChallengeSettings {
        &self.settings
    }

    /// Current step, derived from what has actually been accomplished
    pub fn state(&self) -> FlowState {
        let has_session = self.manager.session().is_some();
        let credentials = self.credentials();
        let verified = credentials.is_some()
            && self
                .verification_result()
                .is_some_and(|result| result.success);
        FlowState::derive(has_session, credentials.is_some(), verified)
    }

    /// Credentials of the current connection, if signed
    pub fn credentials(&self) -> Option<Credentials> {
        let generation = self.manager.generation();
        let data = self.read_data();
        data.credentials
            .clone()
            .filter(|_| data.generation == generation)
    }

    /// Challenge of the last sign attempt on the current connection
    pub fn challenge(&self) -> Option<SiwaMessage> {
        let generation = self.manager.generation();
        let data = self.read_data();
        data.challenge.clone().filter(|_| data.generation == generation)
    }

    pub fn verification_result(&self) -> Option<VerificationResult> {
        let generation = self.manager.generation();
        let data = self.read_data();
        data.verification
            .clone()
            .filter(|_| data.generation == generation)
    }

    pub fn current_error(&self) -> Option<FlowError> {
        self.read_data().error.clone()
    }

    pub fn current_error_kind(&self) -> Option<ErrorKind> {
        self.read_data().error.as_ref().map(|error| error.kind)
    }

    pub fn is_signing(&self) -> bool {
        self.read_data().signing
    }

    fn begin_attempt(&self) {
        self.write_data().error = None;
    }

    /// Capture a failure into the current error slot; discarded results are not errors
    fn record<T>(&self, operation: &str, outcome: Result<T>) -> Result<T> {
        if let Err(err) = &outcome {
            if err.is_cancelled() {
                debug!(operation, "result discarded after disconnect");
            } else {
                warn!(operation, error = %err, "sign-in step failed");
                self.write_data().error = Some(FlowError::from(err));
            }
        }
        outcome
    }

    /// Connect `provider`, leaving AwaitingConnection on success
    pub async fn connect(&self, provider: Provider) -> Result<Session> {
        self.begin_attempt();
        let outcome = self.manager.connect(provider).await;
        if outcome.is_ok() {
            let mut data = self.write_data();
            data.clear_progress();
            data.generation = self.manager.generation();
        }
        self.record("connect", outcome)
    }

    /// Disconnect and return to AwaitingConnection with everything cleared
    pub async fn disconnect(&self) {
        self.begin_attempt();
        self.manager.disconnect().await;
        let mut data = self.write_data();
        data.clear_progress();
        data.generation = self.manager.generation();
    }

    /// Issue a fresh challenge and have the connected wallet sign it.
    ///
    /// Previous credentials are dropped up front, so a failed retry stays in
    /// AwaitingSignature.
    pub async fn sign_in(&self) -> Result<Credentials> {
        self.begin_attempt();
        let outcome = self.try_sign_in().await;
        self.record("sign", outcome)
    }

    async fn try_sign_in(&self) -> Result<Credentials> {
        if self.state() == FlowState::Verified {
            return Err(StateError::AlreadyVerified.into());
        }
        let session = self.manager.session().ok_or(StateError::NoAddressConnected)?;
        let generation = self.manager.generation();

        let challenge = self.settings.issue(&session.address);
        let message = challenge.prepare_message();
        {
            let mut data = self.write_data();
            data.clear_progress();
            data.challenge = Some(challenge.clone());
            data.generation = generation;
            data.signing = true;
        }
        let signing = Signing { flow: self };

        let result = self.manager.sign_message(&message).await?;
        drop(signing);

        if self.manager.generation() != generation
            || self.manager.session().as_ref() != Some(&session)
        {
            return Err(SiwaError::Cancelled);
        }

        let credentials = Credentials {
            serialized_challenge: serde_json::to_string(&challenge)?,
            carrier_transaction: result
                .carrier_transaction
                .as_deref()
                .map(|blob| BASE64.encode(blob)),
            provider: session.provider,
            signature: signature_to_base64(&result.signature),
            address: session.address.clone(),
        };

        self.write_data().credentials = Some(credentials.clone());
        info!(provider = %session.provider, "challenge signed");
        Ok(credentials)
    }

    /// Submit the credentials to the verifier.
    ///
    /// A rejected signature keeps the credentials, so verification can be
    /// retried without signing again.
    pub async fn verify(&self) -> Result<VerificationResult> {
        self.begin_attempt();
        let outcome = self.try_verify().await;
        self.record("verify", outcome)
    }

    async fn try_verify(&self) -> Result<VerificationResult> {
        match self.state() {
            FlowState::Verified => return Err(StateError::AlreadyVerified.into()),
            FlowState::AwaitingConnection => return Err(StateError::NoAddressConnected.into()),
            FlowState::AwaitingSignature | FlowState::AwaitingVerification => {}
        }

        let generation = self.manager.generation();
        let (credentials, challenge) = {
            let data = self.read_data();
            match (&data.credentials, &data.challenge) {
                (Some(credentials), Some(challenge)) if data.generation == generation => {
                    (credentials.clone(), challenge.clone())
                }
                _ => return Err(StateError::NoSignedMessage.into()),
            }
        };

        let params = VerifyParams {
            message: challenge,
            signature: credentials.signature,
            address: credentials.address,
            domain: self.settings.domain.clone(),
            provider: credentials.provider,
            carrier_transaction: credentials.carrier_transaction,
        };

        let result = self.verifier.verify(&params).await.map_err(|err| match err {
            SiwaError::Verification(_) | SiwaError::Cancelled => err,
            other => SiwaError::Verification(other.to_string()),
        })?;

        {
            let mut data = self.write_data();
            if self.manager.generation() != generation || data.generation != generation {
                return Err(SiwaError::Cancelled);
            }
            data.verification = Some(result.clone());
        }

        if !result.success {
            let message = result
                .error
                .clone()
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_VERIFY_ERROR.to_string());
            return Err(SiwaError::Verification(message));
        }

        info!(address = %params.address, "sign-in verified");
        Ok(result)
    }
}

impl fmt::Debug for SiwaFlowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiwaFlowController")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
