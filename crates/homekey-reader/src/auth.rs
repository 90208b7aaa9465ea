//! Authentication collaborator seam.
//!
//! The card loop hands the selected device to an [`Authenticator`] and only
//! looks at the outcome. The cryptographic exchange itself lives outside this
//! runtime; [`MockAuthenticator`] scripts outcomes for tests and dry runs.

#![allow(async_fn_in_trait)]

use crate::error::ReaderError;
use homekey_hardware::NfcBus;
use homekey_storage::SharedReaderData;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Transaction flavour requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyFlow {
    #[default]
    Fast = 0,
    Standard = 1,
    Attestation = 2,
}

impl TryFrom<u8> for KeyFlow {
    type Error = ReaderError;

    fn try_from(value: u8) -> Result<Self, ReaderError> {
        match value {
            0 => Ok(KeyFlow::Fast),
            1 => Ok(KeyFlow::Standard),
            2 => Ok(KeyFlow::Attestation),
            other => Err(ReaderError::InvalidKeyFlow(other)),
        }
    }
}

impl fmt::Display for KeyFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyFlow::Fast => "FAST",
            KeyFlow::Standard => "STANDARD",
            KeyFlow::Attestation => "ATTESTATION",
        };
        f.write_str(name)
    }
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success {
        issuer_id: Vec<u8>,
        endpoint_id: Vec<u8>,
    },
    Failure,
}

impl AuthOutcome {
    pub fn success(issuer_id: impl Into<Vec<u8>>, endpoint_id: impl Into<Vec<u8>>) -> Self {
        AuthOutcome::Success {
            issuer_id: issuer_id.into(),
            endpoint_id: endpoint_id.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }
}

/// Runs the authentication exchange against the selected device.
///
/// Called with the applet already selected. Implementations may talk to
/// the device through `bus` and read (never write) the reader identity.
pub trait Authenticator: Send {
    async fn authenticate<B: NfcBus>(
        &mut self,
        bus: &mut B,
        identity: &SharedReaderData,
        flow: KeyFlow,
    ) -> AuthOutcome;
}

#[derive(Debug, Default)]
struct MockAuthState {
    script: VecDeque<AuthOutcome>,
    fallback: Option<AuthOutcome>,
    flows: Vec<KeyFlow>,
}

fn lock(state: &Mutex<MockAuthState>) -> MutexGuard<'_, MockAuthState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Authenticator returning scripted outcomes.
///
/// Outcomes queued through the handle are returned in order; once the queue
/// is empty every attempt yields the fallback ([`AuthOutcome::Failure`]
/// unless changed).
#[derive(Debug)]
pub struct MockAuthenticator {
    state: Arc<Mutex<MockAuthState>>,
}

impl MockAuthenticator {
    pub fn new() -> (Self, MockAuthenticatorHandle) {
        let state = Arc::new(Mutex::new(MockAuthState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockAuthenticatorHandle { state },
        )
    }
}

impl Authenticator for MockAuthenticator {
    async fn authenticate<B: NfcBus>(
        &mut self,
        _bus: &mut B,
        _identity: &SharedReaderData,
        flow: KeyFlow,
    ) -> AuthOutcome {
        let mut state = lock(&self.state);
        state.flows.push(flow);
        match state.script.pop_front() {
            Some(outcome) => outcome,
            None => state.fallback.clone().unwrap_or(AuthOutcome::Failure),
        }
    }
}

/// Control handle for [`MockAuthenticator`].
#[derive(Debug, Clone)]
pub struct MockAuthenticatorHandle {
    state: Arc<Mutex<MockAuthState>>,
}

impl MockAuthenticatorHandle {
    /// Queue the outcome of the next attempt.
    pub fn push(&self, outcome: AuthOutcome) {
        lock(&self.state).script.push_back(outcome);
    }

    /// Outcome once the script runs dry.
    pub fn set_fallback(&self, outcome: AuthOutcome) {
        lock(&self.state).fallback = Some(outcome);
    }

    /// Key flow of every attempt so far.
    pub fn flows(&self) -> Vec<KeyFlow> {
        lock(&self.state).flows.clone()
    }

    pub fn attempts(&self) -> usize {
        lock(&self.state).flows.len()
    }
}

/// Enum wrapper for authenticator dispatch.
///
/// Keeps the card loop's future `Send` so it can be spawned.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyAuthenticator {
    Mock(MockAuthenticator),
}

impl Authenticator for AnyAuthenticator {
    async fn authenticate<B: NfcBus>(
        &mut self,
        bus: &mut B,
        identity: &SharedReaderData,
        flow: KeyFlow,
    ) -> AuthOutcome {
        match self {
            Self::Mock(auth) => auth.authenticate(bus, identity, flow).await,
        }
    }
}
