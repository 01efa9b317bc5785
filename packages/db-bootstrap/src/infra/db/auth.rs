//! Connectivity checks with bounded retry.
//!
//! Every connection runs its own loop: try to log in, and on a "connection refused"
//! failure sleep a fixed delay and try again, up to `max_retries` times.
//! Any other failure, or running out of retries, is final for that connection
//! only; the other connections keep going.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{AuthError, BootstrapError};

pub const AUTH_MAX_RETRIES: u32 = 3;
pub const AUTH_RETRY_DELAY_MS: u64 = 2000;

/// Something whose connectivity can be checked.
#[async_trait]
pub trait Authenticate: Send + Sync {
    /// Delegate name used in logs and reports.
    fn name(&self) -> &str;

    async fn authenticate(&self) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: AUTH_MAX_RETRIES,
            delay: Duration::from_millis(AUTH_RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unattempted,
    Attempting,
    Retrying { retries: u32 },
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Failed)
    }
}

/// Shared view of every connection's current state.
#[derive(Debug, Clone, Default)]
pub struct AuthStates {
    inner: Arc<Mutex<BTreeMap<String, AuthState>>>,
}

impl AuthStates {
    pub fn get(&self, name: &str) -> Option<AuthState> {
        self.inner.lock().get(name).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, AuthState> {
        self.inner.lock().clone()
    }

    fn set(&self, name: &str, state: AuthState) {
        self.inner.lock().insert(name.to_string(), state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthReport {
    pub delegate: String,
    pub attempts: u32,
    pub retries: u32,
}

/// Retry `target` until it authenticates or fails for good.
pub async fn authenticate_with_retry(
    target: &dyn Authenticate,
    policy: RetryPolicy,
    states: &AuthStates,
) -> Result<AuthReport, BootstrapError> {
    let delegate = target.name().to_string();
    let mut retries: u32 = 0;

    loop {
        states.set(&delegate, AuthState::Attempting);

        let err = match target.authenticate().await {
            Ok(()) => {
                states.set(&delegate, AuthState::Authenticated);
                if retries > 0 {
                    info!(
                        "auth_retry=success delegate={} attempts={} interval_ms={}",
                        delegate,
                        retries + 1,
                        policy.delay.as_millis()
                    );
                } else {
                    info!(delegate = %delegate, "auth=ok");
                }
                return Ok(AuthReport {
                    delegate,
                    attempts: retries + 1,
                    retries,
                });
            }
            Err(err) => err,
        };

        if !err.is_connection_refused() || retries >= policy.max_retries {
            states.set(&delegate, AuthState::Failed);
            error!(
                delegate = %delegate,
                kind = %err.kind,
                retries,
                "auth=failed err={}",
                err.message
            );
            return Err(BootstrapError::Authentication {
                delegate,
                retries,
                source: err,
            });
        }

        retries += 1;
        states.set(&delegate, AuthState::Retrying { retries });
        warn!(
            delegate = %delegate,
            retry = retries,
            max_retries = policy.max_retries,
            "Database error: {}, sleep {} ms to retry...",
            err.message,
            policy.delay.as_millis()
        );
        tokio::time::sleep(policy.delay).await;
    }
}

/// The deferred authentication step of a bootstrap.
///
/// Nothing runs until the caller either awaits [`AuthPhase::run`] /
/// [`AuthPhase::outcomes`] or detaches it with [`AuthPhase::spawn`].
pub struct AuthPhase {
    targets: Vec<Arc<dyn Authenticate>>,
    policy: RetryPolicy,
    states: AuthStates,
}

impl std::fmt::Debug for AuthPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPhase")
            .field(
                "targets",
                &self.targets.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .finish()
    }
}

impl AuthPhase {
    pub fn new(targets: Vec<Arc<dyn Authenticate>>, policy: RetryPolicy) -> Self {
        let states = AuthStates::default();
        for target in &targets {
            states.set(target.name(), AuthState::Unattempted);
        }
        Self {
            targets,
            policy,
            states,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), RetryPolicy::default())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Live state per delegate; stays valid after the phase is consumed.
    pub fn states(&self) -> AuthStates {
        self.states.clone()
    }

    /// Run every connection concurrently and return each one's result, in
    /// target order, once all of them reached a terminal state.
    pub async fn outcomes(self) -> Vec<Result<AuthReport, BootstrapError>> {
        let policy = self.policy;
        let states = &self.states;
        join_all(
            self.targets
                .iter()
                .map(|target| authenticate_with_retry(target.as_ref(), policy, states)),
        )
        .await
    }

    /// Like [`outcomes`](Self::outcomes) but fails with the first failure in
    /// target order.
    pub async fn run(self) -> Result<Vec<AuthReport>, BootstrapError> {
        self.outcomes().await.into_iter().collect()
    }

    /// Detach the phase onto the runtime. Failures are logged here as well as
    /// returned through the handle.
    pub fn spawn(self) -> JoinHandle<Result<Vec<AuthReport>, BootstrapError>> {
        tokio::spawn(async move {
            let result = self.run().await;
            if let Err(err) = &result {
                error!("auth_phase=failed err={}", err);
            }
            result
        })
    }
}

/// Await a spawned phase. A task that panicked or was aborted becomes
/// [`BootstrapError::AuthTask`].
pub async fn join_auth(
    handle: JoinHandle<Result<Vec<AuthReport>, BootstrapError>>,
) -> Result<Vec<AuthReport>, BootstrapError> {
    handle.await.map_err(|e| {
        error!("auth_phase=aborted err={}", e);
        BootstrapError::AuthTask {
            detail: e.to_string(),
        }
    })?
}
