//! Session lifecycle.
//!
//! [`SessionManager`] owns at most one [`Session`] per process and drives its
//! asynchronous initialization:
//!
//! ```text
//! NotStarted -> InProgress -> Ready
//!                    |
//!                    v
//!                 Failed -> InProgress (on the next ensure_ready)
//! ```
//!
//! Concurrent [`SessionManager::ensure_ready`] callers share the in-flight
//! attempt, which is stored in the manager itself, so dropping any of the
//! waiters never orphans it. There is no transition out of `Ready`.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alloy::{primitives::Address, providers::DynProvider};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tracing::{debug, info, warn};

use crate::{
    Chain,
    connection::{ConnectionFactory, Connector, Role, Signer},
    error::{ConnectionError, SdkError},
    types::Operation,
};

/// Confirmation and timeout settings shared by the facades.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Number of blocks a submitted approval must be confirmed by before the
    /// dependent action is submitted. The receipt is always awaited, so zero
    /// behaves as one.
    pub confirmations: u64,
    /// Upper bound on waiting for a transaction receipt.
    pub receipt_timeout: Duration,
    /// Upper bound on every single read or submission, none by default.
    pub call_timeout: Option<Duration>,
    /// Upper bound on a single session initialization attempt, none by default.
    pub init_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confirmations: 1,
            receipt_timeout: Duration::from_secs(60),
            call_timeout: None,
            init_timeout: None,
        }
    }
}

/// Read-only connection plus the optional signing session.
#[derive(Clone, Debug)]
pub struct Session {
    read_only: DynProvider,
    signer: Option<Signer>,
}

impl Session {
    pub fn read_only(&self) -> &DynProvider {
        &self.read_only
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    /// Account bound to the signing session, if any.
    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().and_then(Signer::account)
    }
}

/// Initialization status as observed by diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Ready,
    Failed,
}

type Attempt = Shared<BoxFuture<'static, Result<Arc<Session>, ConnectionError>>>;

#[derive(derive_more::Debug)]
enum InitState {
    NotStarted,
    InProgress {
        generation: u64,
        #[debug(skip)]
        attempt: Attempt,
    },
    Ready(Arc<Session>),
    Failed(ConnectionError),
}

#[derive(Debug)]
struct Lifecycle {
    state: InitState,
    attempts: u64,
}

/// Owner of the process-wide session.
///
/// Create once, wrap in [`Arc`] and pass to every contract facade.
#[derive(derive_more::Debug)]
pub struct SessionManager<C = ConnectionFactory> {
    chain: Chain,
    #[debug(skip)]
    connector: Arc<C>,
    settings: Settings,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(chain: Chain, connector: C, settings: Settings) -> Self {
        Self {
            chain,
            connector: Arc::new(connector),
            settings,
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: InitState::NotStarted,
                attempts: 0,
            })),
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns the ready session, starting or joining an initialization attempt if needed.
    ///
    /// Concurrent callers observe the same attempt and its outcome. After a failed
    /// attempt the next call starts a fresh one. Failures surface as
    /// [`SdkError::SessionInitialization`]. An attempt outliving
    /// [`Settings::init_timeout`] fails as [`SdkError::Timeout`], so a hung
    /// endpoint is retried like any other failure.
    pub async fn ensure_ready(&self) -> Result<Arc<Session>, SdkError> {
        let attempt = {
            let mut lifecycle = self.lock();
            if let InitState::Ready(session) = &lifecycle.state {
                return Ok(session.clone());
            }
            if let InitState::InProgress { attempt, .. } = &lifecycle.state {
                debug!(chain = self.chain.name(), "Joining in-flight session initialization");
                attempt.clone()
            } else {
                self.start(&mut lifecycle)
            }
        };
        attempt.await.map_err(|err| match err {
            ConnectionError::Timeout(after) => SdkError::Timeout {
                operation: Operation::Initialize,
                after,
            },
            err => SdkError::SessionInitialization(err),
        })
    }

    fn start(&self, lifecycle: &mut Lifecycle) -> Attempt {
        lifecycle.attempts += 1;
        let generation = lifecycle.attempts;
        info!(chain = self.chain.name(), attempt = generation, "Starting session initialization");

        let connector = self.connector.clone();
        let shared = self.lifecycle.clone();
        let limit = self.settings.init_timeout;
        let attempt = async move {
            let result = match limit {
                Some(after) => tokio::time::timeout(after, connect(connector.as_ref()))
                    .await
                    .unwrap_or(Err(ConnectionError::Timeout(after))),
                None => connect(connector.as_ref()).await,
            };
            {
                let mut lifecycle = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if matches!(lifecycle.state, InitState::InProgress { generation: g, .. } if g == generation)
                {
                    lifecycle.state = match &result {
                        Ok(session) => InitState::Ready(session.clone()),
                        Err(err) => InitState::Failed(err.clone()),
                    };
                }
            }
            match &result {
                Ok(session) => info!(
                    attempt = generation,
                    signing = session.signer.is_some(),
                    account = ?session.account(),
                    "Session ready"
                ),
                Err(err) => warn!(attempt = generation, %err, "Session initialization failed"),
            }
            result
        }
        .boxed()
        .shared();

        lifecycle.state = InitState::InProgress {
            generation,
            attempt: attempt.clone(),
        };
        attempt
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> InitStatus {
        match self.lock().state {
            InitState::NotStarted => InitStatus::NotStarted,
            InitState::InProgress { .. } => InitStatus::InProgress,
            InitState::Ready(_) => InitStatus::Ready,
            InitState::Failed(_) => InitStatus::Failed,
        }
    }

    /// Number of initialization attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    /// Error of the last attempt, if it failed.
    pub fn last_error(&self) -> Option<ConnectionError> {
        match &self.lock().state {
            InitState::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Ready session, without waiting.
    pub fn session(&self) -> Option<Arc<Session>> {
        match &self.lock().state {
            InitState::Ready(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn read_only_session(&self) -> Option<DynProvider> {
        self.session().map(|s| s.read_only.clone())
    }

    pub fn signing_session(&self) -> Option<Signer> {
        self.session().and_then(|s| s.signer.clone())
    }

    pub fn account(&self) -> Option<Address> {
        self.session().and_then(|s| s.account())
    }

    /// Builds a signing session scoped to the given account, bypassing the shared session.
    pub async fn signing_session_for(&self, account: Address) -> Result<Signer, SdkError> {
        deadline(self.settings.init_timeout, Operation::Initialize, async {
            let provider = self
                .connector
                .connect_as(account)
                .await
                .map_err(SdkError::SessionInitialization)?;
            debug!(%account, "Account-scoped signing session ready");
            Ok(Signer::new(provider, Some(account)))
        })
        .await
    }
}

async fn connect<C: Connector>(connector: &C) -> Result<Arc<Session>, ConnectionError> {
    let read_only = connector
        .connect(Role::ReadOnly)
        .await?
        .ok_or(ConnectionError::Unavailable(Role::ReadOnly))?;
    let signer = match connector.connect(Role::Signing).await? {
        Some(provider) => {
            let account = match connector.request_accounts().await {
                Ok(accounts) => accounts.first().copied(),
                Err(err) => {
                    warn!(%err, "Account enumeration failed, continuing without account");
                    None
                }
            };
            Some(Signer::new(provider, account))
        }
        None => None,
    };
    Ok(Arc::new(Session { read_only, signer }))
}

/// Awaits the future, failing with [`SdkError::Timeout`] once the limit, if any, expires.
pub(crate) async fn deadline<T, F>(
    limit: Option<Duration>,
    operation: Operation,
    fut: F,
) -> Result<T, SdkError>
where
    F: Future<Output = Result<T, SdkError>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| SdkError::Timeout { operation, after })?,
        None => fut.await,
    }
}
