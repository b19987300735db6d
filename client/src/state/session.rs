//! Session store: credential, profile, and the auth lifecycle.
//!
//! SYSTEM CONTEXT
//! ==============
//! Views call `login`/`signup`/`logout` here; the navigation gate reads
//! snapshots. The store talks to the backend through [`CrmApi`] and mirrors the
//! credential into the injected [`KeyValueStore`] under [`TOKEN_KEY`].
//!
//! ```text
//! Uninitialized ──bootstrap──▶ Rehydrating ──ok──▶ Authenticated
//!                     │                  └─err─▶ Anonymous
//!                     └─(no credential)────────▶ Anonymous
//! Anonymous|Authenticated ──login/signup──▶ Authenticating ──▶ Authenticated | Anonymous
//! any ──logout──▶ Anonymous
//! Authenticated ──refresh failure──▶ Anonymous
//! ```
//!
//! CONCURRENCY
//! ===========
//! Operations are not mutually exclusive. Each mutation takes a fresh epoch;
//! after every await an operation re-checks that its epoch is still current
//! and that the credential it set is still the session credential. A stale
//! operation changes nothing and reports [`SessionError::Superseded`], so the
//! most recently invoked operation wins.
//!
//! The internal mutex is never held across an await.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::storage::{KeyValueStore, StorageError, TOKEN_KEY};
use crate::net::api::CrmApi;
use crate::net::error::ApiError;
use crate::net::types::{Profile, RegisterRequest};

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle phase of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, bootstrap not yet run.
    #[default]
    Uninitialized,
    /// Validating a persisted credential.
    Rehydrating,
    /// Login or signup in flight.
    Authenticating,
    /// Credential and profile both present.
    Authenticated,
    /// No credential.
    Anonymous,
}

impl SessionPhase {
    /// Phases the navigation gate must wait on.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Rehydrating | Self::Authenticating)
    }
}

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The credential could not be persisted.
    #[error("credential storage failed: {0}")]
    Storage(String),

    /// A later operation replaced this one before it finished.
    #[error("superseded by a newer session operation")]
    Superseded,
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl SessionError {
    /// Text suitable for an inline form error.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api(err) => err.message(),
            Self::Storage(_) => "Could not save your session on this device".to_owned(),
            Self::Superseded => "Another sign-in attempt replaced this one".to_owned(),
        }
    }
}

/// Point-in-time view of the session.
///
/// `profile` is only ever present together with `credential`, and
/// `is_loading` mirrors [`SessionPhase::is_loading`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub phase: SessionPhase,
    pub credential: Option<String>,
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub last_error: Option<SessionError>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    fn enter(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.is_loading = phase.is_loading();
    }

    fn become_anonymous(&mut self) {
        self.credential = None;
        self.profile = None;
        self.enter(SessionPhase::Anonymous);
    }

    fn become_authenticated(&mut self, credential: String, profile: Profile) {
        self.credential = Some(credential);
        self.profile = Some(profile);
        self.enter(SessionPhase::Authenticated);
    }
}

struct Inner {
    session: Session,
    epoch: u64,
}

// =============================================================================
// STORE
// =============================================================================

/// Owner of the session state. Share it by reference or `Arc`.
pub struct SessionStore {
    api: Arc<dyn CrmApi>,
    storage: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// Create an `Uninitialized` store. No I/O happens until [`Self::bootstrap`].
    pub fn new(api: Arc<dyn CrmApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { api, storage, inner: Mutex::new(Inner { session: Session::default(), epoch: 0 }), tx }
    }

    /// The API client the store was built with, for read-only view calls.
    #[must_use]
    pub fn api(&self) -> &dyn CrmApi {
        self.api.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    /// Receiver that observes every published state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Derive session state from the persisted credential.
    ///
    /// With no persisted credential this enters `Anonymous` without any API
    /// call. Otherwise it validates the credential against the profile
    /// endpoint; any failure clears the persisted credential and ends
    /// `Anonymous`. Running it again re-derives the same state.
    pub async fn bootstrap(&self) -> Session {
        let Some(credential) = self.persisted_credential() else {
            self.begin(|s| {
                s.become_anonymous();
            });
            tracing::debug!("bootstrap: no persisted credential");
            return self.snapshot();
        };

        let epoch = self.begin(|s| {
            s.credential = Some(credential.clone());
            s.profile = None;
            s.enter(SessionPhase::Rehydrating);
        });
        tracing::debug!(epoch, "bootstrap: rehydrating persisted credential");

        match self.api.fetch_current_profile().await {
            Ok(profile) => {
                let profile_id = profile.id;
                let applied = self.apply_if_current(epoch, &credential, |s| {
                    s.become_authenticated(credential.clone(), profile);
                });
                if applied {
                    tracing::debug!(epoch, profile_id, "bootstrap: session restored");
                }
            }
            Err(err) => {
                let applied = self.apply_if_current(epoch, &credential, |s| s.become_anonymous());
                if applied {
                    self.clear_persisted_if(&credential);
                    tracing::warn!(epoch, error = %err, "bootstrap: persisted credential rejected; signed out");
                }
            }
        }
        self.snapshot()
    }

    /// Exchange email and password for a credential, then load the profile.
    ///
    /// The profile fetch is awaited in sequence. If it fails, the session rolls
    /// back to `Anonymous` and the persisted credential is removed.
    ///
    /// # Errors
    ///
    /// Returns the API error from either step, a storage error, or
    /// [`SessionError::Superseded`] when a newer operation took over.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let (epoch, previous) = self.begin_authenticating();
        self.login_within(epoch, previous, email, password).await
    }

    async fn login_within(
        &self,
        epoch: u64,
        previous: Session,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        let response = match self.api.login(email, password).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail_attempt(epoch, previous, err.into())),
        };
        self.ensure_current(epoch)?;

        let token = response.token;
        if let Err(err) = self.storage.set(TOKEN_KEY, &token) {
            return Err(self.fail_attempt(epoch, previous, err.into()));
        }
        if let Err(err) = self.ensure_current(epoch) {
            self.release_if_orphaned(&token);
            return Err(err);
        }
        self.begin_with(epoch, |s| {
            s.credential = Some(token.clone());
            s.profile = None;
        });

        match self.api.fetch_current_profile().await {
            Ok(profile) => {
                let profile_id = profile.id;
                let applied = self.apply_if_current(epoch, &token, |s| {
                    s.become_authenticated(token.clone(), profile);
                });
                if !applied {
                    self.release_if_orphaned(&token);
                    return Err(SessionError::Superseded);
                }
                tracing::info!(profile_id, "logged in");
                Ok(self.snapshot())
            }
            Err(err) => {
                let err = SessionError::from(err);
                let applied = self.apply_if_current(epoch, &token, |s| {
                    s.become_anonymous();
                    s.last_error = Some(err.clone());
                });
                if !applied {
                    self.release_if_orphaned(&token);
                    return Err(SessionError::Superseded);
                }
                self.clear_persisted_if(&token);
                tracing::warn!(error = %err, "profile fetch after login failed; rolled back");
                Err(err)
            }
        }
    }

    /// Register a new account, then log in with the same email and password.
    ///
    /// A failed registration returns before any login attempt.
    ///
    /// # Errors
    ///
    /// Returns the registration error, or any error from [`Self::login`].
    pub async fn signup(&self, request: &RegisterRequest) -> Result<Session, SessionError> {
        let (epoch, previous) = self.begin_authenticating();

        match self.api.register(request).await {
            Ok(registration) => tracing::debug!(?registration, "registered"),
            Err(err) => return Err(self.fail_attempt(epoch, previous, err.into())),
        }
        self.ensure_current(epoch)?;

        self.login_within(epoch, previous, &request.email, &request.password).await
    }

    /// Drop the credential and profile. Never touches the network.
    pub fn logout(&self) -> Session {
        if let Err(err) = self.storage.clear(TOKEN_KEY) {
            tracing::warn!(error = %err, "failed to clear persisted credential");
        }
        self.begin(|s| {
            s.become_anonymous();
            s.last_error = None;
        });
        tracing::info!("logged out");
        self.snapshot()
    }

    /// Re-fetch the profile for the current credential and replace it wholesale.
    ///
    /// A failure downgrades to `Anonymous` and clears the persisted credential.
    /// Without a credential this is a no-op.
    pub async fn refresh_profile(&self) -> Session {
        let (epoch, credential) = {
            let inner = self.lock();
            (inner.epoch, inner.session.credential.clone())
        };
        let Some(credential) = credential else {
            return self.snapshot();
        };

        match self.api.fetch_current_profile().await {
            Ok(profile) => {
                self.apply_if_current(epoch, &credential, |s| {
                    s.become_authenticated(credential.clone(), profile);
                });
            }
            Err(err) => {
                if self.apply_if_current(epoch, &credential, |s| s.become_anonymous()) {
                    self.clear_persisted_if(&credential);
                    tracing::warn!(error = %err, "profile refresh failed; signed out");
                }
            }
        }
        self.snapshot()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        self.tx.send_replace(session.clone());
    }

    fn persisted_credential(&self) -> Option<String> {
        self.storage
            .get(TOKEN_KEY)
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
    }

    /// Start a new epoch, mutate, and publish. Returns the new epoch.
    fn begin(&self, mutate: impl FnOnce(&mut Session)) -> u64 {
        let mut inner = self.lock();
        inner.epoch += 1;
        mutate(&mut inner.session);
        self.publish(&inner.session);
        inner.epoch
    }

    /// Mutate and publish within `epoch`, replacing whatever credential the
    /// session held. No-op if the epoch has moved on.
    fn begin_with(&self, epoch: u64, mutate: impl FnOnce(&mut Session)) {
        let mut inner = self.lock();
        if inner.epoch == epoch {
            mutate(&mut inner.session);
            self.publish(&inner.session);
        }
    }

    fn begin_authenticating(&self) -> (u64, Session) {
        let previous = self.snapshot();
        let epoch = self.begin(|s| {
            s.last_error = None;
            s.enter(SessionPhase::Authenticating);
        });
        tracing::debug!(epoch, "authenticating");
        (epoch, previous)
    }

    /// Apply `mutate` only if `epoch` is current and the session credential is
    /// absent or equal to `credential`.
    fn apply_if_current(&self, epoch: u64, credential: &str, mutate: impl FnOnce(&mut Session)) -> bool {
        let mut inner = self.lock();
        let credential_matches = inner
            .session
            .credential
            .as_deref()
            .is_none_or(|c| c == credential);
        if inner.epoch != epoch || !credential_matches {
            tracing::debug!(epoch, current = inner.epoch, "discarding stale session result");
            return false;
        }
        mutate(&mut inner.session);
        self.publish(&inner.session);
        true
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), SessionError> {
        if self.lock().epoch == epoch {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Record a failed login/signup. An authenticated session that was live
    /// before the attempt is kept; anything else ends `Anonymous`. The
    /// persisted credential is brought in line with the resulting session.
    fn fail_attempt(&self, epoch: u64, previous: Session, err: SessionError) -> SessionError {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return SessionError::Superseded;
        }
        if previous.is_authenticated() {
            inner.session = previous;
        } else {
            inner.session.become_anonymous();
        }
        inner.session.last_error = Some(err.clone());
        self.sync_persisted(inner.session.credential.as_deref());
        self.publish(&inner.session);
        tracing::warn!(error = %err, "authentication attempt failed");
        err
    }

    /// Make the persisted credential match `credential`.
    fn sync_persisted(&self, credential: Option<&str>) {
        if self.persisted_credential().as_deref() == credential {
            return;
        }
        let result = match credential {
            Some(credential) => self.storage.set(TOKEN_KEY, credential),
            None => self.storage.clear(TOKEN_KEY),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to sync persisted credential");
        }
    }

    /// A superseded login drops the credential it persisted unless the live
    /// session adopted it.
    fn release_if_orphaned(&self, token: &str) {
        let inner = self.lock();
        if inner.session.credential.as_deref() != Some(token) {
            self.clear_persisted_if(token);
        }
    }

    /// Remove the persisted credential unless another writer replaced it.
    fn clear_persisted_if(&self, credential: &str) {
        if self.persisted_credential().as_deref() != Some(credential) {
            return;
        }
        if let Err(err) = self.storage.clear(TOKEN_KEY) {
            tracing::warn!(error = %err, "failed to clear persisted credential");
        }
    }
}
