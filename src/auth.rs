//! Auth orchestrator
//!
//! Owns the session lifecycle on top of the gateway. The phase machine is
//!
//! ```text
//! Uninitialized -> Verifying -> { Authenticated, Anonymous }
//! Authenticated -> Verifying -> { Authenticated, Anonymous }   (periodic re-check)
//! any           -> Anonymous                                    (explicit sign-out)
//! ```
//!
//! Role flags are derived from the principal on every update, never stored
//! independently.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::RequestResult;
use crate::gateway::Gateway;
use crate::session::SessionStore;
use crate::types::{Principal, Role, TeacherApplication};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// Startup verification has not run yet.
    Uninitialized,
    /// A verification round-trip is in flight.
    Verifying,
    Authenticated,
    Anonymous,
}

/// Snapshot of the orchestrator state handed to consumers.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub principal: Option<Principal>,
    pub is_admin: bool,
    pub is_teacher: bool,
}

impl AuthState {
    fn uninitialized() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            principal: None,
            is_admin: false,
            is_teacher: false,
        }
    }
}

/// Finite-state session manager built on the gateway.
pub struct AuthOrchestrator {
    gateway: Arc<Gateway>,
    session: SessionStore,
    state: RwLock<AuthState>,
}

impl AuthOrchestrator {
    pub fn new(gateway: Arc<Gateway>, session: SessionStore) -> Self {
        Self {
            gateway,
            session,
            state: RwLock::new(AuthState::uninitialized()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase(&self) -> AuthPhase {
        self.state().phase
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state().principal
    }

    /// Derived from the principal role; recomputed on every update.
    pub fn is_admin(&self) -> bool {
        self.state().is_admin
    }

    /// Derived from the principal role; recomputed on every update.
    pub fn is_teacher(&self) -> bool {
        self.state().is_teacher
    }

    fn set_phase(&self, phase: AuthPhase) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = phase;
    }

    /// Replace the principal and recompute derived role flags atomically.
    fn apply(&self, principal: Option<Principal>, phase: AuthPhase) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.is_admin = matches!(principal.as_ref().map(|p| p.role), Some(Role::Admin));
        state.is_teacher = matches!(principal.as_ref().map(|p| p.role), Some(Role::Teacher));
        state.principal = principal;
        state.phase = phase;
    }

    /// Startup verification: resolve the persisted credential (if any) into
    /// an authenticated or anonymous state.
    pub async fn initialize(&self) {
        if self.session.token().is_none() {
            debug!("no persisted credential, starting anonymous");
            self.apply(None, AuthPhase::Anonymous);
            return;
        }
        self.set_phase(AuthPhase::Verifying);
        match self.gateway.verify_token().await {
            Ok(principal) => {
                info!(user = %principal.email, "restored session");
                self.apply(Some(principal), AuthPhase::Authenticated);
            }
            Err(e) => {
                warn!("persisted credential failed verification: {}", e);
                self.session.clear();
                self.apply(None, AuthPhase::Anonymous);
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the credential is persisted and the state moves through
    /// `Verifying` to `Authenticated`. On failure the current state is left
    /// untouched and the error is returned for the UI. Never panics past
    /// this boundary.
    pub async fn sign_in(&self, email: &str, password: &str) -> RequestResult<Principal> {
        let response = self.gateway.login(email, password).await?;
        self.session.set(response.token, response.expires_at);
        self.set_phase(AuthPhase::Verifying);

        // Refetch the principal so role and metadata reflect server truth.
        // The login payload is the fallback only for non-auth failures: when
        // the refetch is rejected with 401/403 the gateway has already cleared
        // the credential, and an authenticated state without one would leave a
        // principal no request could act on.
        let principal = match self.gateway.current_user().await {
            Ok(principal) => principal,
            Err(e) if e.is_auth_failure() => {
                warn!("post-login verification rejected the session: {}", e);
                self.apply(None, AuthPhase::Anonymous);
                return Err(e);
            }
            Err(e) => {
                warn!("post-login principal fetch failed, using login payload: {}", e);
                response.user
            }
        };
        info!(user = %principal.email, role = principal.role.as_str(), "signed in");
        self.apply(Some(principal.clone()), AuthPhase::Authenticated);
        Ok(principal)
    }

    /// Register a new account, then attempt an automatic sign-in with the
    /// same credentials.
    ///
    /// Returns `Ok(Some(principal))` when the auto sign-in also succeeded and
    /// `Ok(None)` when registration succeeded but the sign-in did not; the
    /// registration itself is still reported as successful in that case.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RequestResult<Option<Principal>> {
        let outcome = self.gateway.register(email, password, username).await?;

        if let Some(token) = outcome.token {
            // The backend opened a session as part of registration.
            self.session.set(token, None);
            self.set_phase(AuthPhase::Verifying);
            // Verifying is transient: every return path below settles on
            // Authenticated or Anonymous.
            return match self.gateway.current_user().await {
                Ok(principal) => {
                    self.apply(Some(principal.clone()), AuthPhase::Authenticated);
                    Ok(Some(principal))
                }
                Err(e) if e.is_auth_failure() => {
                    // The gateway cleared the rejected credential; the
                    // registration itself still succeeded.
                    warn!("post-signup verification rejected the session: {}", e);
                    self.apply(None, AuthPhase::Anonymous);
                    Ok(None)
                }
                Err(e) => {
                    warn!("post-signup principal fetch failed: {}", e);
                    match outcome.user {
                        Some(user) => {
                            self.apply(Some(user.clone()), AuthPhase::Authenticated);
                            Ok(Some(user))
                        }
                        None => {
                            self.session.clear();
                            self.apply(None, AuthPhase::Anonymous);
                            Ok(None)
                        }
                    }
                }
            };
        }

        match self.sign_in(email, password).await {
            Ok(principal) => Ok(Some(principal)),
            Err(e) => {
                // Registration succeeded even though auto-login did not.
                warn!("auto sign-in after registration failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Sign out unconditionally.
    ///
    /// The backend call to invalidate the server-side session is best-effort;
    /// local state wins. Safe to call in any phase, any number of times.
    pub async fn sign_out(&self) {
        if self.session.is_authenticated() {
            if let Err(e) = self.gateway.logout().await {
                warn!("server-side sign-out failed, clearing locally anyway: {}", e);
            }
        }
        self.session.clear();
        self.apply(None, AuthPhase::Anonymous);
        info!("signed out");
    }

    /// Re-verify the current session. Runs only while authenticated;
    /// verification failure forces a sign-out.
    pub async fn verify_session(&self) {
        if self.phase() != AuthPhase::Authenticated {
            return;
        }
        self.set_phase(AuthPhase::Verifying);
        match self.gateway.verify_token().await {
            Ok(principal) => {
                self.apply(Some(principal), AuthPhase::Authenticated);
            }
            Err(e) => {
                warn!("session re-verification failed, signing out: {}", e);
                self.session.clear();
                self.apply(None, AuthPhase::Anonymous);
            }
        }
    }

    /// Shallow-merge `changes` into the principal's metadata server-side,
    /// then re-fetch the full principal so the local view matches server
    /// truth instead of an optimistic patch.
    pub async fn update_user_metadata(
        &self,
        user_id: &str,
        changes: Map<String, Value>,
    ) -> RequestResult<Principal> {
        self.gateway.update_metadata(user_id, &changes).await?;
        let principal = self.gateway.current_user().await?;
        self.apply(Some(principal.clone()), AuthPhase::Authenticated);
        Ok(principal)
    }

    /// Submit a teacher application. Applications are auto-approved, so the
    /// refetched principal carries the teacher role and the derived
    /// `is_teacher` flag flips with it.
    pub async fn apply_as_teacher(
        &self,
        user_id: &str,
        application: TeacherApplication,
    ) -> RequestResult<Principal> {
        self.gateway.apply_teacher(user_id, &application).await?;
        let principal = self.gateway.current_user().await?;
        self.apply(Some(principal.clone()), AuthPhase::Authenticated);
        Ok(principal)
    }

    /// Spawn the periodic re-verification loop. The first check runs one
    /// full period after spawning; startup verification is `initialize`.
    pub fn spawn_reverification(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick would duplicate initialize().
            interval.tick().await;
            loop {
                interval.tick().await;
                orchestrator.verify_session().await;
            }
        })
    }
}
