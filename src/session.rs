//! Session store
//!
//! Holds the opaque bearer credential for the current session. The store is
//! an explicit, injectable handle (cloneable, shared) rather than ambient
//! global state, so gateways and the auth orchestrator receive it at
//! construction time and tests get full isolation.
//!
//! The store is the only mutable state shared between components. It is
//! written by the auth orchestrator (and cleared by the gateway on auth
//! failures) and read by everything else; writes are atomic with respect to
//! reads, so a partially written session is never observable.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

/// A persisted credential with its optional expiry (BaaS sessions expire;
/// REST tokens carry expiry inside the token itself).
#[derive(Debug, Clone)]
struct StoredCredential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Shared handle over the persisted session credential.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<StoredCredential>>>,
}

impl SessionStore {
    /// Create an empty (unauthenticated) store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<StoredCredential>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<StoredCredential>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist a credential, replacing any previous one.
    pub fn set(&self, token: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        *self.write() = Some(StoredCredential {
            token: token.into(),
            expires_at,
        });
    }

    /// Current credential, or `None` when unauthenticated.
    ///
    /// An expired credential is treated as absent and removed, so a stale
    /// session is never attached to an outgoing request.
    pub fn token(&self) -> Option<String> {
        {
            let guard = self.read();
            match guard.as_ref() {
                None => return None,
                Some(cred) => {
                    let expired = cred
                        .expires_at
                        .map(|at| at <= Utc::now())
                        .unwrap_or(false);
                    if !expired {
                        return Some(cred.token.clone());
                    }
                }
            }
        }
        self.clear();
        None
    }

    /// Whether a live credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Expiry of the current credential, if one was recorded.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().as_ref().and_then(|cred| cred.expires_at)
    }

    /// Remove the credential entirely. Safe to call repeatedly.
    pub fn clear(&self) {
        *self.write() = None;
    }
}
