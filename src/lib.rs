//! Skillversity client
//!
//! Client-side data-access layer for the Skillversity course marketplace.
//!
//! # Overview
//!
//! The crate unifies two backend strategies (the Skillversity REST API and
//! a managed BaaS) behind one gateway, and builds the session lifecycle and
//! catalog queries on top of it:
//!
//! - **`gateway`**: health-checked, credential-aware dispatch onto the
//!   configured backend; every outcome normalized to `RequestResult<T>`
//! - **`auth`**: sign-in/sign-up/sign-out and periodic session
//!   re-verification with derived role flags
//! - **`query`**: reactive `{data, is_loading, error}` handles over
//!   individual catalog calls
//! - **`catalog`**: pure shaping of course shelves (popular, recommended,
//!   in-demand, by category)
//! - **`session`**: the injectable credential store shared by the above
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skillversity_client::{AuthOrchestrator, ClientConfig, Gateway, SessionStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let session = SessionStore::new();
//! let gateway = Arc::new(Gateway::new(&config, session.clone())?);
//!
//! let auth = Arc::new(AuthOrchestrator::new(gateway.clone(), session));
//! auth.initialize().await;
//! auth.spawn_reverification(config.reverify_interval);
//!
//! let courses = gateway.list_courses().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Expected failures never panic and never escape as transport errors: every
//! operation resolves to `RequestResult<T>` with an `ApiError` from the
//! fixed taxonomy in [`error`]. Auth failures (401/403) additionally clear
//! the persisted credential.

/// Auth orchestrator and session phase machine
pub mod auth;

/// Pure course-shaping utilities
pub mod catalog;

/// Client configuration
pub mod config;

/// Failure taxonomy
pub mod error;

/// Backend gateway and the two backend strategies
pub mod gateway;

/// Reactive query handles
pub mod query;

/// Session credential store
pub mod session;

/// Data model
pub mod types;

pub use auth::{AuthOrchestrator, AuthPhase, AuthState};
pub use config::{BackendStrategy, ClientConfig, ConfigError};
pub use error::{ApiError, RequestResult};
pub use gateway::{Endpoint, Gateway, MediaPrefix, Method};
pub use session::SessionStore;
pub use types::{Course, Principal, Role};
