//! Backend gateway
//!
//! Single entry point for all backend traffic. The gateway:
//!
//! - probes backend reachability before dispatching, so a dead backend fails
//!   fast instead of hanging loading state;
//! - dispatches onto one of two interchangeable backend strategies (REST or
//!   BaaS) selected at construction time via capability traits;
//! - normalizes every outcome to `RequestResult<T>`: list results are never
//!   null, and expected failures never become panics;
//! - clears the persisted credential whenever a call fails with 401/403
//!   (fail-secure);
//! - logs every request/response pair for diagnosis.

pub mod baas;
pub mod endpoint;
pub mod rest;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{BackendStrategy, ClientConfig};
use crate::error::{ApiError, RequestResult};
use crate::session::SessionStore;
use crate::types::{
    AuthResponse, Course, LoginRequest, MetadataUpdate, NewCourse, Principal, RegisterRequest,
    SignupOutcome, TeacherApplication, TeacherApplicationRequest, TeacherCourseSummary,
};

pub use baas::BaasBackend;
pub use endpoint::{Endpoint, Method};
pub use rest::RestBackend;

/// Storage prefix for uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPrefix {
    /// Course images and videos.
    CourseMedia,
    /// Attached documents.
    CourseResources,
}

impl MediaPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaPrefix::CourseMedia => "course-media",
            MediaPrefix::CourseResources => "course-resources",
        }
    }
}

/// Liveness probe capability.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health_check(&self) -> RequestResult<()>;
}

/// Authentication capability of a backend strategy.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RequestResult<SignupOutcome>;
    async fn login(&self, email: &str, password: &str) -> RequestResult<AuthResponse>;
    async fn logout(&self) -> RequestResult<()>;
    async fn current_user(&self) -> RequestResult<Principal>;
    async fn verify_token(&self) -> RequestResult<Principal>;
    async fn update_metadata(
        &self,
        user_id: &str,
        metadata: &Map<String, Value>,
    ) -> RequestResult<Principal>;
    async fn apply_teacher(
        &self,
        user_id: &str,
        application: &TeacherApplication,
    ) -> RequestResult<Principal>;
}

/// Course catalog capability of a backend strategy.
#[async_trait]
pub trait CourseBackend: Send + Sync {
    async fn list_courses(&self) -> RequestResult<Vec<Course>>;
    async fn get_course(&self, id: &str) -> RequestResult<Course>;
    async fn search_courses(&self, query: &str) -> RequestResult<Vec<Course>>;
    async fn courses_by_category(&self, category: &str) -> RequestResult<Vec<Course>>;
    async fn create_course(&self, course: &NewCourse) -> RequestResult<Course>;
    async fn update_course(&self, id: &str, changes: &Value) -> RequestResult<Course>;
    async fn delete_course(&self, id: &str) -> RequestResult<()>;
    async fn teacher_courses(&self) -> RequestResult<Vec<TeacherCourseSummary>>;
    async fn upload_media(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        prefix: MediaPrefix,
    ) -> RequestResult<String>;
}

/// The unified backend gateway.
pub struct Gateway {
    auth: Arc<dyn AuthBackend>,
    courses: Arc<dyn CourseBackend>,
    probe: Arc<dyn HealthProbe>,
    session: SessionStore,
    health_timeout: std::time::Duration,
}

impl Gateway {
    /// Construct the gateway for the strategy the configuration selects.
    pub fn new(config: &ClientConfig, session: SessionStore) -> RequestResult<Self> {
        match config.backend {
            BackendStrategy::Rest => {
                let backend = Arc::new(RestBackend::new(config, session.clone())?);
                Ok(Self::with_backends(
                    backend.clone(),
                    backend.clone(),
                    backend,
                    session,
                    config.health_timeout,
                ))
            }
            BackendStrategy::Baas => {
                let backend = Arc::new(BaasBackend::new(config, session.clone())?);
                Ok(Self::with_backends(
                    backend.clone(),
                    backend.clone(),
                    backend,
                    session,
                    config.health_timeout,
                ))
            }
        }
    }

    /// Assemble a gateway from explicit capabilities. Used by tests to
    /// substitute fakes for individual seams.
    pub fn with_backends(
        auth: Arc<dyn AuthBackend>,
        courses: Arc<dyn CourseBackend>,
        probe: Arc<dyn HealthProbe>,
        session: SessionStore,
        health_timeout: std::time::Duration,
    ) -> Self {
        Self {
            auth,
            courses,
            probe,
            session,
            health_timeout,
        }
    }

    /// The session store this gateway reads credentials from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Reachability precondition: a bounded probe before any primary call.
    async fn ensure_reachable(&self) -> RequestResult<()> {
        match tokio::time::timeout(self.health_timeout, self.probe.health_check()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("Health probe failed: {}", e);
                Err(ApiError::unreachable(format!(
                    "Backend did not respond to health check: {}",
                    e
                )))
            }
            Err(_) => {
                warn!("Health probe timed out after {:?}", self.health_timeout);
                Err(ApiError::unreachable("Health check timed out"))
            }
        }
    }

    /// Probe, run the call, and apply the fail-secure rule: auth failures
    /// clear the persisted credential before propagating.
    async fn guarded<T, Fut>(&self, label: &str, call: Fut) -> RequestResult<T>
    where
        Fut: Future<Output = RequestResult<T>>,
    {
        debug!(operation = label, "gateway request");
        self.ensure_reachable().await?;
        let result = call.await;
        match &result {
            Ok(_) => debug!(operation = label, "gateway response ok"),
            Err(e) => {
                debug!(operation = label, error = %e, "gateway response error");
                if e.is_auth_failure() {
                    warn!(operation = label, "auth failure, clearing credential");
                    self.session.clear();
                }
            }
        }
        result
    }

    // --- auth surface ---

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RequestResult<SignupOutcome> {
        self.guarded("POST /auth/register", self.auth.register(email, password, username))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> RequestResult<AuthResponse> {
        self.guarded("POST /auth/login", self.auth.login(email, password))
            .await
    }

    pub async fn logout(&self) -> RequestResult<()> {
        self.guarded("POST /auth/logout", self.auth.logout()).await
    }

    pub async fn current_user(&self) -> RequestResult<Principal> {
        self.guarded("GET /auth/current-user", self.auth.current_user())
            .await
    }

    pub async fn verify_token(&self) -> RequestResult<Principal> {
        self.guarded("GET /auth/verify-token", self.auth.verify_token())
            .await
    }

    pub async fn update_metadata(
        &self,
        user_id: &str,
        metadata: &Map<String, Value>,
    ) -> RequestResult<Principal> {
        self.guarded(
            "PUT /auth/users/{id}/metadata",
            self.auth.update_metadata(user_id, metadata),
        )
        .await
    }

    pub async fn apply_teacher(
        &self,
        user_id: &str,
        application: &TeacherApplication,
    ) -> RequestResult<Principal> {
        self.guarded(
            "POST /auth/users/{id}/apply-teacher",
            self.auth.apply_teacher(user_id, application),
        )
        .await
    }

    // --- course surface ---

    pub async fn list_courses(&self) -> RequestResult<Vec<Course>> {
        self.guarded("GET /courses", self.courses.list_courses()).await
    }

    pub async fn get_course(&self, id: &str) -> RequestResult<Course> {
        self.guarded("GET /courses/{id}", self.courses.get_course(id))
            .await
    }

    /// Search the catalog. An empty or whitespace-only query resolves to an
    /// empty list immediately, without contacting the backend.
    pub async fn search_courses(&self, query: &str) -> RequestResult<Vec<Course>> {
        if query.trim().is_empty() {
            debug!("empty search query, skipping backend call");
            return Ok(Vec::new());
        }
        self.guarded("GET /courses/search", self.courses.search_courses(query))
            .await
    }

    pub async fn courses_by_category(&self, category: &str) -> RequestResult<Vec<Course>> {
        self.guarded(
            "GET /courses/category/{category}",
            self.courses.courses_by_category(category),
        )
        .await
    }

    pub async fn create_course(&self, course: &NewCourse) -> RequestResult<Course> {
        self.guarded("POST /admin/courses", self.courses.create_course(course))
            .await
    }

    pub async fn update_course(&self, id: &str, changes: &Value) -> RequestResult<Course> {
        self.guarded(
            "PUT /admin/courses/{id}",
            self.courses.update_course(id, changes),
        )
        .await
    }

    pub async fn delete_course(&self, id: &str) -> RequestResult<()> {
        self.guarded(
            "DELETE /admin/courses/{id}",
            self.courses.delete_course(id),
        )
        .await
    }

    pub async fn teacher_courses(&self) -> RequestResult<Vec<TeacherCourseSummary>> {
        self.guarded("GET /teacher/courses", self.courses.teacher_courses())
            .await
    }

    pub async fn upload_media(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        prefix: MediaPrefix,
    ) -> RequestResult<String> {
        self.guarded(
            "POST /upload",
            self.courses.upload_media(file_name, content_type, bytes, prefix),
        )
        .await
    }

    // --- dynamic surface ---

    /// Dynamic request entry: route a logical path onto the typed surface.
    ///
    /// Kept for parity with the string-keyed API the UI layer was written
    /// against; new code should prefer the typed methods above.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> RequestResult<Value> {
        debug!(
            path = path,
            method = %method,
            body = %truncate_for_log(body.as_ref()),
            "gateway dynamic request"
        );
        let endpoint = Endpoint::parse(path, method)?;
        match endpoint {
            Endpoint::Register => {
                let payload: RegisterRequest = required_body(body)?;
                let outcome = self
                    .register(&payload.email, &payload.password, &payload.username)
                    .await?;
                to_value(outcome)
            }
            Endpoint::Login => {
                let payload: LoginRequest = required_body(body)?;
                let response = self.login(&payload.email, &payload.password).await?;
                to_value(response)
            }
            Endpoint::CurrentUser => to_value(self.current_user().await?),
            Endpoint::VerifyToken => to_value(self.verify_token().await?),
            Endpoint::UpdateMetadata { user_id } => {
                let payload: MetadataUpdate = required_body(body)?;
                to_value(self.update_metadata(&user_id, &payload.metadata).await?)
            }
            Endpoint::ApplyTeacher { user_id } => {
                let payload: TeacherApplicationRequest = required_body(body)?;
                to_value(
                    self.apply_teacher(&user_id, &payload.teacher_application)
                        .await?,
                )
            }
            Endpoint::ListCourses => to_value(self.list_courses().await?),
            Endpoint::GetCourse { id } => to_value(self.get_course(&id).await?),
            Endpoint::SearchCourses { query } => to_value(self.search_courses(&query).await?),
            Endpoint::CoursesByCategory { category } => {
                to_value(self.courses_by_category(&category).await?)
            }
            Endpoint::CreateCourse => {
                let payload: NewCourse = required_body(body)?;
                to_value(self.create_course(&payload).await?)
            }
            Endpoint::UpdateCourse { id } => {
                let changes = body.ok_or_else(missing_body)?;
                to_value(self.update_course(&id, &changes).await?)
            }
            Endpoint::DeleteCourse { id } => {
                self.delete_course(&id).await?;
                Ok(json!({ "success": true }))
            }
            Endpoint::TeacherCourses => to_value(self.teacher_courses().await?),
            Endpoint::UploadMedia => Err(ApiError::validation(
                "File uploads require the typed upload_media call",
            )),
            Endpoint::HealthCheck => {
                self.ensure_reachable().await?;
                Ok(json!({ "status": "ok" }))
            }
        }
    }
}

fn required_body<T: serde::de::DeserializeOwned>(body: Option<Value>) -> RequestResult<T> {
    let body = body.ok_or_else(missing_body)?;
    serde_json::from_value(body)
        .map_err(|e| ApiError::validation(format!("Invalid request body: {}", e)))
}

fn missing_body() -> ApiError {
    ApiError::validation("Missing request body")
}

fn to_value<T: serde::Serialize>(value: T) -> RequestResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::unknown(format!("Failed to encode response: {}", e)))
}

/// Bodies are logged truncated; course payloads can be large.
fn truncate_for_log(body: Option<&Value>) -> String {
    const LIMIT: usize = 256;
    match body {
        None => "-".to_string(),
        Some(value) => {
            let mut text = value.to_string();
            if text.len() > LIMIT {
                let cut = (0..=LIMIT).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
                text.truncate(cut);
                text.push_str("...");
            }
            text
        }
    }
}
