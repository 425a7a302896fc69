//! REST backend
//!
//! Talks to the Skillversity REST API. Every request carries
//! `Authorization: Bearer <credential>` when a credential is present;
//! responses are decoded from JSON with the backend's `message` field
//! preserved on failures.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{ApiError, RequestResult};
use crate::gateway::{AuthBackend, CourseBackend, HealthProbe, MediaPrefix};
use crate::session::SessionStore;
use crate::types::{
    AuthResponse, Course, LoginRequest, MetadataUpdate, NewCourse, Principal, RegisterRequest,
    SignupOutcome, TeacherApplication, TeacherApplicationRequest, TeacherCourseSummary,
    VerifyResponse,
};

/// REST API client.
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl RestBackend {
    pub fn new(config: &ClientConfig, session: SessionStore) -> RequestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential when one is present.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Decode a response, mapping failure statuses onto the error taxonomy
    /// with the backend's `message` field preserved.
    async fn decode<T: DeserializeOwned>(response: Response) -> RequestResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_message(&body).unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });
            return Err(ApiError::from_status(status.as_u16(), message));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))
    }

    /// List endpoints normalize an absent collection to empty, never null.
    async fn decode_list<T: DeserializeOwned>(response: Response) -> RequestResult<Vec<T>> {
        let items: Option<Vec<T>> = Self::decode(response).await?;
        Ok(items.unwrap_or_default())
    }
}

/// Pull the `message` field out of a JSON error body.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl HealthProbe for RestBackend {
    async fn health_check(&self) -> RequestResult<()> {
        // Liveness probe, no auth.
        let response = self.http.get(self.url("/health-check")).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::unreachable(format!(
                "Health check failed with status {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RequestResult<SignupOutcome> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            username: username.to_string(),
        };
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn login(&self, email: &str, password: &str) -> RequestResult<AuthResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn logout(&self) -> RequestResult<()> {
        // The REST API has no server-side session to invalidate; sign-out is
        // purely local credential removal.
        Ok(())
    }

    async fn current_user(&self) -> RequestResult<Principal> {
        let response = self
            .authorized(self.http.get(self.url("/auth/current-user")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn verify_token(&self) -> RequestResult<Principal> {
        let response = self
            .authorized(self.http.get(self.url("/auth/verify-token")))
            .send()
            .await?;
        let verification: VerifyResponse = Self::decode(response).await?;
        match (verification.valid, verification.user) {
            (true, Some(user)) => Ok(user),
            _ => Err(ApiError::unauthenticated("Session is no longer valid")),
        }
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        metadata: &Map<String, Value>,
    ) -> RequestResult<Principal> {
        let body = MetadataUpdate {
            metadata: metadata.clone(),
        };
        let response = self
            .authorized(
                self.http
                    .put(self.url(&format!("/auth/users/{}/metadata", user_id))),
            )
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn apply_teacher(
        &self,
        user_id: &str,
        application: &TeacherApplication,
    ) -> RequestResult<Principal> {
        let body = TeacherApplicationRequest {
            teacher_application: application.clone(),
            role: Some("teacher".to_string()),
        };
        let response = self
            .authorized(
                self.http
                    .post(self.url(&format!("/auth/users/{}/apply-teacher", user_id))),
            )
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl CourseBackend for RestBackend {
    async fn list_courses(&self) -> RequestResult<Vec<Course>> {
        let response = self
            .authorized(self.http.get(self.url("/courses")))
            .send()
            .await?;
        Self::decode_list(response).await
    }

    async fn get_course(&self, id: &str) -> RequestResult<Course> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/courses/{}", id))))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn search_courses(&self, query: &str) -> RequestResult<Vec<Course>> {
        let response = self
            .authorized(
                self.http
                    .get(self.url("/courses/search"))
                    .query(&[("q", query)]),
            )
            .send()
            .await?;
        Self::decode_list(response).await
    }

    async fn courses_by_category(&self, category: &str) -> RequestResult<Vec<Course>> {
        let response = self
            .authorized(
                self.http
                    .get(self.url(&format!("/courses/category/{}", category))),
            )
            .send()
            .await?;
        Self::decode_list(response).await
    }

    async fn create_course(&self, course: &NewCourse) -> RequestResult<Course> {
        let response = self
            .authorized(self.http.post(self.url("/admin/courses")))
            .json(course)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_course(&self, id: &str, changes: &Value) -> RequestResult<Course> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/admin/courses/{}", id))))
            .json(changes)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete_course(&self, id: &str) -> RequestResult<()> {
        let response = self
            .authorized(
                self.http
                    .delete(self.url(&format!("/admin/courses/{}", id))),
            )
            .send()
            .await?;
        let _: Value = Self::decode(response).await?;
        Ok(())
    }

    async fn teacher_courses(&self) -> RequestResult<Vec<TeacherCourseSummary>> {
        let response = self
            .authorized(self.http.get(self.url("/teacher/courses")))
            .send()
            .await?;
        let courses: Vec<Course> = Self::decode_list(response).await?;
        Ok(courses.into_iter().map(TeacherCourseSummary::from).collect())
    }

    async fn upload_media(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        prefix: MediaPrefix,
    ) -> RequestResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ApiError::validation(format!("Invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("type", prefix.as_str());
        let response = self
            .authorized(self.http.post(self.url("/upload")))
            .multipart(form)
            .send()
            .await?;
        let body: Value = Self::decode(response).await?;
        body.get("fileUrl")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::unknown("Upload response missing fileUrl"))
    }
}
