//! BaaS backend
//!
//! Talks directly to the managed backend's HTTP surface: `auth/v1` for
//! sessions, `rest/v1` for the `courses`, `course_resources` and `profiles`
//! tables, `rpc` for the view counter and `storage/v1` for uploaded media.
//! Course table columns map 1:1 onto the `Course` entity; the `profiles`
//! table holds the principal fields.
//!
//! Metadata merging is client-driven here (fetch, shallow-merge, update),
//! unlike the REST API where the server merges.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ApiError, RequestResult};
use crate::gateway::{AuthBackend, CourseBackend, HealthProbe, MediaPrefix};
use crate::session::SessionStore;
use crate::types::{
    AuthResponse, Course, CourseResource, NewCourse, Principal, Role, SignupOutcome,
    TeacherApplication, TeacherCourseSummary,
};

/// Storage bucket for all uploaded course content.
const STORAGE_BUCKET: &str = "course-content";

/// Auth user record as the BaaS returns it.
#[derive(Debug, Clone, Deserialize)]
struct BaasUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Session payload from `auth/v1`.
#[derive(Debug, Clone, Deserialize)]
struct BaasSession {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: BaasUser,
}

/// BaaS HTTP client.
pub struct BaasBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SessionStore,
}

impl BaasBackend {
    pub fn new(config: &ClientConfig, session: SessionStore) -> RequestResult<Self> {
        let anon_key = config
            .anon_key
            .clone()
            .ok_or(ConfigError::MissingValue("anon_key"))
            .map_err(|e| ApiError::unknown(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            anon_key,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Every call carries the anon API key; the bearer is the session
    /// credential when present, the anon key otherwise.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.session.token().unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

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

    async fn expect_success(response: Response) -> RequestResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or(body);
        Err(ApiError::from_status(status.as_u16(), message))
    }

    /// Fetch the profile row for a user; a missing row is tolerated and
    /// yields defaults, matching the "row not found" handling upstream.
    async fn fetch_profile(&self, user_id: &str) -> RequestResult<ProfileRow> {
        let response = self
            .authorized(self.http.get(self.url("/rest/v1/profiles")))
            .query(&[("id", format!("eq.{}", user_id)), ("select", "*".to_string())])
            .send()
            .await?;
        let rows: Vec<ProfileRow> = Self::decode(response).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// Patch the profile row and return the updated representation.
    async fn patch_profile(&self, user_id: &str, changes: Value) -> RequestResult<ProfileRow> {
        let response = self
            .authorized(self.http.patch(self.url("/rest/v1/profiles")))
            .query(&[("id", format!("eq.{}", user_id))])
            .header("Prefer", "return=representation")
            .json(&changes)
            .send()
            .await?;
        let rows: Vec<ProfileRow> = Self::decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Profile not found"))
    }

    /// Combine the auth user and its profile row into a principal.
    fn principal_from(user: &BaasUser, profile: ProfileRow) -> Principal {
        let metadata_username = user
            .user_metadata
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string);
        Principal {
            id: user.id.clone(),
            email: user
                .email
                .clone()
                .or(profile.email)
                .unwrap_or_default(),
            username: profile
                .username
                .or(metadata_username)
                .unwrap_or_default(),
            role: profile.role.unwrap_or_default(),
            created_at: user.created_at.clone().or(profile.created_at),
            last_login: profile.last_login,
            metadata: profile.metadata.unwrap_or_default(),
        }
    }

    fn principal_from_profile(profile: ProfileRow) -> Principal {
        Principal {
            id: profile.id.unwrap_or_default(),
            email: profile.email.unwrap_or_default(),
            username: profile.username.unwrap_or_default(),
            role: profile.role.unwrap_or_default(),
            created_at: profile.created_at,
            last_login: profile.last_login,
            metadata: profile.metadata.unwrap_or_default(),
        }
    }

    async fn auth_user(&self) -> RequestResult<BaasUser> {
        if self.session.token().is_none() {
            return Err(ApiError::unauthenticated("No active session"));
        }
        let response = self
            .authorized(self.http.get(self.url("/auth/v1/user")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn courses_where(&self, filters: &[(&str, String)]) -> RequestResult<Vec<Course>> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend_from_slice(filters);
        let response = self
            .authorized(self.http.get(self.url("/rest/v1/courses")))
            .query(&query)
            .send()
            .await?;
        let courses: Option<Vec<Course>> = Self::decode(response).await?;
        Ok(courses.unwrap_or_default())
    }
}

/// Pull the message out of a BaaS error body; the shape varies across
/// auth, rest and storage services.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["msg", "message", "error_description", "error"] {
        if let Some(message) = value.get(key).and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }
    None
}

#[async_trait]
impl HealthProbe for BaasBackend {
    async fn health_check(&self) -> RequestResult<()> {
        let response = self
            .http
            .get(self.url("/auth/v1/health"))
            .header("apikey", &self.anon_key)
            .send()
            .await?;
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
impl AuthBackend for BaasBackend {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> RequestResult<SignupOutcome> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "username": username },
        });
        let response = self
            .authorized(self.http.post(self.url("/auth/v1/signup")))
            .json(&body)
            .send()
            .await?;
        let value: Value = Self::decode(response).await?;
        let token = value
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string);
        let user = value
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value::<BaasUser>(u).ok())
            .map(|u| Self::principal_from(&u, ProfileRow::default()));
        Ok(SignupOutcome { token, user })
    }

    async fn login(&self, email: &str, password: &str) -> RequestResult<AuthResponse> {
        let response = self
            .authorized(self.http.post(self.url("/auth/v1/token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        // "Email not confirmed" errors surface verbatim for the UI.
        let session: BaasSession = Self::decode(response).await?;

        // Stamp last_login; best effort only, a failure must not fail the
        // sign-in itself.
        let stamp = self
            .http
            .patch(self.url("/rest/v1/profiles"))
            .query(&[("id", format!("eq.{}", session.user.id))])
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .json(&json!({ "last_login": Utc::now().to_rfc3339() }))
            .send()
            .await;
        if let Err(e) = stamp {
            warn!("Failed to stamp last_login: {}", e);
        }

        let expires_at = session
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));
        let user = Self::principal_from(&session.user, ProfileRow::default());
        Ok(AuthResponse {
            token: session.access_token,
            user,
            expires_at,
        })
    }

    async fn logout(&self) -> RequestResult<()> {
        let response = self
            .authorized(self.http.post(self.url("/auth/v1/logout")))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn current_user(&self) -> RequestResult<Principal> {
        let user = self.auth_user().await?;
        let profile = self.fetch_profile(&user.id).await?;
        Ok(Self::principal_from(&user, profile))
    }

    async fn verify_token(&self) -> RequestResult<Principal> {
        // A session is valid exactly when the auth user resolves.
        self.current_user().await
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        metadata: &Map<String, Value>,
    ) -> RequestResult<Principal> {
        let existing = self.fetch_profile(user_id).await?;
        let mut merged = existing.metadata.unwrap_or_default();
        for (key, value) in metadata {
            merged.insert(key.clone(), value.clone());
        }
        let profile = self
            .patch_profile(user_id, json!({ "metadata": merged }))
            .await?;
        Ok(Self::principal_from_profile(profile))
    }

    async fn apply_teacher(
        &self,
        user_id: &str,
        application: &TeacherApplication,
    ) -> RequestResult<Principal> {
        let mut application = application.clone();
        application.status = "pending".to_string();
        application.submitted_at = Some(Utc::now().to_rfc3339());

        let existing = self.fetch_profile(user_id).await?;
        let mut merged = existing.metadata.unwrap_or_default();
        merged.insert(
            "teacherApplication".to_string(),
            serde_json::to_value(&application)
                .map_err(|e| ApiError::unknown(format!("Failed to encode application: {}", e)))?,
        );

        // Applications are auto-approved: the role flips with the update.
        let profile = self
            .patch_profile(user_id, json!({ "metadata": merged, "role": "teacher" }))
            .await?;
        Ok(Self::principal_from_profile(profile))
    }
}

#[async_trait]
impl CourseBackend for BaasBackend {
    async fn list_courses(&self) -> RequestResult<Vec<Course>> {
        self.courses_where(&[("order", "created_at.desc".to_string())])
            .await
    }

    async fn get_course(&self, id: &str) -> RequestResult<Course> {
        // Record the view first; a counter failure must not hide the course.
        let increment = self
            .authorized(self.http.post(self.url("/rest/v1/rpc/increment_view_count")))
            .json(&json!({ "course_id": id }))
            .send()
            .await;
        if let Err(e) = increment {
            warn!("Failed to increment view count for course {}: {}", id, e);
        }

        let mut course = self
            .courses_where(&[("id", format!("eq.{}", id))])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let response = self
            .authorized(self.http.get(self.url("/rest/v1/course_resources")))
            .query(&[
                ("course_id", format!("eq.{}", id)),
                ("select", "*".to_string()),
            ])
            .send()
            .await?;
        let resources: Option<Vec<CourseResource>> = Self::decode(response).await?;
        course.resources = resources.unwrap_or_default();
        Ok(course)
    }

    async fn search_courses(&self, query: &str) -> RequestResult<Vec<Course>> {
        let pattern = format!(
            "(title.ilike.*{q}*,description.ilike.*{q}*,category.ilike.*{q}*,author.ilike.*{q}*)",
            q = query
        );
        self.courses_where(&[("or", pattern)]).await
    }

    async fn courses_by_category(&self, category: &str) -> RequestResult<Vec<Course>> {
        self.courses_where(&[("category", format!("eq.{}", category))])
            .await
    }

    async fn create_course(&self, course: &NewCourse) -> RequestResult<Course> {
        // Only the catalog columns exist on the table; lesson content lives
        // in uploaded resources.
        let row = json!([{
            "title": course.title,
            "description": course.description,
            "author": course.author,
            "image": course.image,
            "duration": course.duration,
            "price": course.price,
            "category": course.category,
        }]);
        let response = self
            .authorized(self.http.post(self.url("/rest/v1/courses")))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Course> = Self::decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::unknown("Insert returned no rows"))
    }

    async fn update_course(&self, id: &str, changes: &Value) -> RequestResult<Course> {
        let response = self
            .authorized(self.http.patch(self.url("/rest/v1/courses")))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await?;
        let rows: Vec<Course> = Self::decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Course not found"))
    }

    async fn delete_course(&self, id: &str) -> RequestResult<()> {
        let response = self
            .authorized(self.http.delete(self.url("/rest/v1/courses")))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn teacher_courses(&self) -> RequestResult<Vec<TeacherCourseSummary>> {
        let principal = self.current_user().await?;
        if principal.username.is_empty() {
            // No username means no authored courses.
            return Ok(Vec::new());
        }
        let courses = self
            .courses_where(&[("author", format!("eq.{}", principal.username))])
            .await?;
        Ok(courses.into_iter().map(TeacherCourseSummary::from).collect())
    }

    async fn upload_media(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        prefix: MediaPrefix,
    ) -> RequestResult<String> {
        let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("bin");
        let object_path = format!(
            "{}/{}-{}.{}",
            prefix.as_str(),
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );
        let response = self
            .authorized(self.http.post(self.url(&format!(
                "/storage/v1/object/{}/{}",
                STORAGE_BUCKET, object_path
            ))))
            .header("Content-Type", content_type)
            .header("Cache-Control", "3600")
            .body(bytes)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(self.url(&format!(
            "/storage/v1/object/public/{}/{}",
            STORAGE_BUCKET, object_path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(
            extract_message(r#"{"msg": "Email not confirmed"}"#),
            Some("Email not confirmed".to_string())
        );
        assert_eq!(
            extract_message(r#"{"error_description": "Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(extract_message("<html>"), None);
    }

    #[test]
    fn test_principal_prefers_profile_fields() {
        let user = BaasUser {
            id: "u1".to_string(),
            email: Some("a@b.c".to_string()),
            created_at: Some("2024-01-01T00:00:00Z".to_string()),
            user_metadata: serde_json::from_value(json!({ "username": "from_auth" })).unwrap(),
        };
        let profile = ProfileRow {
            username: Some("from_profile".to_string()),
            role: Some(Role::Teacher),
            ..Default::default()
        };
        let principal = BaasBackend::principal_from(&user, profile);
        assert_eq!(principal.username, "from_profile");
        assert_eq!(principal.role, Role::Teacher);
        assert_eq!(principal.email, "a@b.c");
    }

    #[test]
    fn test_principal_falls_back_to_auth_metadata() {
        let user = BaasUser {
            id: "u1".to_string(),
            email: Some("a@b.c".to_string()),
            created_at: None,
            user_metadata: serde_json::from_value(json!({ "username": "from_auth" })).unwrap(),
        };
        let principal = BaasBackend::principal_from(&user, ProfileRow::default());
        assert_eq!(principal.username, "from_auth");
        assert_eq!(principal.role, Role::Student);
    }
}
