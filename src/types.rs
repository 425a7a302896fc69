//! Data model
//!
//! Wire types shared with both backend strategies. The REST API emits
//! camelCase course fields while the BaaS tables use snake_case columns;
//! serde aliases let one set of structs decode both.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reward granted for a correct quiz answer, fixed by marketplace policy.
pub const QUIZ_REWARD: u32 = 100;

/// Default reward for a practical task; operators may edit it per task.
pub const DEFAULT_TASK_REWARD: u32 = 200;

/// Number of option slots the quiz builder UI presents.
pub const QUIZ_OPTION_SLOTS: usize = 4;

/// Account role. One-way transitions only: student to teacher via an
/// approved application, anything to admin out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

/// Authenticated identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    /// Open map: balance, teacher application record, anything the
    /// marketplace attaches later.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A course as the catalog presents it.
///
/// `price` is a display string ("Free" or a currency-prefixed amount); there
/// is no numeric price field anywhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,
    #[serde(rename = "viewCount", alias = "view_count", default)]
    pub view_count: Option<u64>,
    #[serde(rename = "enrollmentCount", alias = "enrollment_count", default)]
    pub enrollment_count: Option<u64>,
    #[serde(rename = "popularityScore", alias = "popularity_score", default)]
    pub popularity_score: Option<i64>,
    #[serde(default)]
    pub resources: Vec<CourseResource>,
}

impl Course {
    /// The sole free/paid discriminator: a literal "Free", an empty price,
    /// or a zero-value currency string.
    pub fn is_free(&self) -> bool {
        let price = self.price.as_deref().map(str::trim).unwrap_or("");
        if price.is_empty() || price.eq_ignore_ascii_case("free") {
            return true;
        }
        let digits: String = price
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        digits.parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
    }
}

/// An uploaded file attached to a course. Owned by its course; no
/// independent lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResource {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "uploadedAt", alias = "uploaded_at", default)]
    pub uploaded_at: Option<String>,
}

/// A quiz question authored in the course builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    /// Ordered option texts; `validate` caps the count at
    /// `QUIZ_OPTION_SLOTS`.
    pub options: Vec<String>,
    /// Index into `options`.
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
    /// Seconds allowed for an answer.
    #[serde(rename = "timeLimit")]
    pub time_limit: u32,
    #[serde(default = "default_quiz_reward")]
    pub reward: u32,
}

fn default_quiz_reward() -> u32 {
    QUIZ_REWARD
}

impl QuizQuestion {
    pub fn new(question: impl Into<String>, options: Vec<String>, correct_answer: usize, time_limit: u32) -> Self {
        Self {
            question: question.into(),
            options,
            correct_answer,
            time_limit,
            reward: QUIZ_REWARD,
        }
    }

    /// Builder-side validation: the option count must fit the builder's
    /// slots and the answer index must point at an option.
    pub fn validate(&self) -> Result<(), crate::error::ApiError> {
        if self.options.is_empty() {
            return Err(crate::error::ApiError::validation(
                "Quiz question has no options",
            ));
        }
        if self.options.len() > QUIZ_OPTION_SLOTS {
            return Err(crate::error::ApiError::validation(format!(
                "Quiz question has {} options, the builder supports {}",
                self.options.len(),
                QUIZ_OPTION_SLOTS
            )));
        }
        if self.correct_answer >= self.options.len() {
            return Err(crate::error::ApiError::validation(format!(
                "Correct answer index {} is out of range for {} options",
                self.correct_answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}

/// A practical task authored in the course builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticalTask {
    pub description: String,
    #[serde(rename = "expectedOutcome")]
    pub expected_outcome: String,
    #[serde(default = "default_task_reward")]
    pub reward: u32,
}

fn default_task_reward() -> u32 {
    DEFAULT_TASK_REWARD
}

/// One lesson inside a course creation payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourseLesson {
    pub title: String,
    pub content: String,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(rename = "pdfUrl", default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(rename = "externalLinks", default, skip_serializing_if = "Vec::is_empty")]
    pub external_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quiz: Vec<QuizQuestion>,
    #[serde(rename = "practicalTask", default, skip_serializing_if = "Option::is_none")]
    pub practical_task: Option<PracticalTask>,
}

/// Course creation payload submitted by teachers and admins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lessons: Vec<CourseLesson>,
    #[serde(rename = "isDraft", default)]
    pub is_draft: bool,
}

/// A teacher application stored in principal metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherApplication {
    pub qualification: String,
    pub experience: String,
    pub specialization: String,
    #[serde(default = "default_application_status")]
    pub status: String,
    #[serde(rename = "submittedAt", default)]
    pub submitted_at: Option<String>,
}

fn default_application_status() -> String {
    "pending".to_string()
}

/// Teacher dashboard row derived from a course record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherCourseSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(rename = "enrollmentCount", alias = "enrollment_count", default)]
    pub enrollment_count: u64,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(rename = "averageRating", default)]
    pub average_rating: f64,
}

fn default_price() -> String {
    "Free".to_string()
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

fn default_status() -> String {
    // No draft workflow on the dashboard yet.
    "published".to_string()
}

impl From<Course> for TeacherCourseSummary {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            enrollment_count: course.enrollment_count.unwrap_or(0),
            price: course.price.filter(|p| !p.is_empty()).unwrap_or_else(default_price),
            // No updated_at column exists; creation time stands in.
            last_updated: course.created_at.clone(),
            created_at: course.created_at,
            category: course
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(default_category),
            status: default_status(),
            average_rating: course.rating.unwrap_or(0.0),
        }
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Principal,
    /// Session expiry; only the BaaS strategy reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Registration outcome. The REST API returns only an acknowledgement; the
/// BaaS may return a ready session. Both decode here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupOutcome {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<Principal>,
}

/// Token verification payload from the REST API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<Principal>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// Metadata update request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub metadata: Map<String, Value>,
}

/// Teacher application request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherApplicationRequest {
    #[serde(rename = "teacherApplication")]
    pub teacher_application: TeacherApplication,
    #[serde(default)]
    pub role: Option<String>,
}

/// Ids arrive as strings from the BaaS and integers from the REST API.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
