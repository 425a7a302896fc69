//! Query handles
//!
//! Reactive wrappers over individual gateway calls. Each handle exposes a
//! `{data, is_loading, error}` snapshot for rendering plus an imperative
//! `fetch` for on-demand use, covering both eager dashboard sections and
//! on-submit forms.
//!
//! Overlapping fetches on one handle are generation-tagged: a response only
//! commits if no newer fetch has started since it was dispatched, so a slow
//! stale response can never overwrite a newer result regardless of
//! resolution order. Errors reach consumers through both channels, the
//! snapshot and the `fetch` return value, so either may be used without
//! losing the signal.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::error::RequestResult;
use crate::gateway::Gateway;
use crate::types::{Course, NewCourse, TeacherCourseSummary};

/// Render-ready view of a query.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> QuerySnapshot<T> {
    fn idle(is_loading: bool) -> Self {
        Self {
            data: None,
            is_loading,
            error: None,
        }
    }
}

/// Shared query state with a generation counter guarding against
/// out-of-order resolutions.
#[derive(Debug)]
pub struct Query<T> {
    state: Arc<Mutex<QuerySnapshot<T>>>,
    generation: Arc<AtomicU64>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<T: Clone> Query<T> {
    /// `loading` marks handles that fetch immediately on construction, so
    /// consumers see a spinner before the first poll.
    fn new(loading: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(QuerySnapshot::idle(loading))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current state for rendering.
    pub fn snapshot(&self) -> QuerySnapshot<T> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a fetch: take a generation ticket and mark loading. Existing
    /// data stays visible while the refetch is in flight.
    fn begin(&self) -> u64 {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_loading = true;
        state.error = None;
        ticket
    }

    /// Commit a resolution if its ticket is still current; superseded
    /// resolutions are dropped.
    fn commit(&self, ticket: u64, result: &RequestResult<T>) {
        if self.generation.load(Ordering::SeqCst) != ticket {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(value) => {
                state.data = Some(value.clone());
                state.error = None;
            }
            Err(e) => {
                state.data = None;
                state.error = Some(e.to_string());
            }
        }
        state.is_loading = false;
    }

    /// Resolve immediately with a known value, without any request.
    fn resolve(&self, value: T) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit(ticket, &Ok(value));
    }

    /// Run one fetch to completion under a generation ticket.
    async fn run<Fut>(&self, fut: Fut) -> RequestResult<T>
    where
        Fut: Future<Output = RequestResult<T>>,
    {
        let ticket = self.begin();
        let result = fut.await;
        self.commit(ticket, &result);
        result
    }
}

macro_rules! spawn_immediate {
    ($handle:expr) => {{
        let eager = $handle.clone();
        tokio::spawn(async move {
            let _ = eager.fetch().await;
        });
    }};
}

/// All courses in the catalog.
#[derive(Clone)]
pub struct CourseListQuery {
    gateway: Arc<Gateway>,
    query: Query<Vec<Course>>,
}

impl CourseListQuery {
    /// `immediate` fetches on construction; requires a Tokio runtime.
    pub fn new(gateway: Arc<Gateway>, immediate: bool) -> Self {
        let handle = Self {
            gateway,
            query: Query::new(immediate),
        };
        if immediate {
            spawn_immediate!(handle);
        }
        handle
    }

    pub async fn fetch(&self) -> RequestResult<Vec<Course>> {
        let gateway = Arc::clone(&self.gateway);
        self.query.run(async move { gateway.list_courses().await }).await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Vec<Course>> {
        self.query.snapshot()
    }
}

/// One course with its resources.
#[derive(Clone)]
pub struct CourseDetailsQuery {
    gateway: Arc<Gateway>,
    id: String,
    query: Query<Course>,
}

impl CourseDetailsQuery {
    pub fn new(gateway: Arc<Gateway>, id: impl Into<String>, immediate: bool) -> Self {
        let handle = Self {
            gateway,
            id: id.into(),
            query: Query::new(immediate),
        };
        if immediate {
            spawn_immediate!(handle);
        }
        handle
    }

    pub async fn fetch(&self) -> RequestResult<Course> {
        let gateway = Arc::clone(&self.gateway);
        let id = self.id.clone();
        self.query.run(async move { gateway.get_course(&id).await }).await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Course> {
        self.query.snapshot()
    }
}

/// Catalog search. Always on-demand: the term arrives with each fetch.
#[derive(Clone)]
pub struct SearchCoursesQuery {
    gateway: Arc<Gateway>,
    query: Query<Vec<Course>>,
}

impl SearchCoursesQuery {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            query: Query::new(false),
        }
    }

    /// An empty or whitespace-only term resolves "no results, not loading"
    /// without issuing a request, so wiring this to live input cannot cause
    /// a request storm.
    pub async fn fetch(&self, term: &str) -> RequestResult<Vec<Course>> {
        if term.trim().is_empty() {
            self.query.resolve(Vec::new());
            return Ok(Vec::new());
        }
        let gateway = Arc::clone(&self.gateway);
        let term = term.to_string();
        self.query
            .run(async move { gateway.search_courses(&term).await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Vec<Course>> {
        self.query.snapshot()
    }
}

/// Courses in one category.
#[derive(Clone)]
pub struct CategoryCoursesQuery {
    gateway: Arc<Gateway>,
    category: String,
    query: Query<Vec<Course>>,
}

impl CategoryCoursesQuery {
    pub fn new(gateway: Arc<Gateway>, category: impl Into<String>, immediate: bool) -> Self {
        let handle = Self {
            gateway,
            category: category.into(),
            query: Query::new(immediate),
        };
        if immediate {
            spawn_immediate!(handle);
        }
        handle
    }

    pub async fn fetch(&self) -> RequestResult<Vec<Course>> {
        let gateway = Arc::clone(&self.gateway);
        let category = self.category.clone();
        self.query
            .run(async move { gateway.courses_by_category(&category).await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Vec<Course>> {
        self.query.snapshot()
    }
}

/// The signed-in teacher's dashboard rows.
#[derive(Clone)]
pub struct TeacherCoursesQuery {
    gateway: Arc<Gateway>,
    query: Query<Vec<TeacherCourseSummary>>,
}

impl TeacherCoursesQuery {
    pub fn new(gateway: Arc<Gateway>, immediate: bool) -> Self {
        let handle = Self {
            gateway,
            query: Query::new(immediate),
        };
        if immediate {
            spawn_immediate!(handle);
        }
        handle
    }

    pub async fn fetch(&self) -> RequestResult<Vec<TeacherCourseSummary>> {
        let gateway = Arc::clone(&self.gateway);
        self.query
            .run(async move { gateway.teacher_courses().await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Vec<TeacherCourseSummary>> {
        self.query.snapshot()
    }
}

/// Course creation. On-demand only.
#[derive(Clone)]
pub struct CreateCourseQuery {
    gateway: Arc<Gateway>,
    query: Query<Course>,
}

impl CreateCourseQuery {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            query: Query::new(false),
        }
    }

    pub async fn fetch(&self, course: &NewCourse) -> RequestResult<Course> {
        let gateway = Arc::clone(&self.gateway);
        let course = course.clone();
        self.query
            .run(async move { gateway.create_course(&course).await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Course> {
        self.query.snapshot()
    }
}

/// Course update. On-demand only.
#[derive(Clone)]
pub struct UpdateCourseQuery {
    gateway: Arc<Gateway>,
    id: String,
    query: Query<Course>,
}

impl UpdateCourseQuery {
    pub fn new(gateway: Arc<Gateway>, id: impl Into<String>) -> Self {
        Self {
            gateway,
            id: id.into(),
            query: Query::new(false),
        }
    }

    pub async fn fetch(&self, changes: Value) -> RequestResult<Course> {
        let gateway = Arc::clone(&self.gateway);
        let id = self.id.clone();
        self.query
            .run(async move { gateway.update_course(&id, &changes).await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<Course> {
        self.query.snapshot()
    }
}

/// Course deletion. On-demand only.
#[derive(Clone)]
pub struct DeleteCourseQuery {
    gateway: Arc<Gateway>,
    id: String,
    query: Query<()>,
}

impl DeleteCourseQuery {
    pub fn new(gateway: Arc<Gateway>, id: impl Into<String>) -> Self {
        Self {
            gateway,
            id: id.into(),
            query: Query::new(false),
        }
    }

    pub async fn fetch(&self) -> RequestResult<()> {
        let gateway = Arc::clone(&self.gateway);
        let id = self.id.clone();
        self.query
            .run(async move { gateway.delete_course(&id).await })
            .await
    }

    pub fn snapshot(&self) -> QuerySnapshot<()> {
        self.query.snapshot()
    }
}
