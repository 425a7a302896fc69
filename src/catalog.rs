//! Catalog shaping
//!
//! Pure functions deriving the home-page shelves from a flat course
//! collection. Every sort is stable, so equal-ranked courses keep their
//! incoming relative order and repeated renders do not visibly reshuffle.

use serde::Serialize;

use crate::types::Course;

/// Courses per shelf.
pub const SHELF_SIZE: usize = 6;

/// One category with its course count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

fn top_by<K: Ord>(courses: &[Course], key: impl Fn(&Course) -> K) -> Vec<Course> {
    let mut shelf: Vec<Course> = courses.to_vec();
    // sort_by is stable; descending order via reversed key comparison.
    shelf.sort_by(|a, b| key(b).cmp(&key(a)));
    shelf.truncate(SHELF_SIZE);
    shelf
}

/// Most recently created courses.
///
/// There is no per-user view-history tracking; despite the name this shelf
/// orders by creation time. Timestamps are ISO-8601 strings, which order
/// correctly under lexicographic comparison; courses without one sort last.
pub fn recently_viewed(courses: &[Course]) -> Vec<Course> {
    top_by(courses, |c| c.created_at.clone().unwrap_or_default())
}

/// Highest enrollment first; missing counts rank as zero.
pub fn popular(courses: &[Course]) -> Vec<Course> {
    top_by(courses, |c| c.enrollment_count.unwrap_or(0))
}

/// Highest rating first; missing ratings rank as zero.
pub fn recommended(courses: &[Course]) -> Vec<Course> {
    let mut shelf: Vec<Course> = courses.to_vec();
    shelf.sort_by(|a, b| {
        let (ra, rb) = (a.rating.unwrap_or(0.0), b.rating.unwrap_or(0.0));
        rb.total_cmp(&ra)
    });
    shelf.truncate(SHELF_SIZE);
    shelf
}

/// Highest popularity score first; missing scores rank as zero.
pub fn in_demand(courses: &[Course]) -> Vec<Course> {
    top_by(courses, |c| c.popularity_score.unwrap_or(0))
}

/// Group courses by category into `{name, count}` pairs, in first-seen
/// category order. Uncategorized courses fall into "Uncategorized".
pub fn by_category(courses: &[Course]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for course in courses {
        let name = course
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("Uncategorized");
        match counts.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    counts
}
