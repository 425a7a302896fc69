//! Property tests for catalog shaping
//!
//! The shelves must order deterministically: descending by their key, with
//! equal-ranked courses keeping their incoming relative order, capped at the
//! shelf size.

use proptest::prelude::*;

use skillversity_client::catalog::{self, SHELF_SIZE};
use skillversity_client::Course;

fn course_with(id: usize, enrollment: Option<u64>, score: Option<i64>) -> Course {
    serde_json::from_value(serde_json::json!({
        "id": id.to_string(),
        "title": format!("Course {}", id),
        "author": "A",
        "enrollmentCount": enrollment,
        "popularityScore": score,
    }))
    .expect("course payload decodes")
}

prop_compose! {
    fn arb_courses(max: usize)
        (rows in prop::collection::vec(
            (prop::option::of(0u64..100), prop::option::of(0i64..100)),
            0..max,
        ))
        -> Vec<Course>
    {
        rows.into_iter()
            .enumerate()
            .map(|(i, (enrollment, score))| course_with(i, enrollment, score))
            .collect()
    }
}

proptest! {
    #[test]
    fn popular_is_sorted_capped_and_stable(courses in arb_courses(20)) {
        let shelf = catalog::popular(&courses);

        prop_assert!(shelf.len() <= SHELF_SIZE);
        prop_assert_eq!(shelf.len(), courses.len().min(SHELF_SIZE));

        for pair in shelf.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (ka, kb) = (a.enrollment_count.unwrap_or(0), b.enrollment_count.unwrap_or(0));
            prop_assert!(ka >= kb, "shelf not descending: {} before {}", ka, kb);
            if ka == kb {
                // Ids are the original indices, so stability means the
                // earlier course keeps the earlier slot.
                let (ia, ib) = (
                    a.id.parse::<usize>().unwrap(),
                    b.id.parse::<usize>().unwrap(),
                );
                prop_assert!(ia < ib, "tie reordered: {} after {}", ia, ib);
            }
        }
    }

    #[test]
    fn in_demand_is_sorted_and_stable(courses in arb_courses(20)) {
        let shelf = catalog::in_demand(&courses);

        for pair in shelf.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (ka, kb) = (a.popularity_score.unwrap_or(0), b.popularity_score.unwrap_or(0));
            prop_assert!(ka >= kb);
            if ka == kb {
                prop_assert!(
                    a.id.parse::<usize>().unwrap() < b.id.parse::<usize>().unwrap()
                );
            }
        }
    }

    #[test]
    fn shelves_never_invent_courses(courses in arb_courses(20)) {
        for shelf in [
            catalog::popular(&courses),
            catalog::in_demand(&courses),
            catalog::recommended(&courses),
            catalog::recently_viewed(&courses),
        ] {
            for entry in &shelf {
                prop_assert!(courses.iter().any(|c| c.id == entry.id));
            }
        }
    }

    #[test]
    fn category_counts_sum_to_input(courses in arb_courses(20)) {
        let counts = catalog::by_category(&courses);
        let total: usize = counts.iter().map(|c| c.count).sum();
        prop_assert_eq!(total, courses.len());
    }
}
