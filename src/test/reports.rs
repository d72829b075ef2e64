#[cfg(test)]
mod tests {
    use crate::progress::mark_lesson_complete;
    use crate::reports::{compute_overview, compute_revenue_by_course};
    use crate::test::utils::test_db::TestDbBuilder;
    use rocket::tokio;

    #[tokio::test]
    async fn test_overview_revenue_ignores_free_enrollments() {
        // 2 paid enrollments at 19700 and 1 free-course enrollment:
        // revenue 39400, enrollments 3.
        let test_db = TestDbBuilder::new()
            .simple_course("paid", "Paid Course", 19700, false, 1)
            .simple_course("free", "Free Course", 0, true, 1)
            .enrollment(1, "paid")
            .enrollment(2, "paid")
            .enrollment(3, "free")
            .build()
            .await
            .expect("Failed to build test db");

        let overview = compute_overview(&test_db.pool).await.unwrap();

        assert_eq!(overview.total_revenue, 39400);
        assert_eq!(overview.total_enrollments, 3);
        assert_eq!(overview.total_students, 3);
        assert_eq!(overview.total_courses, 2);
        assert_eq!(overview.published_courses, 2);
    }

    #[tokio::test]
    async fn test_completion_rate_is_global_not_per_student() {
        // Course A: 2 lessons, 2 students. Course B: 1 lesson, 1 student.
        // One student finishes course A, nothing else happens.
        // Global rate: 2 completed / 5 slots = 40.
        // A per-student average would give (100 + 0 + 0) / 3 = 33.
        let test_db = TestDbBuilder::new()
            .simple_course("course-a", "Course A", 9900, false, 2)
            .simple_course("course-b", "Course B", 9900, false, 1)
            .enrollment(1, "course-a")
            .enrollment(2, "course-a")
            .enrollment(3, "course-b")
            .build()
            .await
            .expect("Failed to build test db");

        let a_lessons = test_db.lesson_ids("course-a").await.unwrap();
        for lesson_id in &a_lessons {
            mark_lesson_complete(&test_db.pool, 1, *lesson_id, false)
                .await
                .unwrap();
        }

        let overview = compute_overview(&test_db.pool).await.unwrap();

        assert_eq!(overview.completion_rate, 40);
    }

    #[tokio::test]
    async fn test_completion_rate_excludes_unenrolled_completions() {
        // Admin-bypass completions in a course nobody is enrolled in have no
        // matching slot in the denominator; they must not count at all.
        let test_db = TestDbBuilder::new()
            .simple_course("course-a", "Course A", 9900, false, 2)
            .simple_course("course-b", "Course B", 9900, false, 1)
            .enrollment(1, "course-b")
            .build()
            .await
            .expect("Failed to build test db");

        let a_lessons = test_db.lesson_ids("course-a").await.unwrap();
        for lesson_id in &a_lessons {
            mark_lesson_complete(&test_db.pool, 99, *lesson_id, true)
                .await
                .unwrap();
        }

        let overview = compute_overview(&test_db.pool).await.unwrap();

        // One slot (user 1 in course B), nothing completed against it.
        assert_eq!(overview.completion_rate, 0);
    }

    #[tokio::test]
    async fn test_signup_windows() {
        let test_db = TestDbBuilder::new()
            .simple_course("paid", "Paid Course", 19700, false, 1)
            .enrollment(1, "paid")
            .enrollment_days_ago(2, "paid", 3)
            .enrollment_days_ago(3, "paid", 14)
            .build()
            .await
            .expect("Failed to build test db");

        let overview = compute_overview(&test_db.pool).await.unwrap();

        assert_eq!(overview.signups_today, 1);
        assert_eq!(overview.signups_week, 2);
        assert_eq!(overview.signups_month, 3);
    }

    #[tokio::test]
    async fn test_revenue_by_course() {
        let test_db = TestDbBuilder::new()
            .simple_course("paid", "Paid Course", 19700, false, 1)
            .simple_course("free", "Free Course", 0, true, 1)
            .enrollment(1, "paid")
            .enrollment(2, "paid")
            .enrollment(3, "free")
            .build()
            .await
            .expect("Failed to build test db");

        let mut revenues = compute_revenue_by_course(&test_db.pool).await.unwrap();

        // Sorting is the caller's concern.
        revenues.sort_by_key(|r| r.course_id);
        assert_eq!(revenues.len(), 2);

        let paid = revenues
            .iter()
            .find(|r| r.course_id == test_db.course_id("paid"))
            .unwrap();
        assert_eq!(paid.revenue, 39400);
        assert_eq!(paid.enrollments, 2);

        let free = revenues
            .iter()
            .find(|r| r.course_id == test_db.course_id("free"))
            .unwrap();
        assert_eq!(free.revenue, 0);
        assert_eq!(free.enrollments, 1);
    }

    #[tokio::test]
    async fn test_overview_on_empty_store() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test db");

        let overview = compute_overview(&test_db.pool).await.unwrap();

        assert_eq!(overview.total_students, 0);
        assert_eq!(overview.total_revenue, 0);
        assert_eq!(overview.completion_rate, 0);
    }
}
