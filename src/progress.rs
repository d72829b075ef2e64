use crate::catalog::{count_course_lessons, get_lesson_course_id};
use crate::enrollment::{is_enrolled, list_enrollments};
use crate::error::AppError;
use crate::models::{DbCourse, DbLessonProgress, LessonProgress};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CourseProgress {
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
}

#[derive(Serialize, Clone)]
pub struct EnrolledCourseProgress {
    pub course_id: i64,
    pub course_title: String,
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
}

#[derive(Serialize, Clone)]
pub struct OverallProgress {
    pub courses: Vec<EnrolledCourseProgress>,
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
}

/// Rounded completion percentage. A course with no lessons is never "in
/// progress", so an empty total is 0, not 100.
pub fn percentage(completed: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i64
}

/// Records a lesson as completed for a user. Upsert semantics: one row per
/// (user, lesson), `completed_at` is set on the first transition only and
/// never refreshed, so repeated calls are no-ops returning the existing row.
/// `bypass_gate` is the admin capability from the auth collaborator.
#[instrument(skip(pool))]
pub async fn mark_lesson_complete(
    pool: &Pool<Sqlite>,
    user_id: i64,
    lesson_id: i64,
    bypass_gate: bool,
) -> Result<LessonProgress, AppError> {
    info!("Marking lesson complete");

    let course_id = get_lesson_course_id(pool, lesson_id).await?;

    if !bypass_gate && !is_enrolled(pool, user_id, course_id).await? {
        return Err(AppError::AccessDenied(format!(
            "User {} is not enrolled in course {}",
            user_id, course_id
        )));
    }

    let now = Utc::now().naive_utc();
    sqlx::query(
        "INSERT INTO lesson_progress (user_id, lesson_id, completed, completed_at)
         VALUES (?, ?, 1, ?)
         ON CONFLICT (user_id, lesson_id)
         DO UPDATE SET completed = 1,
                       completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)",
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, DbLessonProgress>(
        "SELECT * FROM lesson_progress WHERE user_id = ? AND lesson_id = ?",
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_one(pool)
    .await?;

    Ok(LessonProgress::from(row))
}

/// Completed/total/percentage for one course, computed against the current
/// catalog on every read. Lessons added after a user reached 100% lower the
/// percentage on the next call.
#[instrument(skip(pool))]
pub async fn get_course_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<CourseProgress, AppError> {
    let course_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    if course_exists.is_none() {
        return Err(AppError::NotFound(format!(
            "Course with id {} not found",
            course_id
        )));
    }

    let total_count = count_course_lessons(pool, course_id).await?;
    let completed_count = count_completed_lessons(pool, user_id, course_id).await?;

    Ok(CourseProgress {
        completed_count,
        total_count,
        percentage: percentage(completed_count, total_count),
    })
}

#[instrument(skip(pool))]
pub async fn get_overall_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<OverallProgress, AppError> {
    info!("Computing overall progress");

    let enrollments = list_enrollments(pool, user_id).await?;

    let mut courses = Vec::with_capacity(enrollments.len());
    let mut completed_sum = 0;
    let mut total_sum = 0;

    for enrollment in enrollments {
        let title = sqlx::query_as::<_, DbCourse>("SELECT * FROM courses WHERE id = ?")
            .bind(enrollment.course_id)
            .fetch_optional(pool)
            .await?
            .and_then(|c| c.title)
            .unwrap_or_default();

        let total_count = count_course_lessons(pool, enrollment.course_id).await?;
        let completed_count =
            count_completed_lessons(pool, user_id, enrollment.course_id).await?;

        completed_sum += completed_count;
        total_sum += total_count;

        courses.push(EnrolledCourseProgress {
            course_id: enrollment.course_id,
            course_title: title,
            completed_count,
            total_count,
            percentage: percentage(completed_count, total_count),
        });
    }

    Ok(OverallProgress {
        courses,
        completed_count: completed_sum,
        total_count: total_sum,
        percentage: percentage(completed_sum, total_sum),
    })
}

async fn count_completed_lessons(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<i64, AppError> {
    // Joined to the live catalog so progress on since-removed lessons does
    // not count and completed can never exceed total.
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lesson_progress lp
         JOIN lessons l ON l.id = lp.lesson_id
         JOIN modules m ON m.id = l.module_id
         WHERE lp.user_id = ? AND m.course_id = ? AND lp.completed = 1",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
