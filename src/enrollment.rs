use crate::error::AppError;
use crate::models::{DbEnrollment, Enrollment};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

#[instrument(skip(pool))]
pub async fn is_enrolled(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Grants a user access to a course. Idempotent: the payment collaborator
/// retries its webhook, so re-enrolling returns the existing row instead of
/// erroring. A concurrent duplicate insert is absorbed by the
/// (user_id, course_id) unique constraint and resolved by re-reading.
#[instrument(skip(pool))]
pub async fn enroll(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    info!("Enrolling user in course");

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

    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        "INSERT INTO enrollments (user_id, course_id, created_at)
         VALUES (?, ?, ?)
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        info!("User already enrolled, returning existing enrollment");
    }

    get_enrollment(pool, user_id, course_id).await
}

#[instrument(skip(pool))]
pub async fn get_enrollment(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    let row = sqlx::query_as::<_, DbEnrollment>(
        "SELECT * FROM enrollments WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(enrollment) => Ok(Enrollment::from(enrollment)),
        _ => Err(AppError::NotFound(format!(
            "Enrollment for user {} in course {} not found",
            user_id, course_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn list_enrollments(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<Enrollment>, AppError> {
    info!("Listing enrollments for user");
    let rows = sqlx::query_as::<_, DbEnrollment>(
        "SELECT * FROM enrollments WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Enrollment::from).collect())
}
