use crate::error::AppError;
use crate::progress::percentage;
use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

#[derive(Serialize, Clone, Debug)]
pub struct Overview {
    pub total_students: i64,
    pub total_courses: i64,
    pub published_courses: i64,
    pub total_enrollments: i64,
    pub total_revenue: i64,
    pub completion_rate: i64,
    pub signups_today: i64,
    pub signups_week: i64,
    pub signups_month: i64,
}

#[derive(Serialize, Clone, Debug)]
pub struct CourseRevenue {
    pub course_id: i64,
    pub revenue: i64,
    pub enrollments: i64,
}

#[derive(sqlx::FromRow)]
struct DbEnrollmentRevenue {
    enrollment_id: Option<i64>,
    price: Option<i64>,
    is_free: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct DbCourseRevenue {
    course_id: Option<i64>,
    price: Option<i64>,
    is_free: Option<bool>,
    enrollments: Option<i64>,
}

/// Dashboard summary. A single malformed row must not abort the whole
/// computation, so the revenue folds log and skip instead of propagating.
#[instrument(skip(pool))]
pub async fn compute_overview(pool: &Pool<Sqlite>) -> Result<Overview, AppError> {
    info!("Computing dashboard overview");

    let total_students =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT user_id) FROM enrollments")
            .fetch_one(pool)
            .await?;

    let total_courses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
        .fetch_one(pool)
        .await?;

    let published_courses =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE is_published = 1")
            .fetch_one(pool)
            .await?;

    let total_enrollments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments")
        .fetch_one(pool)
        .await?;

    let total_revenue = compute_total_revenue(pool).await?;
    let completion_rate = compute_completion_rate(pool).await?;

    let now = Utc::now().naive_utc();
    let signups_today = count_signups_since(pool, now - Duration::days(1)).await?;
    let signups_week = count_signups_since(pool, now - Duration::days(7)).await?;
    let signups_month = count_signups_since(pool, now - Duration::days(30)).await?;

    Ok(Overview {
        total_students,
        total_courses,
        published_courses,
        total_enrollments,
        total_revenue,
        completion_rate,
        signups_today,
        signups_week,
        signups_month,
    })
}

/// Revenue and enrollment count per course, unsorted. Ordering is a
/// presentation concern left to the caller.
#[instrument(skip(pool))]
pub async fn compute_revenue_by_course(
    pool: &Pool<Sqlite>,
) -> Result<Vec<CourseRevenue>, AppError> {
    info!("Computing revenue by course");

    let rows = sqlx::query_as::<_, DbCourseRevenue>(
        "SELECT c.id AS course_id, c.price, c.is_free,
                (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS enrollments
         FROM courses c",
    )
    .fetch_all(pool)
    .await?;

    let mut revenues = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(course_id) = row.course_id else {
            warn!("Skipping revenue row without a course id");
            continue;
        };

        let enrollments = row.enrollments.unwrap_or_default();
        let revenue = if row.is_free.unwrap_or_default() {
            0
        } else {
            enrollments * row.price.unwrap_or_default()
        };

        revenues.push(CourseRevenue {
            course_id,
            revenue,
            enrollments,
        });
    }

    Ok(revenues)
}

/// Free-course enrollments contribute zero regardless of any stored price.
async fn compute_total_revenue(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let rows = sqlx::query_as::<_, DbEnrollmentRevenue>(
        "SELECT e.id AS enrollment_id, c.price, c.is_free
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id",
    )
    .fetch_all(pool)
    .await?;

    let mut total = 0;
    for row in rows {
        if row.is_free.unwrap_or_default() {
            continue;
        }
        match row.price {
            Some(price) => total += price,
            _ => {
                warn!(
                    enrollment_id = ?row.enrollment_id,
                    "Skipping paid enrollment without a course price"
                );
            }
        }
    }

    Ok(total)
}

/// Global content-consumption ratio: enrollment-backed completed lessons
/// over all lesson slots (sum over enrollments of each course's current
/// lesson count). Not a per-student average; the two differ whenever
/// enrollment counts vary by course.
async fn compute_completion_rate(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    // Numerator restricted to enrollment-backed completions so admin-bypass
    // marks in unenrolled courses cannot push the rate past 100.
    let completed = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lesson_progress lp
         JOIN lessons l ON l.id = lp.lesson_id
         JOIN modules m ON m.id = l.module_id
         JOIN enrollments e ON e.user_id = lp.user_id AND e.course_id = m.course_id
         WHERE lp.completed = 1",
    )
    .fetch_one(pool)
    .await?;

    let total_slots = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments e
         JOIN modules m ON m.course_id = e.course_id
         JOIN lessons l ON l.module_id = m.id",
    )
    .fetch_one(pool)
    .await?;

    Ok(percentage(completed, total_slots))
}

async fn count_signups_since(
    pool: &Pool<Sqlite>,
    since: chrono::NaiveDateTime,
) -> Result<i64, AppError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE created_at >= ?")
            .bind(since)
            .fetch_one(pool)
            .await?;

    Ok(count)
}
