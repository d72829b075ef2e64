use crate::error::AppError;
use crate::models::{Course, DbCourse, DbLesson, DbModule, Lesson, Module};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

// Read-only catalog queries. Courses, modules and lessons are authored by
// external admin tooling; this core only consumes them, always with the
// module/lesson tree in ascending position order.

#[instrument(skip(pool))]
pub async fn get_course(pool: &Pool<Sqlite>, course_id: i64) -> Result<Course, AppError> {
    info!("Fetching course by ID");
    let row = sqlx::query_as::<_, DbCourse>("SELECT * FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(course) => load_course_tree(pool, Course::from(course)).await,
        _ => Err(AppError::NotFound(format!(
            "Course with id {} not found",
            course_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_course_by_slug(pool: &Pool<Sqlite>, slug: &str) -> Result<Course, AppError> {
    info!("Fetching course by slug");
    let row = sqlx::query_as::<_, DbCourse>("SELECT * FROM courses WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(course) => load_course_tree(pool, Course::from(course)).await,
        _ => Err(AppError::NotFound(format!(
            "Course with slug {} not found",
            slug
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn list_published_courses(pool: &Pool<Sqlite>) -> Result<Vec<Course>, AppError> {
    info!("Listing published courses");
    let rows = sqlx::query_as::<_, DbCourse>(
        "SELECT * FROM courses WHERE is_published = 1 ORDER BY title",
    )
    .fetch_all(pool)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        courses.push(load_course_tree(pool, Course::from(row)).await?);
    }

    Ok(courses)
}

async fn load_course_tree(pool: &Pool<Sqlite>, mut course: Course) -> Result<Course, AppError> {
    let module_rows = sqlx::query_as::<_, DbModule>(
        "SELECT * FROM modules WHERE course_id = ? ORDER BY position",
    )
    .bind(course.id)
    .fetch_all(pool)
    .await?;

    let lesson_rows = sqlx::query_as::<_, DbLesson>(
        "SELECT l.* FROM lessons l
         JOIN modules m ON m.id = l.module_id
         WHERE m.course_id = ?
         ORDER BY m.position, l.position",
    )
    .bind(course.id)
    .fetch_all(pool)
    .await?;

    let mut modules: Vec<Module> = module_rows.into_iter().map(Module::from).collect();
    let lessons: Vec<Lesson> = lesson_rows.into_iter().map(Lesson::from).collect();

    for module in &mut modules {
        module.lessons = lessons
            .iter()
            .filter(|l| l.module_id == module.id)
            .cloned()
            .collect();
    }

    course.modules = modules;
    Ok(course)
}

/// Current number of lessons in a course. Progress percentages are always
/// computed against this live count, never a snapshot.
#[instrument(skip(pool))]
pub async fn count_course_lessons(pool: &Pool<Sqlite>, course_id: i64) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lessons l
         JOIN modules m ON m.id = l.module_id
         WHERE m.course_id = ?",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Resolves the course that owns a lesson, for enrollment gating.
#[instrument(skip(pool))]
pub async fn get_lesson_course_id(pool: &Pool<Sqlite>, lesson_id: i64) -> Result<i64, AppError> {
    let course_id = sqlx::query_scalar::<_, i64>(
        "SELECT m.course_id FROM lessons l
         JOIN modules m ON m.id = l.module_id
         WHERE l.id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?;

    match course_id {
        Some(course_id) => Ok(course_id),
        _ => Err(AppError::NotFound(format!(
            "Lesson with id {} not found",
            lesson_id
        ))),
    }
}
