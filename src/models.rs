use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Clone)]
pub struct Course {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub price: i64, // minor currency units
    pub is_free: bool,
    pub is_published: bool,
    pub modules: Vec<Module>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbCourse {
    pub id: Option<i64>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub price: Option<i64>,
    pub is_free: Option<bool>,
    pub is_published: Option<bool>,
}

impl From<DbCourse> for Course {
    fn from(course: DbCourse) -> Self {
        Self {
            id: course.id.unwrap_or_default(),
            slug: course.slug.unwrap_or_default(),
            title: course.title.unwrap_or_default(),
            price: course.price.unwrap_or_default(),
            is_free: course.is_free.unwrap_or_default(),
            is_published: course.is_published.unwrap_or_default(),
            modules: Vec::new(),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub position: i64,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbModule {
    pub id: Option<i64>,
    pub course_id: Option<i64>,
    pub position: Option<i64>,
    pub title: Option<String>,
}

impl From<DbModule> for Module {
    fn from(module: DbModule) -> Self {
        Self {
            id: module.id.unwrap_or_default(),
            course_id: module.course_id.unwrap_or_default(),
            position: module.position.unwrap_or_default(),
            title: module.title.unwrap_or_default(),
            lessons: Vec::new(),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub position: i64,
    pub title: String,
    pub content_ref: String, // opaque video/PDF pointer
    pub duration: i64,       // seconds, 0 for untimed content
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLesson {
    pub id: Option<i64>,
    pub module_id: Option<i64>,
    pub position: Option<i64>,
    pub title: Option<String>,
    pub content_ref: Option<String>,
    pub duration: Option<i64>,
}

impl From<DbLesson> for Lesson {
    fn from(lesson: DbLesson) -> Self {
        Self {
            id: lesson.id.unwrap_or_default(),
            module_id: lesson.module_id.unwrap_or_default(),
            position: lesson.position.unwrap_or_default(),
            title: lesson.title.unwrap_or_default(),
            content_ref: lesson.content_ref.unwrap_or_default(),
            duration: lesson.duration.unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbEnrollment {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub course_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbEnrollment> for Enrollment {
    fn from(db: DbEnrollment) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            course_id: db.course_id.unwrap_or_default(),
            created_at: db
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct LessonProgress {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbLessonProgress {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub completed: Option<bool>,
    pub completed_at: Option<NaiveDateTime>,
}

impl From<DbLessonProgress> for LessonProgress {
    fn from(db: DbLessonProgress) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            lesson_id: db.lesson_id.unwrap_or_default(),
            completed: db.completed.unwrap_or_default(),
            completed_at: db
                .completed_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
        }
    }
}

/// Immutable once issued. Student name and course title are denormalized at
/// issuance so verification keeps working across later course edits.
#[derive(Serialize, Clone)]
pub struct Certificate {
    pub id: i64,
    pub certificate_id: String,
    pub user_id: i64,
    pub course_id: i64,
    pub student_name: String,
    pub course_title: String,
    pub completion_date: DateTime<Utc>,
    pub verification_url: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbCertificate {
    pub id: Option<i64>,
    pub certificate_id: Option<String>,
    pub user_id: Option<i64>,
    pub course_id: Option<i64>,
    pub student_name: Option<String>,
    pub course_title: Option<String>,
    pub completion_date: Option<NaiveDateTime>,
    pub verification_url: Option<String>,
}

impl From<DbCertificate> for Certificate {
    fn from(db: DbCertificate) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            certificate_id: db.certificate_id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            course_id: db.course_id.unwrap_or_default(),
            student_name: db.student_name.unwrap_or_default(),
            course_title: db.course_title.unwrap_or_default(),
            completion_date: db
                .completion_date
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            verification_url: db.verification_url.unwrap_or_default(),
        }
    }
}
