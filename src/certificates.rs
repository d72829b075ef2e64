use crate::error::AppError;
use crate::models::{Certificate, DbCertificate, DbCourse};
use crate::progress::get_course_progress;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

/// Public verification payload. Deliberately minimal: enough to confirm
/// authenticity, nothing that identifies the account (no email, no user id).
#[derive(Serialize, Clone)]
pub struct CertificateVerification {
    pub course_title: String,
    pub student_name: String,
    pub completion_date: DateTime<Utc>,
}

/// Derived completion state for a (user, course) pair. `Unlocked` is
/// recomputed from progress on every evaluation, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Locked,
    Unlocked,
    Issued,
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionState::Locked => "locked",
            CompletionState::Unlocked => "unlocked",
            CompletionState::Issued => "issued",
        }
    }
}

#[instrument(skip(pool))]
pub async fn completion_state(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<CompletionState, AppError> {
    if find_certificate(pool, user_id, course_id).await?.is_some() {
        return Ok(CompletionState::Issued);
    }

    let progress = get_course_progress(pool, user_id, course_id).await?;
    if progress.total_count > 0 && progress.completed_count == progress.total_count {
        Ok(CompletionState::Unlocked)
    } else {
        Ok(CompletionState::Locked)
    }
}

/// Issues the certificate for a completed course. Progress is recomputed at
/// call time; stale client state is never trusted. Idempotent: an existing
/// (user, course) certificate is returned as-is, and a unique-constraint race
/// between concurrent calls is resolved by re-reading the winner's row.
#[instrument(skip(pool, public_url, student_name))]
pub async fn generate_certificate(
    pool: &Pool<Sqlite>,
    public_url: &str,
    user_id: i64,
    student_name: &str,
    course_id: i64,
) -> Result<Certificate, AppError> {
    info!("Generating certificate");

    if let Some(existing) = find_certificate(pool, user_id, course_id).await? {
        info!("Certificate already issued, returning existing record");
        return Ok(existing);
    }

    let course = sqlx::query_as::<_, DbCourse>("SELECT * FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course with id {} not found", course_id)))?;

    let progress = get_course_progress(pool, user_id, course_id).await?;
    if progress.total_count == 0 || progress.completed_count < progress.total_count {
        return Err(AppError::NotEligible {
            percentage: progress.percentage,
        });
    }

    let certificate_id = Uuid::new_v4().to_string();
    let verification_url = format!(
        "{}/verify/{}",
        public_url.trim_end_matches('/'),
        certificate_id
    );
    let completion_date = Utc::now().naive_utc();
    let course_title = course.title.unwrap_or_default();

    let result = sqlx::query(
        "INSERT INTO certificates
         (certificate_id, user_id, course_id, student_name, course_title, completion_date, verification_url)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(&certificate_id)
    .bind(user_id)
    .bind(course_id)
    .bind(student_name)
    .bind(&course_title)
    .bind(completion_date)
    .bind(&verification_url)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Someone else just issued it; their row is the canonical one.
        info!("Certificate insert raced, returning existing record");
    }

    match find_certificate(pool, user_id, course_id).await? {
        Some(certificate) => Ok(certificate),
        _ => Err(AppError::Internal(format!(
            "Certificate for user {} in course {} missing after insert",
            user_id, course_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_certificate(
    pool: &Pool<Sqlite>,
    user_id: i64,
    course_id: i64,
) -> Result<Option<Certificate>, AppError> {
    let row = sqlx::query_as::<_, DbCertificate>(
        "SELECT * FROM certificates WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Certificate::from))
}

/// Public, unauthenticated verification lookup by the unguessable
/// certificate id. Reads only the denormalized certificate row, so it works
/// regardless of later course lifecycle changes.
#[instrument(skip(pool))]
pub async fn verify_certificate(
    pool: &Pool<Sqlite>,
    certificate_id: &str,
) -> Result<CertificateVerification, AppError> {
    info!("Verifying certificate");

    let row = sqlx::query_as::<_, DbCertificate>(
        "SELECT * FROM certificates WHERE certificate_id = ?",
    )
    .bind(certificate_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let certificate = Certificate::from(row);
            Ok(CertificateVerification {
                course_title: certificate.course_title,
                student_name: certificate.student_name,
                completion_date: certificate.completion_date,
            })
        }
        _ => Err(AppError::NotFound(format!(
            "Certificate {} not found",
            certificate_id
        ))),
    }
}
