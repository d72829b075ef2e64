use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, Principal, WebhookCaller};
use crate::catalog::{get_course, get_course_by_slug, list_published_courses};
use crate::certificates::{
    CertificateVerification, completion_state, find_certificate, generate_certificate,
    verify_certificate,
};
use crate::config::AppConfig;
use crate::enrollment::{enroll, list_enrollments};
use crate::error::AppError;
use crate::models::{Certificate, Course, Enrollment, Lesson, LessonProgress, Module};
use crate::progress::{
    OverallProgress, get_course_progress, get_overall_progress, mark_lesson_complete,
};
use crate::reports::{CourseRevenue, Overview, compute_overview, compute_revenue_by_course};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
}

impl From<AppError> for Custom<Json<ErrorResponse>> {
    fn from(err: AppError) -> Self {
        err.log_and_record("API error response");
        let status = err.status_code();

        let (kind, percentage) = match &err {
            AppError::NotFound(_) => ("not_found", None),
            AppError::AccessDenied(_) => ("access_denied", None),
            AppError::NotEligible { percentage } => ("not_eligible", Some(*percentage)),
            AppError::Validation(_) => ("validation", None),
            AppError::Database(_) | AppError::Internal(_) => ("internal", None),
        };

        Custom(
            status,
            Json(ErrorResponse {
                error: kind.to_string(),
                message: err.to_string(),
                percentage,
            }),
        )
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    pub id: i64,
    pub position: i64,
    pub title: String,
    pub content_ref: String,
    pub duration: i64,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            position: lesson.position,
            title: lesson.title,
            content_ref: lesson.content_ref,
            duration: lesson.duration,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResponse {
    pub id: i64,
    pub position: i64,
    pub title: String,
    pub lessons: Vec<LessonResponse>,
}

impl From<Module> for ModuleResponse {
    fn from(module: Module) -> Self {
        Self {
            id: module.id,
            position: module.position,
            title: module.title,
            lessons: module.lessons.into_iter().map(LessonResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub price: i64,
    pub is_free: bool,
    pub is_published: bool,
    pub modules: Vec<ModuleResponse>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            slug: course.slug,
            title: course.title,
            price: course.price,
            is_free: course.is_free,
            is_published: course.is_published,
            modules: course.modules.into_iter().map(ModuleResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub created_at: String,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            created_at: enrollment.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressResponse {
    pub id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: Option<String>,
}

impl From<LessonProgress> for LessonProgressResponse {
    fn from(progress: LessonProgress) -> Self {
        Self {
            id: progress.id,
            lesson_id: progress.lesson_id,
            completed: progress.completed,
            completed_at: progress.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
    /// Derived certificate state, so the UI can explain the gap
    /// ("complete all lessons to unlock").
    pub certificate_state: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourseProgressResponse {
    pub course_id: i64,
    pub course_title: String,
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgressResponse {
    pub courses: Vec<EnrolledCourseProgressResponse>,
    pub completed_count: i64,
    pub total_count: i64,
    pub percentage: i64,
}

impl From<OverallProgress> for OverallProgressResponse {
    fn from(overall: OverallProgress) -> Self {
        Self {
            courses: overall
                .courses
                .into_iter()
                .map(|c| EnrolledCourseProgressResponse {
                    course_id: c.course_id,
                    course_title: c.course_title,
                    completed_count: c.completed_count,
                    total_count: c.total_count,
                    percentage: c.percentage,
                })
                .collect(),
            completed_count: overall.completed_count,
            total_count: overall.total_count,
            percentage: overall.percentage,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub certificate_id: String,
    pub course_id: i64,
    pub course_title: String,
    pub student_name: String,
    pub completion_date: String,
    pub verification_url: String,
}

impl From<Certificate> for CertificateResponse {
    fn from(certificate: Certificate) -> Self {
        Self {
            certificate_id: certificate.certificate_id,
            course_id: certificate.course_id,
            course_title: certificate.course_title,
            student_name: certificate.student_name,
            completion_date: certificate.completion_date.to_rfc3339(),
            verification_url: certificate.verification_url,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub course_title: String,
    pub student_name: String,
    pub completion_date: String,
}

impl From<CertificateVerification> for VerificationResponse {
    fn from(verification: CertificateVerification) -> Self {
        Self {
            course_title: verification.course_title,
            student_name: verification.student_name,
            completion_date: verification.completion_date.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
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

impl From<Overview> for OverviewResponse {
    fn from(overview: Overview) -> Self {
        Self {
            total_students: overview.total_students,
            total_courses: overview.total_courses,
            published_courses: overview.published_courses,
            total_enrollments: overview.total_enrollments,
            total_revenue: overview.total_revenue,
            completion_rate: overview.completion_rate,
            signups_today: overview.signups_today,
            signups_week: overview.signups_week,
            signups_month: overview.signups_month,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRevenueResponse {
    pub course_id: i64,
    pub revenue: i64,
    pub enrollments: i64,
}

impl From<CourseRevenue> for CourseRevenueResponse {
    fn from(revenue: CourseRevenue) -> Self {
        Self {
            course_id: revenue.course_id,
            revenue: revenue.revenue,
            enrollments: revenue.enrollments,
        }
    }
}

#[get("/courses")]
pub async fn api_list_courses(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<CourseResponse>>, Status> {
    let courses = list_published_courses(db).await?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

#[get("/courses/<slug>")]
pub async fn api_get_course(
    slug: &str,
    principal: Option<Principal>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CourseResponse>, Status> {
    let course = get_course_by_slug(db, slug).await?;

    // Unpublished courses are invisible on the public surface; admins can
    // still preview them.
    let is_admin = principal.as_ref().is_some_and(Principal::is_admin);
    if !course.is_published && !is_admin {
        return Err(Status::NotFound);
    }

    Ok(Json(CourseResponse::from(course)))
}

#[post("/courses/<course_id>/enroll")]
pub async fn api_enroll_self(
    course_id: i64,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<EnrollmentResponse>, Custom<Json<ErrorResponse>>> {
    principal
        .require_permission(Permission::EnrollSelf)
        .map_err(|_| AppError::AccessDenied("Enrollment not permitted".to_string()))?;

    let course = get_course(db, course_id).await?;

    // Paid enrollments arrive through the payment webhook after checkout;
    // only free courses can be self-enrolled (admins excepted).
    if !course.is_free && !principal.has_permission(Permission::EnrollOthers) {
        return Err(AppError::AccessDenied(
            "Paid courses are enrolled through checkout".to_string(),
        )
        .into());
    }

    let enrollment = enroll(db, principal.user_id, course_id).await?;
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookRequest {
    #[validate(range(min = 1))]
    user_id: i64,
    #[validate(range(min = 1))]
    course_id: i64,
}

/// Called by the payment collaborator after a successful checkout. Safe to
/// retry: enroll is idempotent.
#[post("/webhooks/payment", data = "<request>")]
pub async fn api_payment_webhook(
    request: Json<PaymentWebhookRequest>,
    _caller: WebhookCaller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<EnrollmentResponse>, Status> {
    if request.validate().is_err() {
        return Err(Status::BadRequest);
    }

    let enrollment = enroll(db, request.user_id, request.course_id).await?;
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminEnrollRequest {
    #[validate(range(min = 1))]
    user_id: i64,
    #[validate(range(min = 1))]
    course_id: i64,
}

#[post("/admin/enroll", data = "<request>")]
pub async fn api_admin_enroll(
    request: Json<AdminEnrollRequest>,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<EnrollmentResponse>, Status> {
    principal.require_permission(Permission::EnrollOthers)?;

    if request.validate().is_err() {
        return Err(Status::BadRequest);
    }

    let enrollment = enroll(db, request.user_id, request.course_id).await?;
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

#[get("/enrollments")]
pub async fn api_list_enrollments(
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<EnrollmentResponse>>, Status> {
    let enrollments = list_enrollments(db, principal.user_id).await?;
    Ok(Json(
        enrollments
            .into_iter()
            .map(EnrollmentResponse::from)
            .collect(),
    ))
}

#[post("/lessons/<lesson_id>/complete")]
pub async fn api_mark_lesson_complete(
    lesson_id: i64,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LessonProgressResponse>, Custom<Json<ErrorResponse>>> {
    principal
        .require_permission(Permission::MarkOwnLessons)
        .map_err(|_| AppError::AccessDenied("Marking lessons not permitted".to_string()))?;

    // Users only ever mark their own progress; the admin capability bypasses
    // the enrollment gate, not the identity.
    let bypass_gate = principal.has_permission(Permission::BypassEnrollmentGate);
    let progress = mark_lesson_complete(db, principal.user_id, lesson_id, bypass_gate).await?;

    Ok(Json(LessonProgressResponse::from(progress)))
}

#[get("/courses/<course_id>/progress")]
pub async fn api_get_course_progress(
    course_id: i64,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CourseProgressResponse>, Status> {
    principal.require_permission(Permission::ViewOwnProgress)?;

    let progress = get_course_progress(db, principal.user_id, course_id).await?;
    let state = completion_state(db, principal.user_id, course_id).await?;

    Ok(Json(CourseProgressResponse {
        completed_count: progress.completed_count,
        total_count: progress.total_count,
        percentage: progress.percentage,
        certificate_state: state.as_str().to_string(),
    }))
}

#[get("/progress")]
pub async fn api_get_overall_progress(
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OverallProgressResponse>, Status> {
    principal.require_permission(Permission::ViewOwnProgress)?;

    let overall = get_overall_progress(db, principal.user_id).await?;
    Ok(Json(OverallProgressResponse::from(overall)))
}

#[post("/courses/<course_id>/certificate")]
pub async fn api_generate_certificate(
    course_id: i64,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<CertificateResponse>, Custom<Json<ErrorResponse>>> {
    principal
        .require_permission(Permission::RequestCertificate)
        .map_err(|_| AppError::AccessDenied("Certificates not permitted".to_string()))?;

    let certificate = generate_certificate(
        db,
        &config.public_url,
        principal.user_id,
        &principal.display_name,
        course_id,
    )
    .await?;

    Ok(Json(CertificateResponse::from(certificate)))
}

#[get("/courses/<course_id>/certificate")]
pub async fn api_get_certificate(
    course_id: i64,
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CertificateResponse>, Status> {
    match find_certificate(db, principal.user_id, course_id).await? {
        Some(certificate) => Ok(Json(CertificateResponse::from(certificate))),
        _ => Err(Status::NotFound),
    }
}

#[get("/verify/<certificate_id>")]
pub async fn api_verify_certificate(
    certificate_id: &str,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<VerificationResponse>, Status> {
    let verification = verify_certificate(db, certificate_id).await?;
    Ok(Json(VerificationResponse::from(verification)))
}

#[get("/admin/overview")]
pub async fn api_admin_overview(
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OverviewResponse>, Status> {
    principal.require_permission(Permission::ViewReports)?;

    let overview = compute_overview(db).await?;
    Ok(Json(OverviewResponse::from(overview)))
}

#[get("/admin/revenue")]
pub async fn api_admin_revenue(
    principal: Principal,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<CourseRevenueResponse>>, Status> {
    principal.require_permission(Permission::ViewReports)?;

    let revenues = compute_revenue_by_course(db).await?;
    Ok(Json(
        revenues
            .into_iter()
            .map(CourseRevenueResponse::from)
            .collect(),
    ))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
