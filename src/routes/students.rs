use actix_web::{get, post, put, web, HttpResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::policy::Capability;
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{lecturers, students};
use crate::models::students::{CreateStudentRequest, SetAdvisorRequest};

#[tracing::instrument(name = "Create Student Profile", skip(pool, auth, request), fields(user_id = %auth.user_id))]
#[post("")]
pub async fn create_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateStudentRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::OnboardStudent)?;
    request.validate()?;

    let student = students::create_student(&pool, auth.user_id, &request).await?;

    tracing::info!(student_id = %student.id, "student profile created");
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        student,
        "Student profile created successfully",
    )))
}

#[tracing::instrument(name = "Current Student Profile", skip(pool, auth), fields(user_id = %auth.user_id))]
#[get("/current")]
pub async fn current_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::OnboardStudent)?;

    let student = students::find_student_by_user(&pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student profile not found"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        student,
        "Student profile retrieved successfully",
    )))
}

#[tracing::instrument(name = "List Students", skip(pool, auth))]
#[get("")]
pub async fn list_students(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAcademicProfiles)?;

    let students = students::list_students(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        students,
        "Students retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Student", skip(pool, auth))]
#[get("/{id}")]
pub async fn get_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAcademicProfiles)?;
    let student_id = parse_uuid(&id, "student id")?;

    let student = students::find_student_by_id(&pool, student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        student,
        "Student retrieved successfully",
    )))
}

#[tracing::instrument(name = "Set Student Advisor", skip(pool, auth, request))]
#[put("/{id}/advisor")]
pub async fn set_advisor(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    request: web::Json<SetAdvisorRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AssignAdvisor)?;
    let student_id = parse_uuid(&id, "student id")?;
    let advisor_id = parse_uuid(&request.advisor_id, "advisor_id")?;

    let advisor = lecturers::find_lecturer_by_id(&pool, advisor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Lecturer not found"))?;
    let student = students::set_advisor(&pool, student_id, advisor.id).await?;

    tracing::info!(student_id = %student.id, advisor_id = %advisor.id, "advisor assigned");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        student,
        "Advisor assigned successfully",
    )))
}
