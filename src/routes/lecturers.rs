use actix_web::{get, post, web, HttpResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::policy::{Capability, Role};
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{lecturers, students, users};
use crate::models::lecturers::CreateLecturerRequest;

/// Lecturers onboard themselves; admins must name the user.
#[tracing::instrument(name = "Create Lecturer Profile", skip(pool, auth, request), fields(user_id = %auth.user_id))]
#[post("")]
pub async fn create_lecturer(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateLecturerRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::OnboardLecturer)?;
    request.validate()?;

    let owner_id = match auth.role {
        Role::Admin => {
            let user_id = request
                .user_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| AppError::validation_error("user_id is required"))?;
            let user = users::get_user_by_id(&pool, parse_uuid(user_id, "user_id")?).await?;
            user.id
        }
        _ => auth.user_id,
    };

    let lecturer = lecturers::create_lecturer(&pool, owner_id, &request).await?;

    tracing::info!(lecturer_id = %lecturer.id, "lecturer profile created");
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        lecturer,
        "Lecturer profile created successfully",
    )))
}

#[tracing::instrument(name = "List Lecturers", skip(pool, auth))]
#[get("")]
pub async fn list_lecturers(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAcademicProfiles)?;

    let lecturers = lecturers::list_lecturers(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        lecturers,
        "Lecturers retrieved successfully",
    )))
}

#[tracing::instrument(name = "List Advisees", skip(pool, auth), fields(user_id = %auth.user_id))]
#[get("/advisees")]
pub async fn list_advisees(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAcademicProfiles)?;

    let lecturer = lecturers::find_lecturer_by_user(&pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Lecturer profile not found"))?;
    let advisees = students::list_students_by_advisor(&pool, lecturer.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        advisees,
        "Advisees retrieved successfully",
    )))
}
