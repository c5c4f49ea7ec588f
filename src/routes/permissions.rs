use actix_web::{get, post, web, HttpResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::policy::Capability;
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{permissions, users};
use crate::models::permissions::{AssignPermissionRequest, CreatePermissionRequest, RolePermissions};
use crate::models::users::MessageResponse;

#[tracing::instrument(name = "List Roles", skip(pool, auth))]
#[get("")]
pub async fn list_roles(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePermissions)?;

    let roles = users::list_roles(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        roles,
        "Roles retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Role Permissions", skip(pool, auth))]
#[get("/{id}/permissions")]
pub async fn get_role_permissions(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePermissions)?;
    let role_id = parse_uuid(&id, "role id")?;

    let role = users::get_role_by_id(&pool, role_id).await?;
    let permissions = permissions::permissions_for_role(&pool, role.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        RolePermissions {
            role_id: role.id,
            permissions,
        },
        "Role permissions retrieved successfully",
    )))
}

#[tracing::instrument(name = "Create Permission", skip(pool, auth, request))]
#[post("")]
pub async fn create_permission(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreatePermissionRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePermissions)?;
    request.validate()?;

    let permission = permissions::create_permission(&pool, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        permission,
        "Permission created successfully",
    )))
}

#[tracing::instrument(name = "List Permissions", skip(pool, auth))]
#[get("")]
pub async fn list_permissions(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePermissions)?;

    let permissions = permissions::list_permissions(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        permissions,
        "Permissions retrieved successfully",
    )))
}

#[tracing::instrument(name = "Assign Permission", skip(pool, auth, request))]
#[post("/assign")]
pub async fn assign_permission(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<AssignPermissionRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePermissions)?;
    let role_id = parse_uuid(&request.role_id, "role_id")?;
    let permission_id = parse_uuid(&request.permission_id, "permission_id")?;

    users::get_role_by_id(&pool, role_id).await?;
    permissions::get_permission_by_id(&pool, permission_id).await?;

    let message = if permissions::assign_permission(&pool, role_id, permission_id).await? {
        tracing::info!(%role_id, %permission_id, "permission assigned");
        "Permission assigned to role"
    } else {
        "Permission was already assigned to role"
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: message.to_string(),
        },
        "Permission assignment saved",
    )))
}
