use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use validator::Validate;

use crate::core::config::JwtAuthConfig;
use crate::core::jwt_auth::{
    decode_jwt_token, generate_jwt_token, JwtClaims, JwtMiddleware, TokenType,
};
use crate::core::policy::{Capability, Role};
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppErrorType, AppSuccessResponse};
use crate::db::users::{self, NewUser};
use crate::db::permissions;
use crate::models::users::{
    LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest, RefreshTokenResponse,
    RegisterRequest, RoleRecord, SessionUser, UpdateRoleRequest, UpdateUserRequest, User,
    UserProfile,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Role id wins over role name; neither means Student.
async fn resolve_role(pool: &PgPool, request: &RegisterRequest) -> Result<RoleRecord, AppError> {
    if let Some(role_id) = request.role_id.as_deref().filter(|id| !id.trim().is_empty()) {
        let role_id = parse_uuid(role_id, "role_id")?;
        let record = users::get_role_by_id(pool, role_id).await?;
        let role = record
            .name
            .parse::<Role>()
            .map_err(AppError::validation_error)?;
        self_assignable(role)?;
        return Ok(record);
    }

    let role = match request.role.as_deref().filter(|name| !name.trim().is_empty()) {
        Some(name) => name
            .parse::<Role>()
            .map_err(AppError::validation_error)?,
        None => Role::Student,
    };
    users::get_role_by_name(pool, self_assignable(role)?.as_str()).await
}

/// Admin rights are only granted through `PUT /users/{id}/role`.
fn self_assignable(role: Role) -> Result<Role, AppError> {
    match role {
        Role::Admin => Err(AppError::forbidden_error(
            "Admin accounts cannot be self-registered",
        )),
        other => Ok(other),
    }
}

fn ensure_active(user: &User) -> Result<(), AppError> {
    if user.is_active {
        Ok(())
    } else {
        Err(AppError::forbidden_error("Account is inactive"))
    }
}

#[tracing::instrument(name = "Register User", skip(pool, request))]
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let role = resolve_role(&pool, &request).await?;

    let user = users::create_user(
        &pool,
        NewUser {
            username: request.username.trim(),
            email: request.email.trim(),
            password: &request.password,
            full_name: request.full_name.trim(),
            role_id: role.id,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role_name, "user registered");
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        UserProfile::from(user),
        "User registered successfully",
    )))
}

#[tracing::instrument(name = "User Login", skip(pool, jwt, request))]
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtAuthConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users::find_user_by_login(&pool, request.username.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    if !users::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }
    ensure_active(&user)?;

    let role: Role = user.role_name.parse()?;
    let permission_names = permissions::permission_names_for_role(&pool, user.role_id).await?;

    let access = JwtClaims::access(&jwt, user.id, &user.username, role, permission_names.clone());
    let refresh = JwtClaims::refresh(&jwt, user.id, &user.username, role);

    let response = LoginResponse {
        token: generate_jwt_token(&jwt, &access)?,
        refresh_token: generate_jwt_token(&jwt, &refresh)?,
        expires_at: Utc::now() + Duration::minutes(jwt.token_expiration_time),
        user: SessionUser {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: role.as_str().to_string(),
            permissions: permission_names,
        },
    };

    tracing::info!(user_id = %response.user.id, "user logged in");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(response, "Login successful")))
}

#[tracing::instrument(name = "Refresh Token", skip(pool, jwt, request))]
#[post("/refresh")]
pub async fn refresh_token(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtAuthConfig>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let claims = decode_jwt_token(&jwt, request.refresh_token.trim())?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::unauthorized("Invalid refresh token"));
    }

    let user_id = parse_uuid(&claims.sub, "user id")
        .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;
    let user = users::get_user_by_id(&pool, user_id)
        .await
        .map_err(|e| match e.error_type {
            AppErrorType::NotFoundError => AppError::unauthorized("Invalid refresh token"),
            _ => e,
        })?;
    ensure_active(&user)?;

    let role: Role = user.role_name.parse()?;
    let permission_names = permissions::permission_names_for_role(&pool, user.role_id).await?;
    let access = JwtClaims::access(&jwt, user.id, &user.username, role, permission_names);

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        RefreshTokenResponse {
            access_token: generate_jwt_token(&jwt, &access)?,
            expires_at: Utc::now() + Duration::minutes(jwt.token_expiration_time),
        },
        "Token refreshed successfully",
    )))
}

/// Available to every authenticated role.
#[tracing::instrument(name = "Get Profile", skip(pool, auth), fields(user_id = %auth.user_id))]
#[get("/profile")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let user = users::get_user_by_id(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        UserProfile::from(user),
        "Profile retrieved successfully",
    )))
}

#[tracing::instrument(name = "List Users", skip(pool, auth))]
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUsers)?;

    let users = users::list_users(&pool)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        users,
        "Users retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update User", skip(pool, auth, request))]
#[put("/{id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUsers)?;
    let user_id = parse_uuid(&id, "user id")?;
    request.validate()?;

    let user = users::update_user(&pool, user_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        UserProfile::from(user),
        "User updated successfully",
    )))
}

#[tracing::instrument(name = "Deactivate User", skip(pool, auth))]
#[delete("/{id}")]
pub async fn deactivate_user(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUsers)?;
    let user_id = parse_uuid(&id, "user id")?;

    users::deactivate_user(&pool, user_id).await?;

    tracing::info!(user_id = %user_id, admin_id = %auth.user_id, "user deactivated");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: "User deactivated".to_string(),
        },
        "User deactivated successfully",
    )))
}

#[tracing::instrument(name = "Change User Role", skip(pool, auth, request))]
#[put("/{id}/role")]
pub async fn update_user_role(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    request: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUsers)?;
    let user_id = parse_uuid(&id, "user id")?;
    let role_id = parse_uuid(&request.role_id, "role_id")?;

    let user = users::update_user_role(&pool, user_id, role_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        UserProfile::from(user),
        "User role updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_ok_eq;

    #[test]
    fn registration_cannot_grant_admin_rights() {
        assert_ok_eq!(self_assignable(Role::Student), Role::Student);
        assert_ok_eq!(self_assignable(Role::Lecturer), Role::Lecturer);
        assert_eq!(
            self_assignable(Role::Admin).unwrap_err().error_type,
            AppErrorType::ForbiddenError
        );
    }
}
