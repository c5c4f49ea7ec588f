use crate::core::{AppError, AppErrorType};
use crate::models::permissions::{CreatePermissionRequest, Permission};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_permission(
    pool: &PgPool,
    request: &CreatePermissionRequest,
) -> Result<Permission, AppError> {
    sqlx::query_as::<_, Permission>(
        r#"
        INSERT INTO permissions (name, resource, action, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, resource, action, description
        "#,
    )
    .bind(request.name.trim())
    .bind(request.resource.trim())
    .bind(request.action.trim())
    .bind(request.description.as_deref())
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        conflict if conflict.error_type == AppErrorType::ConflictError => {
            conflict.with_message("A permission with this name already exists")
        }
        other => other,
    })
}

pub async fn list_permissions(pool: &PgPool) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT id, name, resource, action, description FROM permissions ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(permissions)
}

pub async fn get_permission_by_id(
    pool: &PgPool,
    permission_id: Uuid,
) -> Result<Permission, AppError> {
    sqlx::query_as::<_, Permission>(
        "SELECT id, name, resource, action, description FROM permissions WHERE id = $1",
    )
    .bind(permission_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Permission not found"))
}

/// Assigning an existing pair again changes nothing.
pub async fn assign_permission(
    pool: &PgPool,
    role_id: Uuid,
    permission_id: Uuid,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_id)
        VALUES ($1, $2)
        ON CONFLICT (role_id, permission_id) DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(permission_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn permissions_for_role(
    pool: &PgPool,
    role_id: Uuid,
) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as::<_, Permission>(
        r#"
        SELECT p.id, p.name, p.resource, p.action, p.description
        FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;

    Ok(permissions)
}

pub async fn permission_names_for_role(
    pool: &PgPool,
    role_id: Uuid,
) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT p.name
        FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}
