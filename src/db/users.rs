use crate::core::{AppError, AppErrorType};
use crate::models::users::{RoleRecord, UpdateUserRequest, User};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.password_hash, u.full_name, u.role_id,
    r.name AS role_name, u.is_active, u.created_at, u.updated_at
"#;

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub role_id: Uuid,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn create_user(pool: &PgPool, user: NewUser<'_>) -> Result<User, AppError> {
    let password_hash = hash_password(user.password)?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, password_hash, full_name, role_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(password_hash)
    .bind(user.full_name)
    .bind(user.role_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        conflict if conflict.error_type == AppErrorType::ConflictError => {
            conflict.with_message("Username or email is already registered")
        }
        other => other,
    })?;

    get_user_by_id(pool, user_id).await
}

/// Matches either the username or the email, active or not.
pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id \
         WHERE u.username = $1 OR LOWER(u.email) = LOWER($1)",
        USER_COLUMNS
    ))
    .bind(login)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id ORDER BY u.created_at DESC",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn update_user(
    pool: &PgPool,
    user_id: Uuid,
    request: &UpdateUserRequest,
) -> Result<User, AppError> {
    let current = get_user_by_id(pool, user_id).await?;

    let username = request.username.as_deref().unwrap_or(&current.username);
    let email = request.email.as_deref().unwrap_or(&current.email);
    let full_name = request.full_name.as_deref().unwrap_or(&current.full_name);

    sqlx::query(
        r#"
        UPDATE users
        SET username = $1, email = $2, full_name = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(full_name)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user_by_id(pool, user_id).await
}

pub async fn deactivate_user(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    Ok(())
}

pub async fn update_user_role(
    pool: &PgPool,
    user_id: Uuid,
    role_id: Uuid,
) -> Result<User, AppError> {
    get_role_by_id(pool, role_id).await?;

    let result = sqlx::query("UPDATE users SET role_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(role_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    get_user_by_id(pool, user_id).await
}

pub async fn get_role_by_id(pool: &PgPool, role_id: Uuid) -> Result<RoleRecord, AppError> {
    sqlx::query_as::<_, RoleRecord>(
        "SELECT id, name, description, created_at FROM roles WHERE id = $1",
    )
    .bind(role_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Role not found"))
}

pub async fn get_role_by_name(pool: &PgPool, name: &str) -> Result<RoleRecord, AppError> {
    sqlx::query_as::<_, RoleRecord>(
        "SELECT id, name, description, created_at FROM roles WHERE LOWER(name) = LOWER($1)",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Role not found"))
}

pub async fn list_roles(pool: &PgPool) -> Result<Vec<RoleRecord>, AppError> {
    let roles = sqlx::query_as::<_, RoleRecord>(
        "SELECT id, name, description, created_at FROM roles ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();
        assert_ne!(first, second);
        assert_ok!(verify_password("same", &second));
    }

    #[test]
    fn malformed_hashes_are_errors() {
        assert_err!(verify_password("anything", "not-a-phc-string"));
    }
}
