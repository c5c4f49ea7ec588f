use crate::core::{AppError, AppErrorType};
use crate::models::lecturers::{CreateLecturerRequest, LecturerProfile};
use sqlx::PgPool;
use uuid::Uuid;

const LECTURER_COLUMNS: &str = "id, user_id, lecturer_number, department, created_at";

pub async fn create_lecturer(
    pool: &PgPool,
    user_id: Uuid,
    request: &CreateLecturerRequest,
) -> Result<LecturerProfile, AppError> {
    sqlx::query_as::<_, LecturerProfile>(&format!(
        r#"
        INSERT INTO lecturers (user_id, lecturer_number, department)
        VALUES ($1, $2, $3)
        RETURNING {}
        "#,
        LECTURER_COLUMNS
    ))
    .bind(user_id)
    .bind(request.lecturer_number.trim())
    .bind(request.department.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        conflict if conflict.error_type == AppErrorType::ConflictError => {
            conflict.with_message("Lecturer profile already exists")
        }
        other => other,
    })
}

pub async fn find_lecturer_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<LecturerProfile>, AppError> {
    let lecturer = sqlx::query_as::<_, LecturerProfile>(&format!(
        "SELECT {} FROM lecturers WHERE user_id = $1",
        LECTURER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(lecturer)
}

pub async fn find_lecturer_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<LecturerProfile>, AppError> {
    let lecturer = sqlx::query_as::<_, LecturerProfile>(&format!(
        "SELECT {} FROM lecturers WHERE id = $1",
        LECTURER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(lecturer)
}

pub async fn list_lecturers(pool: &PgPool) -> Result<Vec<LecturerProfile>, AppError> {
    let lecturers = sqlx::query_as::<_, LecturerProfile>(&format!(
        "SELECT {} FROM lecturers ORDER BY lecturer_number",
        LECTURER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(lecturers)
}

pub async fn count_lecturers(pool: &PgPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lecturers")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::user_with_role;
    use claim::{assert_none, assert_ok_eq};

    fn request(lecturer_number: &str) -> CreateLecturerRequest {
        CreateLecturerRequest {
            user_id: None,
            lecturer_number: lecturer_number.to_string(),
            department: "Electrical Engineering".to_string(),
        }
    }

    #[sqlx::test]
    #[ignore = "needs a live Postgres behind DATABASE_URL"]
    async fn lecturer_onboarding_is_once_per_user(pool: PgPool) {
        let user = user_with_role(&pool, "Lecturer").await;
        assert_none!(find_lecturer_by_user(&pool, user.id).await.unwrap());

        let lecturer = create_lecturer(&pool, user.id, &request("NIP0001"))
            .await
            .unwrap();
        assert_eq!(lecturer.user_id, user.id);
        let found = find_lecturer_by_user(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(found.id, lecturer.id);

        let error = create_lecturer(&pool, user.id, &request("NIP0002"))
            .await
            .unwrap_err();
        assert_eq!(error.error_type, AppErrorType::ConflictError);
        assert_ok_eq!(count_lecturers(&pool).await, 1);
    }
}
