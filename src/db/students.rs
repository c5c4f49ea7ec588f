use crate::core::{AppError, AppErrorType};
use crate::models::students::{CreateStudentRequest, StudentProfile};
use crate::services::stores::StudentDirectory;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const STUDENT_COLUMNS: &str =
    "id, user_id, student_number, program_study, academic_year, advisor_id, created_at, updated_at";

/// The unique index on `user_id` decides races between concurrent onboardings.
pub async fn create_student(
    pool: &PgPool,
    user_id: Uuid,
    request: &CreateStudentRequest,
) -> Result<StudentProfile, AppError> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        r#"
        INSERT INTO students (user_id, student_number, program_study, academic_year)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .bind(request.student_number.trim())
    .bind(request.program_study.trim())
    .bind(request.academic_year.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        conflict if conflict.error_type == AppErrorType::ConflictError => {
            conflict.with_message("Student profile already exists")
        }
        other => other,
    })
}

pub async fn find_student_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<StudentProfile>, AppError> {
    let student = sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {} FROM students WHERE user_id = $1",
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(student)
}

pub async fn find_student_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<StudentProfile>, AppError> {
    let student = sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {} FROM students WHERE id = $1",
        STUDENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(student)
}

pub async fn list_students(pool: &PgPool) -> Result<Vec<StudentProfile>, AppError> {
    let students = sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {} FROM students ORDER BY student_number",
        STUDENT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(students)
}

pub async fn list_students_by_advisor(
    pool: &PgPool,
    advisor_id: Uuid,
) -> Result<Vec<StudentProfile>, AppError> {
    let students = sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {} FROM students WHERE advisor_id = $1 ORDER BY student_number",
        STUDENT_COLUMNS
    ))
    .bind(advisor_id)
    .fetch_all(pool)
    .await?;

    Ok(students)
}

pub async fn set_advisor(
    pool: &PgPool,
    student_id: Uuid,
    advisor_id: Uuid,
) -> Result<StudentProfile, AppError> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        r#"
        UPDATE students SET advisor_id = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING {}
        "#,
        STUDENT_COLUMNS
    ))
    .bind(advisor_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Student not found"))
}

pub async fn count_students(pool: &PgPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub struct PgStudentDirectory {
    pool: PgPool,
}

impl PgStudentDirectory {
    pub fn new(pool: PgPool) -> Self {
        PgStudentDirectory { pool }
    }
}

#[async_trait]
impl StudentDirectory for PgStudentDirectory {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>, AppError> {
        find_student_by_user(&self.pool, user_id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentProfile>, AppError> {
        find_student_by_id(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::user_with_role;
    use crate::db::lecturers::create_lecturer;
    use crate::models::lecturers::CreateLecturerRequest;
    use claim::{assert_ok_eq, assert_some_eq};

    fn request(student_number: &str) -> CreateStudentRequest {
        CreateStudentRequest {
            student_number: student_number.to_string(),
            program_study: "Informatics".to_string(),
            academic_year: "2024".to_string(),
        }
    }

    #[sqlx::test]
    #[ignore = "needs a live Postgres behind DATABASE_URL"]
    async fn second_profile_for_the_same_user_conflicts(pool: PgPool) {
        let user = user_with_role(&pool, "Student").await;
        create_student(&pool, user.id, &request("NIM0001")).await.unwrap();

        let error = create_student(&pool, user.id, &request("NIM0002"))
            .await
            .unwrap_err();
        assert_eq!(error.error_type, AppErrorType::ConflictError);
        assert_eq!(error.message.as_deref(), Some("Student profile already exists"));
        assert_ok_eq!(count_students(&pool).await, 1);
    }

    #[sqlx::test]
    #[ignore = "needs a live Postgres behind DATABASE_URL"]
    async fn advisor_assignment_shows_up_in_the_advisee_list(pool: PgPool) {
        let student_user = user_with_role(&pool, "Student").await;
        let lecturer_user = user_with_role(&pool, "Lecturer").await;
        let student = create_student(&pool, student_user.id, &request("NIM0100"))
            .await
            .unwrap();
        let lecturer = create_lecturer(
            &pool,
            lecturer_user.id,
            &CreateLecturerRequest {
                user_id: None,
                lecturer_number: "NIP0100".to_string(),
                department: "Computer Science".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = set_advisor(&pool, student.id, lecturer.id).await.unwrap();
        assert_some_eq!(updated.advisor_id, lecturer.id);

        let advisees = list_students_by_advisor(&pool, lecturer.id).await.unwrap();
        assert_eq!(advisees, vec![updated.clone()]);
        assert_ok_eq!(find_student_by_user(&pool, student_user.id).await, Some(updated));
    }

    #[sqlx::test]
    #[ignore = "needs a live Postgres behind DATABASE_URL"]
    async fn advisor_for_an_unknown_student_is_not_found(pool: PgPool) {
        let error = set_advisor(&pool, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(error.error_type, AppErrorType::NotFoundError);
    }
}
