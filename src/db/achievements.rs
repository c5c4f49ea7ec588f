use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::achievements::{AchievementReference, AchievementStatus, StatusChange};
use crate::services::stores::AchievementReferenceStore;

const REFERENCE_COLUMNS: &str = "id, student_id, detail_id, status, submitted_at, verified_at, \
     verified_by, rejection_note, created_at, updated_at, deleted_at";

#[derive(sqlx::FromRow)]
struct ReferenceRow {
    id: Uuid,
    student_id: Uuid,
    detail_id: String,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<Uuid>,
    rejection_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReferenceRow> for AchievementReference {
    type Error = AppError;

    fn try_from(row: ReferenceRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AchievementStatus>()
            .map_err(AppError::db_error)?;

        Ok(AchievementReference {
            id: row.id,
            student_id: row.student_id,
            detail_id: row.detail_id,
            status,
            submitted_at: row.submitted_at,
            verified_at: row.verified_at,
            verified_by: row.verified_by,
            rejection_note: row.rejection_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn into_references(rows: Vec<ReferenceRow>) -> Result<Vec<AchievementReference>, AppError> {
    rows.into_iter().map(AchievementReference::try_from).collect()
}

pub struct PgAchievementReferences {
    pool: PgPool,
}

impl PgAchievementReferences {
    pub fn new(pool: PgPool) -> Self {
        PgAchievementReferences { pool }
    }
}

#[async_trait]
impl AchievementReferenceStore for PgAchievementReferences {
    async fn insert(
        &self,
        student_id: Uuid,
        detail_id: &str,
    ) -> Result<AchievementReference, AppError> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            INSERT INTO achievement_references (student_id, detail_id, status)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(student_id)
        .bind(detail_id)
        .bind(AchievementStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find(&self, id: Uuid) -> Result<Option<AchievementReference>, AppError> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            "SELECT {} FROM achievement_references WHERE id = $1",
            REFERENCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AchievementReference::try_from).transpose()
    }

    async fn list(
        &self,
        status: Option<AchievementStatus>,
    ) -> Result<Vec<AchievementReference>, AppError> {
        let rows = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            SELECT {} FROM achievement_references
            WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        into_references(rows)
    }

    async fn list_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AchievementReference>, AppError> {
        let rows = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            SELECT {} FROM achievement_references
            WHERE student_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        into_references(rows)
    }

    async fn transition(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<AchievementReference>, AppError> {
        let (submitted_at, verified_at, verified_by, rejection_note, at) = match change {
            StatusChange::Submitted { at } => (Some(*at), None, None, None, *at),
            StatusChange::Verified { by, at } => (None, Some(*at), Some(*by), None, *at),
            StatusChange::Rejected { by, at, note } => {
                (None, Some(*at), Some(*by), Some(note.as_str()), *at)
            }
        };

        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            UPDATE achievement_references
            SET status = $1,
                submitted_at = COALESCE($2, submitted_at),
                verified_at = COALESCE($3, verified_at),
                verified_by = COALESCE($4, verified_by),
                rejection_note = COALESCE($5, rejection_note),
                updated_at = $6
            WHERE id = $7 AND status = $8 AND deleted_at IS NULL
            RETURNING {}
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(change.target().as_str())
        .bind(submitted_at)
        .bind(verified_at)
        .bind(verified_by)
        .bind(rejection_note)
        .bind(at)
        .bind(id)
        .bind(change.required_status().as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AchievementReference::try_from).transpose()
    }

    async fn mark_edited(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            UPDATE achievement_references
            SET updated_at = $1
            WHERE id = $2 AND deleted_at IS NULL AND status <> $3
            RETURNING {}
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(at)
        .bind(id)
        .bind(AchievementStatus::Verified.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AchievementReference::try_from).transpose()
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError> {
        let row = sqlx::query_as::<_, ReferenceRow>(&format!(
            r#"
            UPDATE achievement_references
            SET deleted_at = $1, updated_at = $1
            WHERE id = $2 AND deleted_at IS NULL AND status <> $3
            RETURNING {}
            "#,
            REFERENCE_COLUMNS
        ))
        .bind(at)
        .bind(id)
        .bind(AchievementStatus::Verified.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AchievementReference::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::user_with_role;
    use crate::db::students::create_student;
    use crate::models::students::CreateStudentRequest;
    use claim::{assert_none, assert_some};

    fn row(status: &str) -> ReferenceRow {
        let now = Utc::now();
        ReferenceRow {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            detail_id: "65f1c0ffee0000000000beef".to_string(),
            status: status.to_string(),
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn stored_status_is_normalized() {
        let reference = AchievementReference::try_from(row("Submitted")).unwrap();
        assert_eq!(reference.status, AchievementStatus::Submitted);
    }

    #[test]
    fn unknown_stored_status_is_a_storage_error() {
        let error = AchievementReference::try_from(row("archived")).unwrap_err();
        assert_eq!(error.error_type, crate::core::AppErrorType::DbError);
    }

    #[sqlx::test]
    #[ignore = "needs a live Postgres behind DATABASE_URL"]
    async fn guarded_writes_stop_once_verified(pool: PgPool) {
        let student_user = user_with_role(&pool, "Student").await;
        let lecturer_user = user_with_role(&pool, "Lecturer").await;
        let student = create_student(
            &pool,
            student_user.id,
            &CreateStudentRequest {
                student_number: "NIM0200".to_string(),
                program_study: "Informatics".to_string(),
                academic_year: "2024".to_string(),
            },
        )
        .await
        .unwrap();
        let store = PgAchievementReferences::new(pool.clone());
        let reference = store
            .insert(student.id, "65f1c0ffee0000000000beef")
            .await
            .unwrap();
        assert_eq!(reference.status, AchievementStatus::Draft);

        let verify = StatusChange::Verified {
            by: lecturer_user.id,
            at: Utc::now(),
        };
        assert_none!(store.transition(reference.id, &verify).await.unwrap());
        assert_some!(store.mark_edited(reference.id, Utc::now()).await.unwrap());

        let submit = StatusChange::Submitted { at: Utc::now() };
        assert_some!(store.transition(reference.id, &submit).await.unwrap());
        let verified = store.transition(reference.id, &verify).await.unwrap().unwrap();
        assert_eq!(verified.status, AchievementStatus::Verified);
        assert_eq!(verified.verified_by, Some(lecturer_user.id));

        assert_none!(store.mark_edited(reference.id, Utc::now()).await.unwrap());
        assert_none!(store.soft_delete(reference.id, Utc::now()).await.unwrap());
    }
}
