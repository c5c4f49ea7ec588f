use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::achievements::{
    AchievementDetail, AchievementDraft, AchievementReference, AchievementStatus, Attachment,
    StatusChange,
};
use crate::models::students::StudentProfile;

/// Document store holding achievement payloads.
#[async_trait]
pub trait AchievementDetailStore: Send + Sync {
    /// Assigns the document id and both timestamps.
    async fn insert(
        &self,
        student_id: Uuid,
        draft: &AchievementDraft,
    ) -> Result<AchievementDetail, AppError>;

    async fn find(&self, id: &str) -> Result<Option<AchievementDetail>, AppError>;

    /// Overwrites the content fields and bumps `updated_at`. `None` if absent.
    async fn replace(
        &self,
        id: &str,
        draft: &AchievementDraft,
    ) -> Result<Option<AchievementDetail>, AppError>;

    async fn push_attachment(
        &self,
        id: &str,
        attachment: &Attachment,
    ) -> Result<Option<AchievementDetail>, AppError>;

    async fn remove(&self, id: &str) -> Result<(), AppError>;
}

/// Relational store holding the authoritative status records.
#[async_trait]
pub trait AchievementReferenceStore: Send + Sync {
    /// Always inserts with status `draft`.
    async fn insert(
        &self,
        student_id: Uuid,
        detail_id: &str,
    ) -> Result<AchievementReference, AppError>;

    /// Includes soft-deleted records.
    async fn find(&self, id: Uuid) -> Result<Option<AchievementReference>, AppError>;

    /// Live records, newest first.
    async fn list(
        &self,
        status: Option<AchievementStatus>,
    ) -> Result<Vec<AchievementReference>, AppError>;

    /// Live records of one student, newest first.
    async fn list_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AchievementReference>, AppError>;

    /// Applies `change` only while the record is live and in `change.required_status()`.
    /// `None` means the guard did not match.
    async fn transition(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<AchievementReference>, AppError>;

    /// Bumps `updated_at` on a live, unverified record ahead of a content write.
    /// `None` if the guard did not match.
    async fn mark_edited(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError>;

    /// Sets the deletion marker on a live, unverified record. `None` if the guard did not match.
    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError>;
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentProfile>, AppError>;
}

#[async_trait]
pub trait StatisticsSource: Send + Sync {
    async fn count_students(&self) -> Result<i64, AppError>;
    async fn count_lecturers(&self) -> Result<i64, AppError>;
    /// Raw stored status literals with their live-record counts.
    async fn count_achievements_by_status(&self) -> Result<Vec<(String, i64)>, AppError>;
}
