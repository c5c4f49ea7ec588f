use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::stores::{AchievementDetailStore, AchievementReferenceStore, StudentDirectory};
use crate::core::AppError;
use crate::models::achievements::{
    AchievementDetail, AchievementReference, AchievementRequest, AchievementStatus,
    AchievementView, Attachment, DetailPayload, StatusChange, VerificationDecision,
    VerifyAchievementRequest,
};
use crate::models::students::StudentProfile;

const DETAIL_UNAVAILABLE: &str = "Achievement detail is currently unavailable";

/// Drives an achievement through draft, submitted, verified and rejected,
/// keeping the reference record and its detail document in step.
pub struct AchievementLifecycle {
    details: Arc<dyn AchievementDetailStore>,
    references: Arc<dyn AchievementReferenceStore>,
    students: Arc<dyn StudentDirectory>,
}

impl AchievementLifecycle {
    pub fn new(
        details: Arc<dyn AchievementDetailStore>,
        references: Arc<dyn AchievementReferenceStore>,
        students: Arc<dyn StudentDirectory>,
    ) -> Self {
        AchievementLifecycle {
            details,
            references,
            students,
        }
    }

    /// Writes the detail first, then the draft reference. If the reference
    /// cannot be stored the detail is removed again before the error is returned.
    pub async fn create(
        &self,
        user_id: Uuid,
        request: AchievementRequest,
    ) -> Result<AchievementView, AppError> {
        let draft = request.into_draft()?;
        let student = self.student_for(user_id).await?;

        let detail = self.details.insert(student.id, &draft).await?;
        let reference = match self.references.insert(student.id, &detail.id).await {
            Ok(reference) => reference,
            Err(error) => {
                self.discard_detail(&detail).await;
                return Err(error);
            }
        };

        tracing::info!(
            achievement_id = %reference.id,
            student_id = %student.id,
            "achievement created as draft"
        );
        Ok(AchievementView {
            reference,
            detail: DetailPayload::Available(detail),
        })
    }

    /// The reference is required; the detail is best effort.
    pub async fn get(&self, id: Uuid) -> Result<AchievementView, AppError> {
        let reference = self.reference(id).await?;
        let detail = self.detail_payload(&reference.detail_id).await;
        Ok(AchievementView { reference, detail })
    }

    pub async fn list_all(
        &self,
        status: Option<AchievementStatus>,
    ) -> Result<Vec<AchievementReference>, AppError> {
        self.references.list(status).await
    }

    pub async fn list_mine(&self, user_id: Uuid) -> Result<Vec<AchievementReference>, AppError> {
        let student = self.student_for(user_id).await?;
        self.references.list_by_student(student.id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        request: AchievementRequest,
    ) -> Result<AchievementView, AppError> {
        let draft = request.into_draft()?;
        let reference = self.ensure_editable(id, user_id).await?;
        let previous = self.current_detail(&reference.detail_id).await?;
        let reference = self.claim_edit(reference.id).await?;

        let detail = self
            .details
            .replace(&reference.detail_id, &draft)
            .await?
            .ok_or_else(|| AppError::not_found("Achievement detail not found"))?;
        self.confirm_edit(reference.id, &previous).await?;

        tracing::info!(achievement_id = %reference.id, "achievement content replaced");
        Ok(AchievementView {
            reference,
            detail: DetailPayload::Available(detail),
        })
    }

    pub async fn submit(&self, id: Uuid, user_id: Uuid) -> Result<AchievementReference, AppError> {
        let reference = self.owned_live_reference(id, user_id).await?;
        if reference.status != AchievementStatus::Draft {
            return Err(AppError::invalid_state(format!(
                "Only draft achievements can be submitted, this one is {}",
                reference.status
            )));
        }

        let submitted = self
            .apply(reference.id, StatusChange::Submitted { at: Utc::now() })
            .await?;
        tracing::info!(achievement_id = %submitted.id, "achievement submitted for verification");
        Ok(submitted)
    }

    /// The decision is checked before the achievement is looked up.
    pub async fn verify(
        &self,
        id: Uuid,
        verifier_id: Uuid,
        request: &VerifyAchievementRequest,
    ) -> Result<AchievementReference, AppError> {
        let decision = VerificationDecision::from_request(request)?;

        let reference = self.reference(id).await?;
        if reference.is_deleted() {
            return Err(AppError::invalid_state("Achievement has been deleted"));
        }
        if reference.status != AchievementStatus::Submitted {
            return Err(AppError::invalid_state(format!(
                "Only submitted achievements can be verified, this one is {}",
                reference.status
            )));
        }

        let at = Utc::now();
        let change = match decision {
            VerificationDecision::Verified => StatusChange::Verified {
                by: verifier_id,
                at,
            },
            VerificationDecision::Rejected { note } => StatusChange::Rejected {
                by: verifier_id,
                at,
                note,
            },
        };

        let decided = self.apply(reference.id, change).await?;
        tracing::info!(
            achievement_id = %decided.id,
            verifier_id = %verifier_id,
            status = %decided.status,
            "achievement verification recorded"
        );
        Ok(decided)
    }

    pub async fn soft_delete(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<AchievementReference, AppError> {
        let reference = self.ensure_editable(id, user_id).await?;

        let deleted = self
            .references
            .soft_delete(reference.id, Utc::now())
            .await?
            .ok_or_else(concurrent_change)?;
        tracing::info!(achievement_id = %deleted.id, "achievement soft deleted");
        Ok(deleted)
    }

    pub async fn attach_file(
        &self,
        id: Uuid,
        user_id: Uuid,
        attachment: Attachment,
    ) -> Result<AchievementDetail, AppError> {
        let reference = self.ensure_editable(id, user_id).await?;
        let previous = self.current_detail(&reference.detail_id).await?;
        let reference = self.claim_edit(reference.id).await?;

        let detail = self
            .details
            .push_attachment(&reference.detail_id, &attachment)
            .await?
            .ok_or_else(|| AppError::not_found("Achievement detail not found"))?;
        self.confirm_edit(reference.id, &previous).await?;
        Ok(detail)
    }

    /// Existence, ownership, liveness, then not verified. Shared by every
    /// content mutation so the upload route can check before touching disk.
    pub async fn ensure_editable(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<AchievementReference, AppError> {
        let reference = self.owned_live_reference(id, user_id).await?;
        if reference.status == AchievementStatus::Verified {
            return Err(AppError::invalid_state(
                "Verified achievements can no longer be changed",
            ));
        }
        Ok(reference)
    }

    async fn owned_live_reference(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<AchievementReference, AppError> {
        let reference = self.reference(id).await?;
        let student = self.student_for(user_id).await?;

        if reference.student_id != student.id {
            return Err(AppError::forbidden_error(
                "You can only manage your own achievements",
            ));
        }
        if reference.is_deleted() {
            return Err(AppError::invalid_state("Achievement has been deleted"));
        }
        Ok(reference)
    }

    async fn current_detail(&self, detail_id: &str) -> Result<AchievementDetail, AppError> {
        self.details
            .find(detail_id)
            .await?
            .ok_or_else(|| AppError::not_found("Achievement detail not found"))
    }

    /// Guarded write on the reference so a record verified or deleted since
    /// `ensure_editable` is not edited.
    async fn claim_edit(&self, id: Uuid) -> Result<AchievementReference, AppError> {
        self.references
            .mark_edited(id, Utc::now())
            .await?
            .ok_or_else(concurrent_change)
    }

    /// A verification or deletion that committed while the detail was being
    /// written wins; the previous content is put back.
    async fn confirm_edit(&self, id: Uuid, previous: &AchievementDetail) -> Result<(), AppError> {
        let current = self.reference(id).await?;
        if !current.is_deleted() && current.status != AchievementStatus::Verified {
            return Ok(());
        }

        match self.details.replace(&previous.id, &previous.content()).await {
            Ok(_) => tracing::warn!(
                achievement_id = %id,
                status = %current.status,
                "achievement changed during a content write, previous content restored"
            ),
            Err(e) => tracing::error!(
                achievement_id = %id,
                error.cause = ?e.cause,
                "previous achievement content could not be restored after a lost race"
            ),
        }
        Err(concurrent_change())
    }

    async fn reference(&self, id: Uuid) -> Result<AchievementReference, AppError> {
        self.references
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Achievement not found"))
    }

    async fn student_for(&self, user_id: Uuid) -> Result<StudentProfile, AppError> {
        self.students.find_by_user(user_id).await?.ok_or_else(|| {
            AppError::not_found("Student profile not found, complete your student data first")
        })
    }

    async fn apply(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<AchievementReference, AppError> {
        self.references
            .transition(id, &change)
            .await?
            .ok_or_else(concurrent_change)
    }

    async fn detail_payload(&self, detail_id: &str) -> DetailPayload {
        match self.details.find(detail_id).await {
            Ok(Some(detail)) => DetailPayload::Available(detail),
            Ok(None) => {
                tracing::warn!(detail_id, "achievement detail document is missing");
                DetailPayload::Unavailable {
                    message: DETAIL_UNAVAILABLE.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    detail_id,
                    error.cause = ?e.cause,
                    "failed to load achievement detail"
                );
                DetailPayload::Unavailable {
                    message: DETAIL_UNAVAILABLE.to_string(),
                }
            }
        }
    }

    async fn discard_detail(&self, detail: &AchievementDetail) {
        match self.details.remove(&detail.id).await {
            Ok(()) => tracing::warn!(
                detail_id = %detail.id,
                "reference insert failed, achievement detail removed"
            ),
            Err(e) => tracing::error!(
                detail_id = %detail.id,
                error.cause = ?e.cause,
                "reference insert failed and the orphaned achievement detail could not be removed"
            ),
        }
    }
}

fn concurrent_change() -> AppError {
    AppError::invalid_state("Achievement was changed by another request, reload and try again")
}
