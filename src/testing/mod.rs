//! In-memory stores for exercising the lifecycle and the HTTP layer without
//! Postgres or MongoDB.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::achievements::{
    AchievementDetail, AchievementDraft, AchievementReference, AchievementStatus, Attachment,
    StatusChange,
};
use crate::models::students::StudentProfile;
use crate::services::stores::{
    AchievementDetailStore, AchievementReferenceStore, StatisticsSource, StudentDirectory,
};
use crate::services::{AchievementLifecycle, ReportAggregator};

fn injected_failure(store: &str) -> AppError {
    AppError::db_error(format!("{} unavailable", store))
}

#[derive(Default)]
pub struct InMemoryAchievementDetails {
    documents: Mutex<HashMap<String, AchievementDetail>>,
    fail_reads: AtomicBool,
}

impl InMemoryAchievementDetails {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AchievementDetailStore for InMemoryAchievementDetails {
    async fn insert(
        &self,
        student_id: Uuid,
        draft: &AchievementDraft,
    ) -> Result<AchievementDetail, AppError> {
        let now = Utc::now();
        let detail = AchievementDetail {
            id: ObjectId::new().to_hex(),
            student_id,
            achievement_type: draft.achievement_type.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            attributes: draft.attributes.clone(),
            tags: draft.tags.clone(),
            attachments: draft.attachments.clone(),
            points: draft.points,
            created_at: now,
            updated_at: now,
        };
        self.documents
            .lock()
            .unwrap()
            .insert(detail.id.clone(), detail.clone());
        Ok(detail)
    }

    async fn find(&self, id: &str) -> Result<Option<AchievementDetail>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected_failure("detail store"));
        }
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }

    async fn replace(
        &self,
        id: &str,
        draft: &AchievementDraft,
    ) -> Result<Option<AchievementDetail>, AppError> {
        let mut documents = self.documents.lock().unwrap();
        Ok(documents.get_mut(id).map(|detail| {
            detail.achievement_type = draft.achievement_type.clone();
            detail.title = draft.title.clone();
            detail.description = draft.description.clone();
            detail.attributes = draft.attributes.clone();
            detail.tags = draft.tags.clone();
            detail.attachments = draft.attachments.clone();
            detail.points = draft.points;
            detail.updated_at = Utc::now();
            detail.clone()
        }))
    }

    async fn push_attachment(
        &self,
        id: &str,
        attachment: &Attachment,
    ) -> Result<Option<AchievementDetail>, AppError> {
        let mut documents = self.documents.lock().unwrap();
        Ok(documents.get_mut(id).map(|detail| {
            detail.attachments.push(attachment.clone());
            detail.updated_at = Utc::now();
            detail.clone()
        }))
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAchievementReferences {
    rows: Mutex<Vec<AchievementReference>>,
    fail_inserts: AtomicBool,
}

impl InMemoryAchievementReferences {
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, id: Uuid) -> Option<AchievementReference> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_newest_first(
        &self,
        keep: impl Fn(&AchievementReference) -> bool,
    ) -> Vec<AchievementReference> {
        // Rows are appended in creation order.
        self.rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| !r.is_deleted() && keep(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AchievementReferenceStore for InMemoryAchievementReferences {
    async fn insert(
        &self,
        student_id: Uuid,
        detail_id: &str,
    ) -> Result<AchievementReference, AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure("reference store"));
        }
        let now = Utc::now();
        let reference = AchievementReference {
            id: Uuid::new_v4(),
            student_id,
            detail_id: detail_id.to_string(),
            status: AchievementStatus::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(reference.clone());
        Ok(reference)
    }

    async fn find(&self, id: Uuid) -> Result<Option<AchievementReference>, AppError> {
        Ok(self.get(id))
    }

    async fn list(
        &self,
        status: Option<AchievementStatus>,
    ) -> Result<Vec<AchievementReference>, AppError> {
        Ok(self.live_newest_first(|r| status.map_or(true, |s| r.status == s)))
    }

    async fn list_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AchievementReference>, AppError> {
        Ok(self.live_newest_first(|r| r.student_id == student_id))
    }

    async fn transition(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<AchievementReference>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|r| r.id == id && !r.is_deleted() && r.status == change.required_status())
            .map(|reference| {
                change.apply(reference);
                reference.clone()
            }))
    }

    async fn mark_edited(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|r| r.id == id && !r.is_deleted() && r.status != AchievementStatus::Verified)
            .map(|reference| {
                reference.updated_at = at;
                reference.clone()
            }))
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<AchievementReference>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|r| r.id == id && !r.is_deleted() && r.status != AchievementStatus::Verified)
            .map(|reference| {
                reference.deleted_at = Some(at);
                reference.updated_at = at;
                reference.clone()
            }))
    }
}

#[derive(Default)]
pub struct InMemoryStudents {
    profiles: Mutex<Vec<StudentProfile>>,
}

impl InMemoryStudents {
    pub fn add(&self, user_id: Uuid) -> StudentProfile {
        let mut profiles = self.profiles.lock().unwrap();
        let now = Utc::now();
        let profile = StudentProfile {
            id: Uuid::new_v4(),
            user_id,
            student_number: format!("NIM{:05}", profiles.len() + 1),
            program_study: "Informatics".to_string(),
            academic_year: "2024".to_string(),
            advisor_id: None,
            created_at: now,
            updated_at: now,
        };
        profiles.push(profile.clone());
        profile
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StudentDirectory for InMemoryStudents {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>, AppError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentProfile>, AppError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }
}

/// Counts straight off the other in-memory stores.
pub struct InMemoryStatistics {
    references: Arc<InMemoryAchievementReferences>,
    students: Arc<InMemoryStudents>,
    lecturers: AtomicI64,
    failing: AtomicBool,
}

#[async_trait]
impl StatisticsSource for InMemoryStatistics {
    async fn count_students(&self) -> Result<i64, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("statistics"));
        }
        Ok(self.students.len() as i64)
    }

    async fn count_lecturers(&self) -> Result<i64, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("statistics"));
        }
        Ok(self.lecturers.load(Ordering::SeqCst))
    }

    async fn count_achievements_by_status(&self) -> Result<Vec<(String, i64)>, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("statistics"));
        }
        let mut counts: HashMap<String, i64> = HashMap::new();
        for reference in self.references.live_newest_first(|_| true) {
            *counts.entry(reference.status.as_str().to_string()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

/// One shared set of in-memory stores.
pub struct TestStores {
    pub details: Arc<InMemoryAchievementDetails>,
    pub references: Arc<InMemoryAchievementReferences>,
    pub students: Arc<InMemoryStudents>,
    pub statistics: Arc<InMemoryStatistics>,
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStores {
    pub fn new() -> Self {
        let references = Arc::new(InMemoryAchievementReferences::default());
        let students = Arc::new(InMemoryStudents::default());
        let statistics = Arc::new(InMemoryStatistics {
            references: references.clone(),
            students: students.clone(),
            lecturers: AtomicI64::new(0),
            failing: AtomicBool::new(false),
        });
        TestStores {
            details: Arc::new(InMemoryAchievementDetails::default()),
            references,
            students,
            statistics,
        }
    }

    pub fn lifecycle(&self) -> AchievementLifecycle {
        AchievementLifecycle::new(
            self.details.clone(),
            self.references.clone(),
            self.students.clone(),
        )
    }

    pub fn reports(&self) -> ReportAggregator {
        ReportAggregator::new(
            self.statistics.clone(),
            self.references.clone(),
            self.students.clone(),
        )
    }

    pub fn add_student(&self, user_id: Uuid) -> StudentProfile {
        self.students.add(user_id)
    }

    pub fn set_lecturer_count(&self, count: i64) {
        self.statistics.lecturers.store(count, Ordering::SeqCst);
    }

    pub fn fail_statistics(&self, fail: bool) {
        self.statistics.failing.store(fail, Ordering::SeqCst);
    }

    pub fn reference(&self, id: Uuid) -> Option<AchievementReference> {
        self.references.get(id)
    }

    pub fn detail_count(&self) -> usize {
        self.details.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }
}
