use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::utils::required_text;
use crate::core::AppError;

const MAX_TYPE_LENGTH: usize = 50;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_TAG_LENGTH: usize = 50;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a valid achievement status")]
pub struct UnknownStatus(pub String);

impl From<UnknownStatus> for AppError {
    fn from(error: UnknownStatus) -> Self {
        AppError::validation_error(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
}

impl AchievementStatus {
    pub const ALL: [AchievementStatus; 4] = [
        AchievementStatus::Draft,
        AchievementStatus::Submitted,
        AchievementStatus::Verified,
        AchievementStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Draft => "draft",
            AchievementStatus::Submitted => "submitted",
            AchievementStatus::Verified => "verified",
            AchievementStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for AchievementStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(AchievementStatus::Draft),
            "submitted" => Ok(AchievementStatus::Submitted),
            "verified" => Ok(AchievementStatus::Verified),
            "rejected" => Ok(AchievementStatus::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative status record, stored relationally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementReference {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Document id of the detail payload; not enforced by the relational side.
    pub detail_id: String,
    pub status: AchievementStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub rejection_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AchievementReference {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Scalar values allowed in the open attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
}

/// Free-form payload, stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDetail {
    pub id: String,
    pub student_id: Uuid,
    pub achievement_type: String,
    pub title: String,
    pub description: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated achievement content, ready to be written to the detail store.
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementDraft {
    pub achievement_type: String,
    pub title: String,
    pub description: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub points: i32,
}

impl AchievementDetail {
    /// The writable content, used to put a document back after a lost race.
    pub fn content(&self) -> AchievementDraft {
        AchievementDraft {
            achievement_type: self.achievement_type.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            attributes: self.attributes.clone(),
            tags: self.tags.clone(),
            attachments: self.attachments.clone(),
            points: self.points,
        }
    }
}

/// Body of both create and update; update overwrites every field.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementRequest {
    #[serde(rename = "type", alias = "achievement_type")]
    pub achievement_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "details")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub points: Option<i32>,
}

impl AchievementRequest {
    pub fn into_draft(self) -> Result<AchievementDraft, AppError> {
        let achievement_type = required_text(&self.achievement_type, "type", MAX_TYPE_LENGTH)?;
        let title = required_text(&self.title, "title", MAX_TITLE_LENGTH)?;

        let mut tags = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().filter(|tag| !tag.trim().is_empty()) {
            let tag = required_text(tag, "tag", MAX_TAG_LENGTH)?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        if self.attributes.keys().any(|key| key.trim().is_empty()) {
            return Err(AppError::validation_error("attribute names must not be blank"));
        }

        let points = self.points.unwrap_or(0);
        if points < 0 {
            return Err(AppError::validation_error("points must not be negative"));
        }

        Ok(AchievementDraft {
            achievement_type,
            title,
            description: self.description.trim().to_string(),
            attributes: self.attributes,
            tags,
            attachments: self.attachments,
            points,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyAchievementRequest {
    pub status: String,
    #[serde(default, alias = "note")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationDecision {
    Verified,
    Rejected { note: String },
}

impl VerificationDecision {
    /// Checks the literal and, for rejections, the note. Runs before any lookup.
    pub fn from_request(request: &VerifyAchievementRequest) -> Result<Self, AppError> {
        let status: AchievementStatus = request.status.parse().map_err(|_| {
            AppError::validation_error("status must be either verified or rejected")
        })?;

        match status {
            AchievementStatus::Verified => Ok(VerificationDecision::Verified),
            AchievementStatus::Rejected => {
                let note = request
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|note| !note.is_empty())
                    .ok_or_else(|| {
                        AppError::validation_error(
                            "a rejection note is required when rejecting an achievement",
                        )
                    })?;
                Ok(VerificationDecision::Rejected {
                    note: note.to_string(),
                })
            }
            AchievementStatus::Draft | AchievementStatus::Submitted => Err(
                AppError::validation_error("status must be either verified or rejected"),
            ),
        }
    }
}

/// A status transition as persisted by the reference store.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Submitted {
        at: DateTime<Utc>,
    },
    Verified {
        by: Uuid,
        at: DateTime<Utc>,
    },
    Rejected {
        by: Uuid,
        at: DateTime<Utc>,
        note: String,
    },
}

impl StatusChange {
    pub fn target(&self) -> AchievementStatus {
        match self {
            StatusChange::Submitted { .. } => AchievementStatus::Submitted,
            StatusChange::Verified { .. } => AchievementStatus::Verified,
            StatusChange::Rejected { .. } => AchievementStatus::Rejected,
        }
    }

    /// The only status this change may be applied to.
    pub fn required_status(&self) -> AchievementStatus {
        match self {
            StatusChange::Submitted { .. } => AchievementStatus::Draft,
            StatusChange::Verified { .. } | StatusChange::Rejected { .. } => {
                AchievementStatus::Submitted
            }
        }
    }

    pub fn apply(&self, reference: &mut AchievementReference) {
        reference.status = self.target();
        match self {
            StatusChange::Submitted { at } => {
                reference.submitted_at = Some(*at);
                reference.updated_at = *at;
            }
            StatusChange::Verified { by, at } => {
                reference.verified_by = Some(*by);
                reference.verified_at = Some(*at);
                reference.updated_at = *at;
            }
            StatusChange::Rejected { by, at, note } => {
                reference.verified_by = Some(*by);
                reference.verified_at = Some(*at);
                reference.rejection_note = Some(note.clone());
                reference.updated_at = *at;
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DetailPayload {
    Available(AchievementDetail),
    Unavailable { message: String },
}

#[derive(Debug, Serialize)]
pub struct AchievementView {
    #[serde(flatten)]
    pub reference: AchievementReference,
    pub detail: DetailPayload,
}

#[derive(Debug, Deserialize)]
pub struct ListAchievementsQuery {
    pub status: Option<String>,
}
