use std::collections::BTreeMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::achievements::{AchievementDetail, AchievementDraft, Attachment, AttributeValue};
use crate::services::stores::AchievementDetailStore;

const ACHIEVEMENT_COLLECTION_NAME: &str = "achievements";

#[derive(Debug, Serialize, Deserialize)]
struct DetailDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    student_id: Uuid,
    achievement_type: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    points: i32,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<DetailDocument> for AchievementDetail {
    fn from(document: DetailDocument) -> Self {
        AchievementDetail {
            id: document.id.to_hex(),
            student_id: document.student_id,
            achievement_type: document.achievement_type,
            title: document.title,
            description: document.description,
            attributes: document.attributes,
            tags: document.tags,
            attachments: document.attachments,
            points: document.points,
            created_at: document.created_at.to_chrono(),
            updated_at: document.updated_at.to_chrono(),
        }
    }
}

/// Unparseable ids cannot name a stored document.
fn object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn content_update(draft: &AchievementDraft) -> Result<Document, AppError> {
    Ok(doc! {
        "$set": {
            "achievement_type": &draft.achievement_type,
            "title": &draft.title,
            "description": &draft.description,
            "attributes": bson::to_bson(&draft.attributes).map_err(AppError::db_error)?,
            "tags": draft.tags.clone(),
            "attachments": bson::to_bson(&draft.attachments).map_err(AppError::db_error)?,
            "points": draft.points,
            "updated_at": bson::DateTime::from_chrono(Utc::now()),
        }
    })
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

pub struct MongoAchievementDetails {
    collection: Collection<DetailDocument>,
}

impl MongoAchievementDetails {
    pub fn new(database: &Database) -> Self {
        MongoAchievementDetails {
            collection: database.collection(ACHIEVEMENT_COLLECTION_NAME),
        }
    }
}

#[async_trait]
impl AchievementDetailStore for MongoAchievementDetails {
    async fn insert(
        &self,
        student_id: Uuid,
        draft: &AchievementDraft,
    ) -> Result<AchievementDetail, AppError> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let document = DetailDocument {
            id: ObjectId::new(),
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

        self.collection.insert_one(&document, None).await?;
        Ok(document.into())
    }

    async fn find(&self, id: &str) -> Result<Option<AchievementDetail>, AppError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };

        let document = self.collection.find_one(doc! { "_id": oid }, None).await?;
        Ok(document.map(AchievementDetail::from))
    }

    async fn replace(
        &self,
        id: &str,
        draft: &AchievementDraft,
    ) -> Result<Option<AchievementDetail>, AppError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };

        let document = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, content_update(draft)?, return_updated())
            .await?;
        Ok(document.map(AchievementDetail::from))
    }

    async fn push_attachment(
        &self,
        id: &str,
        attachment: &Attachment,
    ) -> Result<Option<AchievementDetail>, AppError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };

        let update = doc! {
            "$push": { "attachments": bson::to_bson(attachment).map_err(AppError::db_error)? },
            "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) },
        };
        let document = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, update, return_updated())
            .await?;
        Ok(document.map(AchievementDetail::from))
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        if let Some(oid) = object_id(id) {
            self.collection.delete_one(doc! { "_id": oid }, None).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn documents_round_trip_through_bson() {
        let mut attributes = BTreeMap::new();
        attributes.insert("rank".to_string(), AttributeValue::Number(1.0));
        attributes.insert(
            "event_date".to_string(),
            AttributeValue::Date(NaiveDate::from_ymd_opt(2024, 8, 17).unwrap()),
        );
        attributes.insert("international".to_string(), AttributeValue::Bool(false));
        attributes.insert("organizer".to_string(), AttributeValue::Text("Puspresnas".to_string()));

        let now = bson::DateTime::now();
        let document = DetailDocument {
            id: ObjectId::new(),
            student_id: Uuid::new_v4(),
            achievement_type: "competition".to_string(),
            title: "Gold Medal, National Olympiad".to_string(),
            description: String::new(),
            attributes: attributes.clone(),
            tags: vec!["olympiad".to_string()],
            attachments: vec![],
            points: 50,
            created_at: now,
            updated_at: now,
        };

        let stored = bson::to_document(&document).unwrap();
        let loaded: DetailDocument = bson::from_document(stored).unwrap();
        let detail = AchievementDetail::from(loaded);

        assert_eq!(detail.id, document.id.to_hex());
        assert_eq!(detail.student_id, document.student_id);
        assert_eq!(detail.attributes, attributes);
        assert_eq!(detail.points, 50);
    }

    #[test]
    fn malformed_ids_match_nothing() {
        assert!(object_id("not-an-object-id").is_none());
        assert!(object_id(&ObjectId::new().to_hex()).is_some());
    }
}
