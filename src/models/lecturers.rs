use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LecturerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lecturer_number: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLecturerRequest {
    /// Required when an admin creates the profile on behalf of a user.
    pub user_id: Option<String>,
    #[serde(alias = "lecturer_id")]
    #[validate(length(min = 1, max = 20))]
    pub lecturer_number: String,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
}
