use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_number: String,
    pub program_study: String,
    pub academic_year: String,
    pub advisor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[serde(alias = "student_id")]
    #[validate(length(min = 1, max = 20))]
    pub student_number: String,
    #[validate(length(min = 1, max = 100))]
    pub program_study: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub academic_year: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAdvisorRequest {
    pub advisor_id: String,
}
