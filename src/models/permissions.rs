use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub resource: String,
    #[validate(length(min = 1, max = 50))]
    pub action: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignPermissionRequest {
    pub role_id: String,
    pub permission_id: String,
}

#[derive(Debug, Serialize)]
pub struct RolePermissions {
    pub role_id: Uuid,
    pub permissions: Vec<Permission>,
}
