use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::role::Role;

/// Row of `user_profiles`, written by the backend when an account signs up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "6f1c1e7e-2f7a-4a43-9d0c-7d1c2b0e7a11",
    "username": "kavitha",
    "full_name": "Kavitha R",
    "role": "teacher",
    "department": "B.Sc. Computer Science",
    "created_at": "2026-06-01T09:00:00Z",
    "updated_at": "2026-06-01T09:00:00Z"
}))]
pub struct UserProfile {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub department: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
