use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::{role::Role, user::UserProfile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "meena")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpReqDto {
    #[schema(example = "meena")]
    pub username: String,
    #[schema(example = "Meena R")]
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    /// Empty until one is picked in the form.
    #[serde(default)]
    #[schema(example = "BCA")]
    pub department: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub profile: UserProfile,
}

/// Service session token claims. The backend's own token never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    /// Session id in the coordinator's registry.
    pub jti: String,
}
