use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};

use crate::{model::user::UserProfile, models::Claims};

pub fn generate_access_token(
    profile: &UserProfile,
    session_id: &str,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String, Error> {
    let claims = Claims {
        user_id: profile.id,
        sub: profile.username.clone(),
        role: profile.role,
        exp: expires_at.timestamp().max(0) as usize,
        jti: session_id.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::Duration;
    use uuid::Uuid;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            username: "meena".into(),
            full_name: "Meena R".into(),
            role: Role::Staff,
            department: "BCA".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_session_and_role() {
        let profile = profile();
        let token =
            generate_access_token(&profile, "s-1", Utc::now() + Duration::hours(1), "k").unwrap();
        let claims = verify_token(&token, "k").unwrap();
        assert_eq!(claims.user_id, profile.id);
        assert_eq!(claims.sub, "meena");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.jti, "s-1");
    }

    #[test]
    fn wrong_secret_or_expired_token_is_rejected() {
        let profile = profile();
        let token =
            generate_access_token(&profile, "s-1", Utc::now() + Duration::hours(1), "k").unwrap();
        assert!(verify_token(&token, "other").is_err());

        let stale =
            generate_access_token(&profile, "s-1", Utc::now() - Duration::hours(1), "k").unwrap();
        assert!(verify_token(&stale, "k").is_err());
    }
}
