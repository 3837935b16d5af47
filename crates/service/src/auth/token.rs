//! HS256 session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::domain::{AuthUser, Claims};
use super::errors::AuthError;

/// Issue a token for `user` valid for `ttl_hours`.
pub fn issue(secret: &str, user: &AuthUser, ttl_hours: i64) -> Result<(String, DateTime<Utc>), AuthError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user.id,
        role: user.role,
        name: user.name.clone(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
    Ok((token, expires_at))
}

/// Verify signature and expiry; any failure is `Unauthorized`.
pub fn verify(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::enums::{ApprovalStatus, Role};
    use uuid::Uuid;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Marta".into(),
            email: "marta@example.com".into(),
            username: "marta".into(),
            role: Role::Manager,
            active: true,
            approval_status: ApprovalStatus::Approved,
            preferred_lang: "cs".into(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let u = user();
        let (token, exp) = issue("0123456789abcdef", &u, 12).unwrap();
        let claims = verify("0123456789abcdef", &token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.name, "Marta");
        assert_eq!(claims.exp as i64, exp.timestamp());
    }

    #[test]
    fn wrong_secret_or_garbage_is_unauthorized() {
        let (token, _) = issue("0123456789abcdef", &user(), 1).unwrap();
        assert!(matches!(verify("fedcba9876543210", &token), Err(AuthError::Unauthorized)));
        assert!(matches!(verify("0123456789abcdef", "not.a.jwt"), Err(AuthError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) = issue("0123456789abcdef", &user(), -2).unwrap();
        assert!(matches!(verify("0123456789abcdef", &token), Err(AuthError::Unauthorized)));
    }
}
