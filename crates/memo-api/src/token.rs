use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use memo_types::api::Claims;

pub const TOKEN_TTL_DAYS: i64 = 7;

/// HS256-sign a session token bound to the user id, valid for 7 days.
pub fn issue(secret: &str, user_id: Uuid) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Resolve a token back to its user id. Fails on a bad signature, a
/// malformed payload or an elapsed expiry.
pub fn verify(secret: &str, token: &str) -> Result<Uuid> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue("s3cret", user_id).unwrap();
        assert_eq!(verify("s3cret", &token).unwrap(), user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("s3cret", Uuid::new_v4()).unwrap();
        assert!(verify("other", &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify("s3cret", "not-a-jwt").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            // well past the default validation leeway
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        assert!(verify("s3cret", &token).is_err());
    }
}
