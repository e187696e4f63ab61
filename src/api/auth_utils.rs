use actix_web::http::header::HeaderValue;
use argon2::Config;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{from_value, Value};

use crate::{
    config::{JWT_SECRET, SECRET_KEY},
    models::user_model::SlimUser,
};

use super::errors::{AuthError, TodoApiError};

// Hashing

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, TodoApiError> {
    let config = Config {
        secret: SECRET_KEY.as_bytes(),
        ..Default::default()
    };

    let salt = uuid::Uuid::new_v4();

    Ok(argon2::hash_encoded(
        password.as_bytes(),
        salt.as_bytes(),
        &config,
    )?)
}

/// Verify password and hash are equal
pub fn verify_hash(hash: &str, password: &str) -> Result<bool, TodoApiError> {
    argon2::verify_encoded_ext(hash, password.as_bytes(), SECRET_KEY.as_bytes(), &[]).map_err(
        |err| {
            log::warn!("Stored password hash could not be verified: {}", err);
            TodoApiError::AuthError(AuthError::InvalidCredentials)
        },
    )
}

// JWT STUFF
pub trait Claimable<'a>: Serialize + From<&'a SlimUser> + DeserializeOwned {}

pub fn encode_token<'a, T: Claimable<'a>>(user: &'a SlimUser) -> Result<String, AuthError> {
    Ok(encode::<T>(
        &Header::new(Algorithm::HS256),
        &user.into(),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )?)
}

/// Decodes a raw token. Only HS256 is accepted, whatever the token header claims.
pub fn decode_raw_token<'a, T: Claimable<'a>>(token: &str) -> Result<T, AuthError> {
    let raw_token = decode::<Value>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    from_value::<T>(raw_token.claims).map_err(AuthError::Claims)
}

/// Decodes a `Bearer <token>` header value
pub fn decode_token<'a, T: Claimable<'a>>(auth_header: &HeaderValue) -> Result<T, AuthError> {
    let auth_header_string = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationHeader)?;

    let token = auth_header_string
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorizationHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorizationHeader);
    }

    decode_raw_token::<T>(token)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::middlewares::auth::Claims;

    fn ann() -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();

        assert_ne!(hash, "hunter22");
        assert!(verify_hash(&hash, "hunter22").unwrap());
        assert!(!verify_hash(&hash, "hunter23").unwrap());
    }

    #[test]
    fn test_same_password_gets_different_hashes() {
        assert_ne!(
            hash_password("hunter22").unwrap(),
            hash_password("hunter22").unwrap()
        );
    }

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let user = ann();
        let token = encode_token::<Claims>(&user).unwrap();
        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();

        let claims = decode_token::<Claims>(&header).unwrap();

        assert_eq!(claims.id, user.id);
        assert_eq!(claims.name, "Ann");
    }

    #[test]
    fn test_rejects_malformed_headers() {
        let no_bearer = HeaderValue::from_static("Token abc");
        assert!(matches!(
            decode_token::<Claims>(&no_bearer),
            Err(AuthError::InvalidAuthorizationHeader)
        ));

        let garbage = HeaderValue::from_static("Bearer not.a.jwt");
        assert!(matches!(
            decode_token::<Claims>(&garbage),
            Err(AuthError::InvalidToken)
        ));
    }
}
