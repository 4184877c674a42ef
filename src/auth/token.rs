use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Standard JWT subject - set to the username.
    sub: String,
}

/// Mint a session token asserting `username`.
pub fn issue_token(username: &str, secret: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: username.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
}

/// Recover the username a token asserts. Tokens carry no expiry claim;
/// the signature is the whole check, and any token that verifies is
/// trusted without a storage lookup.
pub fn decode_token(token: &str, secret: &str) -> Result<String, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(data.claims.sub)
}
