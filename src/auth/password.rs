use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
};

use crate::error::AppError;

fn hasher(work_factor: u32) -> Result<Argon2<'static>, AppError> {
    let params = Params::new(Params::DEFAULT_M_COST, work_factor, Params::DEFAULT_P_COST, None)
        .map_err(|e| AppError::Internal(format!("Invalid hash parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with Argon2id. A fresh random salt is drawn per call,
/// so the same plaintext never hashes to the same string twice.
pub fn hash_password(password: &str, work_factor: u32) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(hasher(work_factor)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string())
}

/// Verify a password against a stored PHC-format hash. A mismatch is a
/// normal `false`; so is an unparseable stored value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
