//! Salt generation backed by the operating system CSPRNG.
//!
//! There is deliberately no fallback: if the OS source fails, hashing fails.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Salt length shared by the bcrypt and Argon2id schemes.
pub const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
#[error("secure random source unavailable: {0}")]
pub struct RandomSourceError(#[from] rand::Error);

/// Draws a fresh salt from `OsRng`.
pub fn generate_salt() -> Result<[u8; SALT_LEN], RandomSourceError> {
    generate_salt_from(&mut OsRng)
}

pub(crate) fn generate_salt_from<R: RngCore + ?Sized>(
    rng: &mut R,
) -> Result<[u8; SALT_LEN], RandomSourceError> {
    let mut salt = [0u8; SALT_LEN];
    rng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}
