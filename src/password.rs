use std::time::Duration;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::task;

/// Argon2 memory cost in kibibytes (~19 MB).
const ARGON2_MEMORY_COST: u32 = 19_456;
/// Argon2 time cost (iterations).
const ARGON2_TIME_COST: u32 = 2;
/// Argon2 parallelism (lanes).
const ARGON2_PARALLELISM: u32 = 1;
/// Length of the produced password hash output (bytes).
const ARGON2_OUTPUT_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing join error: {0}")]
    Join(#[from] task::JoinError),
    #[error("password hashing error: {0:?}")]
    Hash(PasswordHashError),
    #[error("argon2 parameter error: {0:?}")]
    Params(argon2::Error),
}

fn configured_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(
        ARGON2_MEMORY_COST,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(ARGON2_OUTPUT_LENGTH),
    )
    .map_err(PasswordError::Params)?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// The work runs on the blocking pool so request tasks are not stalled.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();

    task::spawn_blocking(move || -> Result<String, PasswordError> {
        let argon2 = configured_argon2()?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::Hash)?
            .to_string();
        Ok(hash)
    })
    .await?
}

/// Check a plaintext password against a stored PHC hash string.
///
/// Returns `Ok(false)` on mismatch; errors are reserved for malformed hashes and
/// runtime failures.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();

    task::spawn_blocking(move || -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(&stored_hash).map_err(PasswordError::Hash)?;
        let verifier = configured_argon2()?;

        match verifier.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(err) => Err(PasswordError::Hash(err)),
        }
    })
    .await?
}

/// Hash of a password no account has, computed on first use.
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Spend the same Argon2 verification work as [`verify_password`] when there is no stored hash.
///
/// Login attempts for unknown emails then take as long as wrong passwords.
pub async fn verify_dummy_password(password: &str) -> Result<(), PasswordError> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password("no-such-account-password"))
        .await?;
    verify_password(password, hash).await?;
    Ok(())
}

/// Sleep for a short random interval after a failed login to slow brute-force attempts.
pub async fn randomized_backoff() {
    let base_delay = Duration::from_millis(150);
    let jitter = Duration::from_millis(fastrand::u64(0..150));
    tokio::time::sleep(base_delay + jitter).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_are_salted_and_verifiable() {
        let first = hash_password("longenough1").await.unwrap();
        let second = hash_password("longenough1").await.unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password("longenough1", &first).await.unwrap());
        assert!(!verify_password("wrong-password", &first).await.unwrap());
    }

    #[tokio::test]
    async fn dummy_verification_uses_a_real_hash() {
        verify_dummy_password("whatever").await.unwrap();
        let hash = DUMMY_HASH.get().unwrap();
        assert!(hash.starts_with("$argon2id$"));

        verify_dummy_password("no-such-account-password").await.unwrap();
        assert_eq!(DUMMY_HASH.get().unwrap(), hash);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string").await,
            Err(PasswordError::Hash(_))
        ));
    }
}
