//! Usernames and one-time passwords for onboarded employees.
//!
//! A credential is issued in three steps: generate a plaintext secret, hash
//! it with Argon2id under a fresh salt, then encode the PHC string for the
//! `password` column. Only the encoded hash is ever stored; the plaintext is
//! handed back to the caller once.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{Rng, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const PASSWORD_LENGTH: usize = 10;

const PASSWORD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz\
ABCDEFGHIJKLMNOPQRSTUVWXYZ\
0123456789\
!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const FALLBACK_NAME: &str = "user";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Trim, lowercase and collapse internal whitespace to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First token of the normalized name followed by the full decimal id,
/// e.g. `("Jane  Doe", 240705)` becomes `jane240705`.
pub fn generate_username(name: &str, employee_id: i64) -> String {
    let normalized = normalize_name(name);
    let first = normalized.split(' ').find(|part| !part.is_empty());
    format!("{}{employee_id}", first.unwrap_or(FALLBACK_NAME))
}

/// Random secret drawn from letters, digits and ASCII punctuation using the
/// operating system CSPRNG.
pub fn generate_password() -> SecretString {
    let mut rng = OsRng;
    let secret: String = (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect();
    SecretString::from(secret)
}

/// Argon2id hash in PHC string form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a PHC string handed back by the store driver.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }

    /// Check `candidate` with the hashing primitive's own verifier.
    pub fn verify(&self, candidate: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|err| CredentialError::MalformedHash(err.to_string()))?;
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CredentialError::Hash(err.to_string())),
        }
    }
}

pub fn hash_password(plaintext: &str) -> Result<PasswordDigest, CredentialError> {
    let salt = SaltString::generate(&mut password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| CredentialError::Hash(err.to_string()))?;
    Ok(PasswordDigest(hash.to_string()))
}

/// Storage form of a [`PasswordDigest`]. Opaque to application code: it is
/// written to the store and never decoded back for comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedHash(String);

impl EncodedHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

pub fn encode_for_storage(digest: &PasswordDigest) -> EncodedHash {
    EncodedHash(STANDARD.encode(digest.as_phc().as_bytes()))
}

/// A freshly issued credential. The plaintext is redacted from `Debug`.
#[derive(Debug)]
pub struct CredentialPair {
    pub plaintext: SecretString,
    pub encoded: EncodedHash,
}

/// Generate, hash and encode a new one-time password. CPU bound; async
/// callers should run it on the blocking pool.
pub fn issue_credentials() -> Result<CredentialPair, CredentialError> {
    let plaintext = generate_password();
    let digest = hash_password(plaintext.expose_secret())?;
    Ok(CredentialPair {
        plaintext,
        encoded: encode_for_storage(&digest),
    })
}
