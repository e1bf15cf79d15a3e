//! Credential token formatting, parsing and salted hashing.

use std::{fmt, str::FromStr};

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

/// Credential token prefix.
pub const CREDENTIAL_PREFIX: &str = "rsk";

/// Number of secret bytes encoded in a token.
pub const CREDENTIAL_SECRET_BYTES: usize = 32;

/// Number of salt bytes mixed into the stored digest.
pub const CREDENTIAL_SALT_BYTES: usize = 16;

/// Length of a well-formed token: `rsk_v1_` + 32 uuid hex + `.` + 64 secret hex.
pub const CREDENTIAL_TOKEN_LEN: usize =
    CREDENTIAL_PREFIX.len() + 4 + 32 + 1 + CREDENTIAL_SECRET_BYTES * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialVersion {
    V1,
}

impl CredentialVersion {
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

impl FromStr for CredentialVersion {
    type Err = CredentialTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "v1" => Ok(Self::V1),
            _ => Err(CredentialTokenError::UnsupportedVersion),
        }
    }
}

#[derive(Clone)]
pub struct CredentialSecret {
    bytes: [u8; CREDENTIAL_SECRET_BYTES],
}

impl CredentialSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CREDENTIAL_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CREDENTIAL_SECRET_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialSecret(**redacted**)")
    }
}

impl Drop for CredentialSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct ParsedCredential {
    pub key_id: Uuid,
    pub version: CredentialVersion,
    pub secret: CredentialSecret,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialTokenError {
    #[error("credential format is invalid")]
    InvalidFormat,

    #[error("credential uses an unsupported version")]
    UnsupportedVersion,

    #[error("credential secret encoding is invalid")]
    InvalidSecretEncoding,
}

#[must_use]
pub fn generate_secret() -> CredentialSecret {
    let mut secret = [0_u8; CREDENTIAL_SECRET_BYTES];

    OsRng.fill_bytes(&mut secret);

    CredentialSecret::from_bytes(secret)
}

#[must_use]
pub fn generate_salt() -> [u8; CREDENTIAL_SALT_BYTES] {
    let mut salt = [0_u8; CREDENTIAL_SALT_BYTES];

    OsRng.fill_bytes(&mut salt);

    salt
}

#[must_use]
pub fn format_token(key_id: Uuid, version: CredentialVersion, secret: &CredentialSecret) -> String {
    format!(
        "{CREDENTIAL_PREFIX}_{}_{}.{}",
        version.segment(),
        key_id.simple(),
        hex::encode(secret.as_bytes())
    )
}

/// Split a presented token into its key id and secret.
///
/// # Errors
///
/// Returns an error when the token is not a well-formed credential.
pub fn parse_token(token: &str) -> Result<ParsedCredential, CredentialTokenError> {
    let (prefix_and_id, secret_hex) = token
        .split_once('.')
        .ok_or(CredentialTokenError::InvalidFormat)?;

    let mut id_parts = prefix_and_id.splitn(3, '_');

    let prefix = id_parts.next().ok_or(CredentialTokenError::InvalidFormat)?;
    let version_segment = id_parts.next().ok_or(CredentialTokenError::InvalidFormat)?;
    let key_segment = id_parts.next().ok_or(CredentialTokenError::InvalidFormat)?;

    if prefix != CREDENTIAL_PREFIX {
        return Err(CredentialTokenError::InvalidFormat);
    }

    let version = CredentialVersion::from_str(version_segment)?;

    let key_id =
        Uuid::try_parse(key_segment).map_err(|_err| CredentialTokenError::InvalidFormat)?;

    let mut secret = [0_u8; CREDENTIAL_SECRET_BYTES];

    hex::decode_to_slice(secret_hex, &mut secret)
        .map_err(|_err| CredentialTokenError::InvalidSecretEncoding)?;

    Ok(ParsedCredential {
        key_id,
        version,
        secret: CredentialSecret::from_bytes(secret),
    })
}

/// Hex SHA-256 digest of `salt ‖ secret`.
#[must_use]
pub fn hash_secret(salt: &[u8], secret: &CredentialSecret) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());

    hex::encode(hasher.finalize())
}

/// Compare a presented secret against a stored salt and digest in constant time.
#[must_use]
pub fn secret_matches(salt_hex: &str, hash_hex: &str, secret: &CredentialSecret) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };

    let presented = hash_secret(&salt, secret);

    presented.as_bytes().ct_eq(hash_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn formatted_tokens_parse_back() -> TestResult {
        let key_id = Uuid::now_v7();
        let secret = CredentialSecret::from_bytes([0xAB; CREDENTIAL_SECRET_BYTES]);
        let token = format_token(key_id, CredentialVersion::V1, &secret);

        assert_eq!(token.len(), CREDENTIAL_TOKEN_LEN);
        assert!(token.starts_with("rsk_v1_"));

        let parsed = parse_token(&token)?;

        assert_eq!(parsed.key_id, key_id);
        assert_eq!(parsed.version, CredentialVersion::V1);
        assert_eq!(parsed.secret.as_bytes(), secret.as_bytes());

        Ok(())
    }

    #[test]
    fn parse_rejects_foreign_prefix_and_bad_secret() {
        let key = Uuid::nil().simple().to_string();
        let secret = "ab".repeat(CREDENTIAL_SECRET_BYTES);

        assert_eq!(
            parse_token(&format!("lt_v1_{key}.{secret}")).err(),
            Some(CredentialTokenError::InvalidFormat)
        );
        assert_eq!(
            parse_token(&format!("rsk_v2_{key}.{secret}")).err(),
            Some(CredentialTokenError::UnsupportedVersion)
        );
        assert_eq!(
            parse_token(&format!("rsk_v1_{key}.zz")).err(),
            Some(CredentialTokenError::InvalidSecretEncoding)
        );
    }

    #[test]
    fn salted_hash_matches_only_the_original_secret() {
        let salt = generate_salt();
        let secret = generate_secret();
        let other = generate_secret();

        let stored = hash_secret(&salt, &secret);
        let salt_hex = hex::encode(salt);

        assert!(secret_matches(&salt_hex, &stored, &secret));
        assert!(!secret_matches(&salt_hex, &stored, &other));
        assert!(!secret_matches("not hex", &stored, &secret));
    }

    #[test]
    fn salt_changes_the_digest() {
        let secret = CredentialSecret::from_bytes([7; CREDENTIAL_SECRET_BYTES]);

        assert_ne!(
            hash_secret(&[1; CREDENTIAL_SALT_BYTES], &secret),
            hash_secret(&[2; CREDENTIAL_SALT_BYTES], &secret)
        );
    }

    #[test]
    fn secret_debug_output_is_redacted() {
        let secret = CredentialSecret::from_bytes([0xAB; CREDENTIAL_SECRET_BYTES]);

        assert_eq!(format!("{secret:?}"), "CredentialSecret(**redacted**)");
    }
}
