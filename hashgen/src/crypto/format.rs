//! Parsing for the textual hash encodings this crate produces.
//!
//! bcrypt: `$<version>$<cost>$<22 salt chars><31 digest chars>`, using bcrypt's
//! own base64 alphabet (`./A-Za-z0-9`) without padding.
//! Argon2id: a PHC string, parsed with the `password-hash` crate.

use std::fmt;

use argon2::password_hash::PasswordHash;
use argon2::Params;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

use super::passwords::{BcryptVersion, MAX_COST, MIN_COST};
use super::salt::SALT_LEN;

pub const BCRYPT_HASH_LEN: usize = 60;
const BCRYPT_SALT_CHARS: usize = 22;
const BCRYPT_DIGEST_CHARS: usize = 31;
const BCRYPT_DIGEST_LEN: usize = 23;

/// Other implementations do not always zero the unused low bits of the final
/// character, so decoding tolerates them.
const BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unrecognized hash; expected a bcrypt ($2b$...) or argon2id ($argon2id$...) string")]
    UnknownScheme,
    #[error("hash contains non-ASCII characters")]
    NonAscii,
    #[error("bcrypt hash must be {expected} characters, got {0}", expected = BCRYPT_HASH_LEN)]
    BcryptLength(usize),
    #[error("unsupported bcrypt version `{0}`")]
    BcryptVersion(String),
    #[error(
        "invalid bcrypt cost `{0}` (expected two digits in {min}..={max})",
        min = MIN_COST,
        max = MAX_COST
    )]
    BcryptCost(String),
    #[error("invalid bcrypt {field} encoding: {source}")]
    Base64 {
        field: &'static str,
        source: base64::DecodeError,
    },
    #[error("invalid PHC string: {0}")]
    Phc(String),
    #[error("unsupported PHC algorithm `{0}`")]
    PhcAlgorithm(String),
}

/// Parsed structure of a bcrypt hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BcryptInfo {
    pub version: BcryptVersion,
    pub cost: u32,
    pub salt: [u8; SALT_LEN],
    pub salt_text: String,
    pub digest: Vec<u8>,
}

/// Parsed structure of an Argon2id PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Info {
    pub version: Option<u32>,
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub salt_text: String,
    pub digest_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashInfo {
    Bcrypt(BcryptInfo),
    Argon2id(Argon2Info),
}

/// Identifies the scheme of `hash` and validates every field of it.
pub fn parse(hash: &str) -> Result<HashInfo, FormatError> {
    if !hash.is_ascii() {
        return Err(FormatError::NonAscii);
    }
    if hash.starts_with("$2") {
        parse_bcrypt(hash).map(HashInfo::Bcrypt)
    } else if hash.starts_with("$argon2") {
        parse_argon2id(hash).map(HashInfo::Argon2id)
    } else {
        Err(FormatError::UnknownScheme)
    }
}

fn parse_bcrypt(hash: &str) -> Result<BcryptInfo, FormatError> {
    if hash.len() != BCRYPT_HASH_LEN {
        return Err(FormatError::BcryptLength(hash.len()));
    }

    let mut fields = hash[1..].splitn(3, '$');
    let version_text = fields.next().unwrap_or_default();
    let version = BcryptVersion::from_prefix(version_text)
        .ok_or_else(|| FormatError::BcryptVersion(version_text.to_string()))?;

    let cost_text = fields.next().unwrap_or_default();
    let cost =
        parse_cost(cost_text).ok_or_else(|| FormatError::BcryptCost(cost_text.to_string()))?;

    // Fixed overall length plus 2-char version and cost leave exactly 53 chars.
    let payload = fields.next().unwrap_or_default();
    if payload.len() != BCRYPT_SALT_CHARS + BCRYPT_DIGEST_CHARS {
        return Err(FormatError::BcryptLength(hash.len()));
    }
    let (salt_text, digest_text) = payload.split_at(BCRYPT_SALT_CHARS);

    let salt_bytes = BCRYPT_BASE64
        .decode(salt_text)
        .map_err(|source| FormatError::Base64 { field: "salt", source })?;
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&salt_bytes[..SALT_LEN]);

    let digest = BCRYPT_BASE64
        .decode(digest_text)
        .map_err(|source| FormatError::Base64 { field: "digest", source })?;
    debug_assert_eq!(digest.len(), BCRYPT_DIGEST_LEN);

    Ok(BcryptInfo {
        version,
        cost,
        salt,
        salt_text: salt_text.to_string(),
        digest,
    })
}

fn parse_cost(text: &str) -> Option<u32> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let cost: u32 = text.parse().ok()?;
    (MIN_COST..=MAX_COST).contains(&cost).then_some(cost)
}

fn parse_argon2id(hash: &str) -> Result<Argon2Info, FormatError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| FormatError::Phc(format!("{e}")))?;
    if parsed.algorithm.as_str() != "argon2id" {
        return Err(FormatError::PhcAlgorithm(parsed.algorithm.as_str().to_string()));
    }

    let params = Params::try_from(&parsed)
        .map_err(|e| FormatError::Phc(format!("{e}")))?;
    let salt = parsed
        .salt
        .ok_or_else(|| FormatError::Phc("missing salt".to_string()))?;
    let digest = parsed
        .hash
        .ok_or_else(|| FormatError::Phc("missing hash output".to_string()))?;

    Ok(Argon2Info {
        version: parsed.version,
        memory_kib: params.m_cost(),
        time_cost: params.t_cost(),
        parallelism: params.p_cost(),
        salt_text: salt.as_str().to_string(),
        digest_len: digest.len(),
    })
}

/// Encodes salt bytes the way they appear inside a bcrypt hash.
pub fn encode_bcrypt_salt(salt: &[u8; SALT_LEN]) -> String {
    BCRYPT_BASE64.encode(salt)
}

impl fmt::Display for HashInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashInfo::Bcrypt(info) => {
                writeln!(f, "scheme: bcrypt")?;
                writeln!(f, "version: {}", info.version)?;
                writeln!(f, "cost: {}", info.cost)?;
                write!(f, "salt: {}", info.salt_text)
            }
            HashInfo::Argon2id(info) => {
                writeln!(f, "scheme: argon2id")?;
                match info.version {
                    Some(version) => writeln!(f, "version: {version}")?,
                    None => writeln!(f, "version: unspecified")?,
                }
                writeln!(f, "memory_kib: {}", info.memory_kib)?;
                writeln!(f, "time_cost: {}", info.time_cost)?;
                writeln!(f, "parallelism: {}", info.parallelism)?;
                write!(f, "salt: {}", info.salt_text)
            }
        }
    }
}
