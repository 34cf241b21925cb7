//! Password hashing built around bcrypt, with Argon2id as an alternate scheme.
//! Every hash embeds its own salt and cost parameters, so verification only
//! needs the hash string and the candidate password.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::format::{self, Argon2Info, FormatError, HashInfo};
use super::salt::{generate_salt, RandomSourceError, SALT_LEN};

/// Work factor used when nothing else is configured. Each increment doubles
/// the time one hash takes.
pub const DEFAULT_COST: u32 = 12;
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// bcrypt only reads this many bytes of a password.
pub const MAX_BCRYPT_PASSWORD_LEN: usize = 72;

/// Upper bounds on Argon2id work accepted from settings or from a stored hash.
/// The algorithm itself allows up to `u32::MAX` for each.
pub const MAX_ARGON2_MEMORY_KIB: u32 = 1024 * 1024;
pub const MAX_ARGON2_TIME_COST: u32 = 32;
pub const MAX_ARGON2_PARALLELISM: u32 = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error(
        "password is {0} bytes; bcrypt only reads the first {max}",
        max = MAX_BCRYPT_PASSWORD_LEN
    )]
    PasswordTooLong(usize),
    #[error("bcrypt cost {0} is outside {min}..={max}", min = MIN_COST, max = MAX_COST)]
    InvalidCost(u32),
    #[error("bcrypt version 2x is only accepted for verification")]
    LegacyVersion,
    #[error("argon2 {name} {value} exceeds the limit of {max}")]
    Argon2Limit {
        name: &'static str,
        value: u32,
        max: u32,
    },
    #[error(transparent)]
    RandomSource(#[from] RandomSourceError),
    #[error("bcrypt failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("argon2 failed: {0}")]
    Argon2(String),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Adaptive hashing algorithm used for new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Bcrypt,
    Argon2id,
}

impl Scheme {
    /// Human-readable line printed ahead of a freshly generated hash.
    pub fn label(self) -> &'static str {
        match self {
            Scheme::Bcrypt => "Bcrypt hash for the supplied password:",
            Scheme::Argon2id => "Argon2id hash for the supplied password:",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Bcrypt => f.write_str("bcrypt"),
            Scheme::Argon2id => f.write_str("argon2id"),
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(Scheme::Bcrypt),
            "argon2id" => Ok(Scheme::Argon2id),
            other => Err(format!("unknown scheme `{other}` (expected bcrypt or argon2id)")),
        }
    }
}

/// Prefix of a bcrypt hash. `2b` is what current implementations emit.
/// `2x` tags hashes from crypt_blowfish's sign-extension bug: it is parsed
/// and verified, never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum BcryptVersion {
    #[serde(rename = "2a")]
    #[value(name = "2a")]
    V2a,
    #[default]
    #[serde(rename = "2b")]
    #[value(name = "2b")]
    V2b,
    #[serde(skip_deserializing)]
    #[value(skip)]
    V2x,
    #[serde(rename = "2y")]
    #[value(name = "2y")]
    V2y,
}

impl BcryptVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            BcryptVersion::V2a => "2a",
            BcryptVersion::V2b => "2b",
            BcryptVersion::V2x => "2x",
            BcryptVersion::V2y => "2y",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "2a" => Some(BcryptVersion::V2a),
            "2b" => Some(BcryptVersion::V2b),
            "2x" => Some(BcryptVersion::V2x),
            "2y" => Some(BcryptVersion::V2y),
            _ => None,
        }
    }

    fn to_bcrypt(self) -> bcrypt::Version {
        match self {
            BcryptVersion::V2a => bcrypt::Version::TwoA,
            BcryptVersion::V2b => bcrypt::Version::TwoB,
            BcryptVersion::V2x => bcrypt::Version::TwoX,
            BcryptVersion::V2y => bcrypt::Version::TwoY,
        }
    }
}

impl fmt::Display for BcryptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses an output version; `2x` is rejected here.
impl FromStr for BcryptVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match BcryptVersion::from_prefix(trimmed.trim_start_matches('$')) {
            Some(BcryptVersion::V2x) | None => Err(format!(
                "unsupported bcrypt version `{trimmed}` (expected 2a, 2b or 2y)"
            )),
            Some(version) => Ok(version),
        }
    }
}

/// Argon2id parameters. The defaults cost one interactive-feeling hash on a
/// workstation:
/// - memory_kib: 19 MiB of scratch memory per hash
/// - time_cost: 2 passes over that memory
/// - parallelism: 1 lane, since hashing runs on a single thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl From<&Argon2Info> for Argon2Params {
    fn from(info: &Argon2Info) -> Self {
        Self {
            memory_kib: info.memory_kib,
            time_cost: info.time_cost,
            parallelism: info.parallelism,
        }
    }
}

impl Argon2Params {
    fn build(&self) -> Result<Argon2<'static>, PasswordError> {
        self.validate()?;
        let params = Params::new(self.memory_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| PasswordError::Argon2(format!("{e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Checks the parameters against this crate's work limits and Argon2's
    /// own bounds without hashing anything.
    pub fn validate(&self) -> Result<(), PasswordError> {
        let limits = [
            ("memory_kib", self.memory_kib, MAX_ARGON2_MEMORY_KIB),
            ("time_cost", self.time_cost, MAX_ARGON2_TIME_COST),
            ("parallelism", self.parallelism, MAX_ARGON2_PARALLELISM),
        ];
        for (name, value, max) in limits {
            if value > max {
                return Err(PasswordError::Argon2Limit { name, value, max });
            }
        }
        Params::new(self.memory_kib, self.time_cost, self.parallelism, None)
            .map(|_| ())
            .map_err(|e| PasswordError::Argon2(format!("{e}")))
    }
}

/// A configured hash generator. Construct one per run and call [`Hasher::hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hasher {
    scheme: Scheme,
    cost: u32,
    version: BcryptVersion,
    argon2: Argon2Params,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::bcrypt(DEFAULT_COST)
    }
}

impl Hasher {
    pub fn bcrypt(cost: u32) -> Self {
        Self {
            scheme: Scheme::Bcrypt,
            cost,
            version: BcryptVersion::default(),
            argon2: Argon2Params::default(),
        }
    }

    pub fn argon2id(params: Argon2Params) -> Self {
        Self {
            scheme: Scheme::Argon2id,
            argon2: params,
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: BcryptVersion) -> Self {
        self.version = version;
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// bcrypt cost; meaningless for Argon2id.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn argon2_params(&self) -> Argon2Params {
        self.argon2
    }

    /// Hashes `password` under a fresh salt from the OS random source.
    pub fn hash(&self, password: &[u8]) -> Result<String, PasswordError> {
        self.check_password(password)?;
        let salt = generate_salt()?;
        self.hash_with_salt(password, salt)
    }

    /// Hashes with a caller-supplied salt. Only meant for reproducible output;
    /// new hashes should always go through [`Hasher::hash`].
    pub fn hash_with_salt(
        &self,
        password: &[u8],
        salt: [u8; SALT_LEN],
    ) -> Result<String, PasswordError> {
        self.check_password(password)?;
        match self.scheme {
            Scheme::Bcrypt => {
                check_cost(self.cost)?;
                if self.version == BcryptVersion::V2x {
                    return Err(PasswordError::LegacyVersion);
                }
                debug!(cost = self.cost, version = %self.version, "computing bcrypt hash");
                let parts = bcrypt::hash_with_salt(password, self.cost, salt)?;
                Ok(parts.format_for_version(self.version.to_bcrypt()))
            }
            Scheme::Argon2id => {
                debug!(
                    memory_kib = self.argon2.memory_kib,
                    time_cost = self.argon2.time_cost,
                    parallelism = self.argon2.parallelism,
                    "computing argon2id hash"
                );
                let argon2 = self.argon2.build()?;
                let salt = SaltString::encode_b64(&salt)
                    .map_err(|e| PasswordError::Argon2(format!("{e}")))?;
                let hash = argon2
                    .hash_password(password, &salt)
                    .map_err(|e| PasswordError::Argon2(format!("{e}")))?;
                Ok(hash.to_string())
            }
        }
    }

    fn check_password(&self, password: &[u8]) -> Result<(), PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }
        if self.scheme == Scheme::Bcrypt && password.len() > MAX_BCRYPT_PASSWORD_LEN {
            return Err(PasswordError::PasswordTooLong(password.len()));
        }
        Ok(())
    }
}

pub fn check_cost(cost: u32) -> Result<(), PasswordError> {
    if (MIN_COST..=MAX_COST).contains(&cost) {
        Ok(())
    } else {
        Err(PasswordError::InvalidCost(cost))
    }
}

/// Hashes a password with bcrypt at `cost` and returns the `$2b$` string.
pub fn hash_password(password: &[u8], cost: u32) -> Result<String, PasswordError> {
    Hasher::bcrypt(cost).hash(password)
}

/// Verifies a plaintext password against a bcrypt or Argon2id hash.
/// Returns `Ok(false)` on a mismatch and an error when the hash itself is unusable.
pub fn verify_password(password: &[u8], stored_hash: &str) -> Result<bool, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }

    match format::parse(stored_hash)? {
        HashInfo::Bcrypt(info) => {
            if password.len() > MAX_BCRYPT_PASSWORD_LEN {
                return Err(PasswordError::PasswordTooLong(password.len()));
            }
            debug!(cost = info.cost, version = %info.version, "verifying bcrypt hash");
            Ok(bcrypt::verify(password, stored_hash)?)
        }
        HashInfo::Argon2id(info) => {
            // Stored parameters drive the work done, so bound them first.
            Argon2Params::from(&info).validate()?;
            debug!(
                memory_kib = info.memory_kib,
                time_cost = info.time_cost,
                parallelism = info.parallelism,
                "verifying argon2id hash"
            );
            let parsed = PasswordHash::new(stored_hash)
                .map_err(|e| PasswordError::Argon2(format!("{e}")))?;
            match Argon2::default().verify_password(password, &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(PasswordError::Argon2(format!("{e}"))),
            }
        }
    }
}
