//! Settings for the hash generator. Values are layered: built-in defaults, an
//! optional JSON file, `HASHGEN_*` environment variables, then CLI flags.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::passwords::{
    check_cost, Argon2Params, BcryptVersion, Hasher, Scheme, DEFAULT_COST, MAX_COST, MIN_COST,
};

pub const SCHEME_ENV: &str = "HASHGEN_SCHEME";
pub const COST_ENV: &str = "HASHGEN_COST";
pub const BCRYPT_VERSION_ENV: &str = "HASHGEN_BCRYPT_VERSION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
    #[error("bcrypt cost {0} is outside {min}..={max}", min = MIN_COST, max = MAX_COST)]
    InvalidCost(u32),
    #[error("invalid argon2 parameters: {0}")]
    InvalidArgon2(String),
}

/// Effective settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub scheme: Scheme,
    /// bcrypt work factor (log2 of the round count).
    pub cost: u32,
    pub bcrypt_version: BcryptVersion,
    pub argon2: Argon2Params,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            cost: DEFAULT_COST,
            bcrypt_version: BcryptVersion::default(),
            argon2: Argon2Params::default(),
        }
    }
}

/// Optional per-field replacements applied on top of lower layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub scheme: Option<Scheme>,
    pub cost: Option<u32>,
    pub bcrypt_version: Option<BcryptVersion>,
}

impl Overrides {
    /// Reads the `HASHGEN_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        Ok(Self {
            scheme: env_value(&lookup, SCHEME_ENV)?,
            cost: env_value(&lookup, COST_ENV)?,
            bcrypt_version: env_value(&lookup, BCRYPT_VERSION_ENV)?,
        })
    }

    /// Names of the set fields that only apply to bcrypt.
    pub fn bcrypt_only_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.cost.is_some() {
            fields.push("cost");
        }
        if self.bcrypt_version.is_some() {
            fields.push("bcrypt_version");
        }
        fields
    }
}

fn env_value<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<OsString>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let text = raw.into_string().map_err(|_| ConfigError::InvalidEnv {
        name,
        reason: "not valid UTF-8".to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    text.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            name,
            reason: e.to_string(),
        })
}

impl Settings {
    /// Loads settings from `path` when given, otherwise starts from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading settings file");
        let raw_json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw_json)?)
    }

    /// Replaces every field that `overrides` sets.
    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(scheme) = overrides.scheme {
            self.scheme = scheme;
        }
        if let Some(cost) = overrides.cost {
            self.cost = cost;
        }
        if let Some(version) = overrides.bcrypt_version {
            self.bcrypt_version = version;
        }
        self
    }

    /// Checks every parameter, including those of the scheme not selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_cost(self.cost).map_err(|_| ConfigError::InvalidCost(self.cost))?;
        self.argon2
            .validate()
            .map_err(|e| ConfigError::InvalidArgon2(format!("{e}")))
    }

    pub fn hasher(&self) -> Hasher {
        match self.scheme {
            Scheme::Bcrypt => Hasher::bcrypt(self.cost).with_version(self.bcrypt_version),
            Scheme::Argon2id => Hasher::argon2id(self.argon2),
        }
    }
}
