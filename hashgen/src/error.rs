//! Application-level error that combines input, hashing, format, and
//! configuration failures, plus the exit codes the binary reports.

use std::io;
use std::process::ExitCode;

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::format::FormatError;
use crate::crypto::passwords::PasswordError;
use crate::input::InputError;

/// `verify` ran fine but the password did not match.
pub const EXIT_MISMATCH: u8 = 1;
/// Anything went wrong; the message is on stderr.
pub const EXIT_FAILURE: u8 = 2;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(EXIT_FAILURE)
    }
}
