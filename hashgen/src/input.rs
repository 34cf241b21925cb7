//! Password acquisition. The password never lives in source: it comes from an
//! argument, stdin, the `HASHGEN_PASSWORD` environment variable, or a hidden
//! terminal prompt, in that order.

use std::ffi::OsString;
use std::io::{self, BufRead};

use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "HASHGEN_PASSWORD";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("password is not valid UTF-8 text")]
    Encoding,
    #[error("password must not be empty")]
    Empty,
    #[error("passwords did not match")]
    ConfirmationMismatch,
    #[error("failed to read password: {0}")]
    Io(#[from] io::Error),
}

/// Where the operator asked us to take the password from.
#[derive(Debug, Default)]
pub struct PasswordRequest {
    pub argument: Option<OsString>,
    pub from_stdin: bool,
    /// Ask twice at the interactive prompt.
    pub confirm: bool,
}

/// Reads the password from the process environment and terminal.
pub fn read_password(request: PasswordRequest) -> Result<Zeroizing<String>, InputError> {
    let stdin = io::stdin();
    read_password_from(request, std::env::var_os(PASSWORD_ENV), &mut stdin.lock())
}

pub(crate) fn read_password_from<R: BufRead>(
    request: PasswordRequest,
    env_value: Option<OsString>,
    stdin: &mut R,
) -> Result<Zeroizing<String>, InputError> {
    let password = if let Some(argument) = request.argument {
        warn!("password given on the command line is visible to other local users");
        into_text(argument)?
    } else if request.from_stdin {
        debug!("reading password from stdin");
        read_line(stdin)?
    } else if let Some(value) = env_value {
        debug!(variable = PASSWORD_ENV, "reading password from environment");
        into_text(value)?
    } else {
        prompt(request.confirm)?
    };

    if password.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(password)
}

fn into_text(value: OsString) -> Result<Zeroizing<String>, InputError> {
    value
        .into_string()
        .map(Zeroizing::new)
        .map_err(|_| InputError::Encoding)
}

/// Reads one line and strips the trailing `\n` or `\r\n`.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Zeroizing<String>, InputError> {
    let mut raw = Zeroizing::new(Vec::new());
    reader.read_until(b'\n', &mut raw)?;
    if raw.last() == Some(&b'\n') {
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
    }
    let text = std::str::from_utf8(&raw).map_err(|_| InputError::Encoding)?;
    Ok(Zeroizing::new(text.to_owned()))
}

fn prompt(confirm: bool) -> Result<Zeroizing<String>, InputError> {
    let first = Zeroizing::new(
        rpassword::prompt_password("Password: ").map_err(prompt_error)?,
    );
    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ").map_err(prompt_error)?,
        );
        if *first != *second {
            return Err(InputError::ConfirmationMismatch);
        }
    }
    Ok(first)
}

fn prompt_error(err: io::Error) -> InputError {
    if err.kind() == io::ErrorKind::InvalidData {
        InputError::Encoding
    } else {
        InputError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{read_password_from, InputError, PasswordRequest};
    use std::ffi::OsString;
    use std::io::Cursor;

    fn stdin_request() -> PasswordRequest {
        PasswordRequest {
            from_stdin: true,
            ..PasswordRequest::default()
        }
    }

    #[test]
    fn argument_wins_over_everything() {
        let request = PasswordRequest {
            argument: Some(OsString::from("from-arg")),
            from_stdin: true,
            confirm: true,
        };
        let mut stdin = Cursor::new("from-stdin\n");
        let password = read_password_from(request, Some("from-env".into()), &mut stdin)
            .expect("argument should be used");
        assert_eq!(password.as_str(), "from-arg");
    }

    #[test]
    fn stdin_line_is_trimmed_of_its_newline_only() {
        let mut stdin = Cursor::new(" adminuser \r\nrest");
        let password =
            read_password_from(stdin_request(), None, &mut stdin).expect("stdin should be read");
        assert_eq!(password.as_str(), " adminuser ");
    }

    #[test]
    fn stdin_without_trailing_newline() {
        let mut stdin = Cursor::new("adminuser");
        let password =
            read_password_from(stdin_request(), None, &mut stdin).expect("stdin should be read");
        assert_eq!(password.as_str(), "adminuser");
    }

    #[test]
    fn environment_is_used_when_no_flag_given() {
        let password = read_password_from(
            PasswordRequest::default(),
            Some(OsString::from("adminuser")),
            &mut Cursor::new(""),
        )
        .expect("env should be used");
        assert_eq!(password.as_str(), "adminuser");
    }

    #[test]
    fn empty_password_is_rejected() {
        let err = read_password_from(stdin_request(), None, &mut Cursor::new("\n"))
            .expect_err("empty must fail");
        assert!(matches!(err, InputError::Empty));
    }

    #[test]
    fn invalid_utf8_on_stdin_is_an_encoding_error() {
        let bytes: &[u8] = &[0x61, 0xff, 0xfe, b'\n'];
        let err = read_password_from(stdin_request(), None, &mut Cursor::new(bytes))
            .expect_err("must fail");
        assert!(matches!(err, InputError::Encoding));
    }

    #[cfg(unix)]
    #[test]
    fn invalid_utf8_argument_is_an_encoding_error() {
        use std::os::unix::ffi::OsStringExt;

        let request = PasswordRequest {
            argument: Some(OsString::from_vec(vec![0x61, 0x80])),
            ..PasswordRequest::default()
        };
        let err = read_password_from(request, None, &mut Cursor::new(""))
            .expect_err("must fail");
        assert!(matches!(err, InputError::Encoding));
    }
}
