//! CLI entry point. Hashing lives in the library; this file only acquires the
//! password and settings, calls into it, and prints the result.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use hashgen::config::{Overrides, Settings};
use hashgen::crypto::format;
use hashgen::crypto::passwords::{verify_password, BcryptVersion, Scheme};
use hashgen::error::{AppError, EXIT_MISMATCH};
use hashgen::input::{read_password, PasswordRequest};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate and check salted password hashes", long_about = None)]
struct Cli {
    #[arg(long, global = true, env = "HASHGEN_CONFIG", help = "Path to a JSON settings file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "HASHGEN_LOG",
        default_value = "warn",
        help = "Log filter for stderr output (e.g. debug, info)"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash a password (the default when no command is given)
    Hash(HashArgs),
    /// Check a password against an existing hash
    Verify(VerifyArgs),
    /// Print the parsed structure of a hash
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Default)]
struct HashArgs {
    #[arg(help = "Password to hash; prefer the prompt, HASHGEN_PASSWORD or --password-stdin")]
    password: Option<OsString>,

    #[arg(long, help = "Read the password from the first line of stdin")]
    password_stdin: bool,

    #[arg(long, value_enum, help = "Hashing scheme [default: bcrypt]")]
    scheme: Option<Scheme>,

    #[arg(short, long, help = "bcrypt cost, 4..=31 [default: 12]")]
    cost: Option<u32>,

    #[arg(long, value_enum, help = "bcrypt version prefix [default: 2b]")]
    bcrypt_version: Option<BcryptVersion>,

    #[arg(long, help = "Print only the hash, without the label line")]
    raw: bool,

    #[arg(long, help = "Do not ask for the password twice at the prompt")]
    no_confirm: bool,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(help = "Hash to check against")]
    hash: String,

    #[arg(help = "Password to check; prefer the prompt, HASHGEN_PASSWORD or --password-stdin")]
    password: Option<OsString>,

    #[arg(long, help = "Read the password from the first line of stdin")]
    password_stdin: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[arg(help = "Hash to describe")]
    hash: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode, AppError> {
    match cli.command.unwrap_or_else(|| Command::Hash(HashArgs::default())) {
        Command::Hash(args) => {
            let env = Overrides::from_env()?;
            let flags = Overrides {
                scheme: args.scheme,
                cost: args.cost,
                bcrypt_version: args.bcrypt_version,
            };
            let settings = Settings::load(cli.config.as_deref())?
                .apply(&env)
                .apply(&flags);
            settings.validate()?;
            if settings.scheme == Scheme::Argon2id {
                warn_bcrypt_only("environment", &env);
                warn_bcrypt_only("command line", &flags);
            }
            hash(&settings, args)
        }
        Command::Verify(args) => verify(args),
        Command::Inspect(args) => inspect(&args.hash),
    }
}

fn warn_bcrypt_only(source: &str, overrides: &Overrides) {
    for field in overrides.bcrypt_only_fields() {
        warn!(source, field, "bcrypt-only setting is ignored for argon2id");
    }
}

fn hash(settings: &Settings, args: HashArgs) -> Result<ExitCode, AppError> {
    let hasher = settings.hasher();
    match hasher.scheme() {
        Scheme::Bcrypt => {
            info!(scheme = %hasher.scheme(), cost = hasher.cost(), "generating hash");
        }
        Scheme::Argon2id => {
            let params = hasher.argon2_params();
            info!(
                scheme = %hasher.scheme(),
                memory_kib = params.memory_kib,
                time_cost = params.time_cost,
                parallelism = params.parallelism,
                "generating hash"
            );
        }
    }

    let password = read_password(PasswordRequest {
        argument: args.password,
        from_stdin: args.password_stdin,
        confirm: !args.no_confirm,
    })?;
    let hash = hasher.hash(password.as_bytes())?;

    let mut stdout = io::stdout().lock();
    if !args.raw {
        writeln!(stdout, "{}", hasher.scheme().label())?;
    }
    writeln!(stdout, "{hash}")?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn verify(args: VerifyArgs) -> Result<ExitCode, AppError> {
    let password = read_password(PasswordRequest {
        argument: args.password,
        from_stdin: args.password_stdin,
        confirm: false,
    })?;
    let matches = verify_password(password.as_bytes(), args.hash.trim())?;
    debug!(matches, "verification finished");

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", if matches { "match" } else { "no-match" })?;
    stdout.flush()?;
    Ok(if matches {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_MISMATCH)
    })
}

fn inspect(hash: &str) -> Result<ExitCode, AppError> {
    let info = format::parse(hash.trim())?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{info}")?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_hash() {
        let cli = Cli::try_parse_from(["hashgen"]).expect("bare invocation is valid");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_hash_flags() {
        let cli = Cli::try_parse_from([
            "hashgen",
            "hash",
            "--cost",
            "10",
            "--scheme",
            "argon2id",
            "--bcrypt-version",
            "2y",
            "--raw",
        ])
        .expect("flags should parse");
        match cli.command {
            Some(Command::Hash(args)) => {
                assert_eq!(args.cost, Some(10));
                assert_eq!(args.scheme, Some(hashgen::crypto::passwords::Scheme::Argon2id));
                assert_eq!(
                    args.bcrypt_version,
                    Some(hashgen::crypto::passwords::BcryptVersion::V2y)
                );
                assert!(args.raw);
            }
            other => panic!("expected hash command, got {other:?}"),
        }
    }

    #[test]
    fn legacy_2x_is_not_an_output_choice() {
        let err = Cli::try_parse_from(["hashgen", "hash", "--bcrypt-version", "2x"])
            .expect_err("2x is verify-only");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
