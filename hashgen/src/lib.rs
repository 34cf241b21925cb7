//! Salted password hash generation. `crypto` holds the hashing logic as plain
//! functions so it can be tested without the CLI; `input` and `config` cover
//! everything the binary needs to acquire a password and its settings.

pub mod config;
pub mod crypto;
pub mod error;
pub mod input;

pub use crypto::passwords::{hash_password, verify_password, Hasher};
