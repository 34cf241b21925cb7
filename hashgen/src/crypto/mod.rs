//! Password hashing primitives. Salt generation, hashing, and hash-string
//! parsing live in separate submodules so each stays small and auditable.

pub mod format;
pub mod passwords;
pub mod salt;
