//! Convert a 1Password 1PIF export into the cipher records of an
//! encrypted vault database.
//!
//! Every sensitive field is encrypted with a key derived from the
//! destination account's master password and the converted records
//! are committed in a single atomic transaction; a run either imports
//! the whole archive or nothing at all.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod account;
pub mod cipher;
pub mod crypto;
pub mod db;
mod error;
pub mod import;
pub mod migrate;
pub mod readline;

pub use error::Error;

/// Result type for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifier for a destination account.
pub type AccountId = uuid::Uuid;
