use thiserror::Error;

/// Error type for the import library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when no account exists for an email address.
    #[error(r#"no account found for "{0}""#)]
    NoAccount(String),

    /// Error generated when a master password does not match the
    /// stored password hash.
    #[error("master password does not match stored hash")]
    PasswordVerification,

    /// Error generated when a candidate archive line is not a
    /// well-formed record.
    #[error("malformed archive record on line {line}")]
    ParseRecord {
        /// One-based line number in the archive.
        line: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Error generated when an item kind is not in the mapping table.
    #[error(r#"unsupported item kind "{kind}" for item "{title}""#)]
    UnsupportedKind {
        /// Kind discriminator from the source record.
        kind: String,
        /// Title of the offending item.
        title: String,
    },

    /// Error generated when a cipher kind identifier is not known.
    #[error("invalid cipher kind identifier {0}")]
    InvalidCipherKind(i64),

    /// Error generated when ciphertext is not in the expected
    /// text encoding.
    #[error("invalid ciphertext encoding")]
    InvalidCipherText,

    /// Error generated by input/output.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error generated parsing or serializing JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error generated by the database client.
    #[error(transparent)]
    Database(#[from] async_sqlite::Error),

    /// Error generated running database migrations.
    #[error(transparent)]
    Migration(#[from] refinery::Error),

    /// Error generated by AES-GCM encryption or decryption.
    #[error(transparent)]
    AesGcm(#[from] aes_gcm::Error),

    /// Error generated hashing or parsing password hashes.
    #[error(transparent)]
    PasswordHash(#[from] argon2::password_hash::Error),

    /// Error generated converting from a slice.
    #[error(transparent)]
    TryFromSlice(#[from] std::array::TryFromSliceError),

    /// Error generated converting a timestamp.
    #[error(transparent)]
    Time(#[from] time::error::ComponentRange),

    /// Error generated formatting a date and time.
    #[error(transparent)]
    TimeFormat(#[from] time::error::Format),

    /// Error generated parsing an identifier.
    #[error(transparent)]
    Uuid(#[from] uuid::Error),

    /// Error generated reading terminal input.
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
}
