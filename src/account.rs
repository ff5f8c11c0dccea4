//! Destination account lookup and master password verification.
use crate::{
    crypto::{self, DerivedPrivateKey},
    AccountId, Result,
};
use secrecy::{ExposeSecret, SecretString};

/// Destination account for an import.
pub struct AccountRecord {
    /// Account identifier.
    pub account_id: AccountId,
    /// Email address for the account.
    pub email: String,
    /// Salt used for key derivation.
    pub(crate) salt: String,
    /// PHC string for the master password.
    pub(crate) password_hash: String,
}

impl AccountRecord {
    /// Create a new account with a generated identifier, key
    /// derivation salt and master password hash.
    pub fn new(
        email: impl Into<String>,
        password: &SecretString,
    ) -> Result<Self> {
        Ok(Self {
            account_id: AccountId::new_v4(),
            email: email.into(),
            salt: crypto::generate_salt().to_string(),
            password_hash: crypto::hash_password(
                password.expose_secret(),
            )?,
        })
    }

    /// Verify a candidate master password.
    ///
    /// When the password matches the stored hash the private key for
    /// field encryption is derived from the password and the account
    /// salt; otherwise password verification fails.
    pub fn verify(
        &self,
        password: &SecretString,
    ) -> Result<DerivedPrivateKey> {
        crypto::verify_password(
            password.expose_secret(),
            &self.password_hash,
        )?;
        let salt = crypto::parse_salt(&self.salt)?;
        crypto::derive_private_key(password.expose_secret(), &salt)
    }
}
