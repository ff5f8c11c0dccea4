//! Key derivation and symmetric encryption for cipher fields.
use crate::{Error, Result};
use aes_gcm::{aead::Aead, Aes256Gcm, Key, KeyInit, Nonce as AesNonce};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, CryptoRng, Rng};
use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

/// Exposes the default cryptographically secure RNG.
pub fn csprng() -> impl CryptoRng + Rng {
    OsRng
}

/// Encapsulates the bytes for a derived symmetric secret key.
pub struct DerivedPrivateKey {
    inner: SecretBox<Vec<u8>>,
}

impl DerivedPrivateKey {
    /// Create a new random 32-byte secret key.
    #[cfg(test)]
    pub(crate) fn generate() -> Self {
        let bytes: [u8; 32] = csprng().gen();
        Self {
            inner: SecretBox::new(Box::new(bytes.to_vec())),
        }
    }

    fn new(inner: Vec<u8>) -> Self {
        Self {
            inner: SecretBox::new(Box::new(inner)),
        }
    }
}

impl AsRef<[u8]> for DerivedPrivateKey {
    fn as_ref(&self) -> &[u8] {
        self.inner.expose_secret()
    }
}

/// Generate a new salt string for key derivation.
pub fn generate_salt() -> SaltString {
    SaltString::generate(&mut csprng())
}

/// Parse a saved salt string.
pub fn parse_salt<S: AsRef<str>>(salt: S) -> Result<SaltString> {
    Ok(SaltString::from_b64(salt.as_ref())?)
}

/// Derive a private key from a master password and salt.
///
/// Hashes the password using the Argon2 algorithm then converts the
/// hash to a 32 byte private key using the SHA-256 digest of the
/// PHC string.
pub fn derive_private_key<S: AsRef<str>>(
    password: S,
    salt: &SaltString,
) -> Result<DerivedPrivateKey> {
    let argon2 = Argon2::default();
    let password_hash =
        argon2.hash_password(password.as_ref().as_bytes(), salt)?;
    let hash = Sha256::digest(password_hash.to_string().as_bytes());
    Ok(DerivedPrivateKey::new(hash.as_slice().to_vec()))
}

/// Hash a master password into a PHC string for storage.
pub fn hash_password<S: AsRef<str>>(password: S) -> Result<String> {
    let salt = SaltString::generate(&mut csprng());
    let argon2 = Argon2::default();
    let password_hash =
        argon2.hash_password(password.as_ref().as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Verify a master password against a stored PHC string.
pub fn verify_password<S: AsRef<str>>(
    password: S,
    password_hash: &str,
) -> Result<()> {
    let parsed = PasswordHash::new(password_hash)?;
    Argon2::default()
        .verify_password(password.as_ref().as_bytes(), &parsed)
        .map_err(|_| Error::PasswordVerification)
}

/// Encrypted data with the nonce.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct AeadPack {
    /// Number once value.
    pub nonce: [u8; 12],
    /// Encrypted cipher text.
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for AeadPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl FromStr for AeadPack {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (nonce, ciphertext) =
            s.split_once('.').ok_or(Error::InvalidCipherText)?;
        let nonce = STANDARD
            .decode(nonce)
            .map_err(|_| Error::InvalidCipherText)?;
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|_| Error::InvalidCipherText)?;
        Ok(AeadPack {
            nonce: nonce.as_slice().try_into()?,
            ciphertext,
        })
    }
}

/// Encrypt plaintext using the key as 256 bit AES-GCM.
///
/// A random nonce is generated for every message.
pub fn encrypt(
    key: &DerivedPrivateKey,
    plaintext: &[u8],
) -> Result<AeadPack> {
    // 96 bit (12 byte) unique nonce per message
    let nonce: [u8; 12] = csprng().gen();
    let cipher_nonce = AesNonce::from_slice(&nonce);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
    let ciphertext = cipher.encrypt(cipher_nonce, plaintext)?;
    Ok(AeadPack { nonce, ciphertext })
}

/// Decrypt ciphertext using the key as 256 bit AES-GCM.
pub fn decrypt(
    key: &DerivedPrivateKey,
    aead_pack: &AeadPack,
) -> Result<Vec<u8>> {
    let cipher_nonce = AesNonce::from_slice(&aead_pack.nonce);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
    Ok(cipher.decrypt(cipher_nonce, aead_pack.ciphertext.as_ref())?)
}
