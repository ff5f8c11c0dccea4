//! Encrypt the field values of a converted cipher record.
use crate::{
    cipher::{CipherData, FieldValue},
    crypto::{self, DerivedPrivateKey},
    Result,
};
use indexmap::IndexMap;

/// Encrypt every leaf value of a field map with the given key.
///
/// Produces a new field map with an identical key structure where
/// each text value, including values one level deep in sub-maps, is
/// replaced by the text encoding of its ciphertext.
pub fn encrypt_fields(
    data: CipherData,
    key: &DerivedPrivateKey,
) -> Result<CipherData> {
    let mut encrypted = CipherData::new();
    for (name, value) in data {
        let value = match value {
            FieldValue::Text(text) => {
                FieldValue::Text(encrypt_text(&text, key)?)
            }
            FieldValue::Map(map) => {
                let mut inner = IndexMap::new();
                for (name, text) in map {
                    inner.insert(name, encrypt_text(&text, key)?);
                }
                FieldValue::Map(inner)
            }
        };
        encrypted.insert(name, value);
    }
    Ok(encrypted)
}

fn encrypt_text(text: &str, key: &DerivedPrivateKey) -> Result<String> {
    Ok(crypto::encrypt(key, text.as_bytes())?.to_string())
}
