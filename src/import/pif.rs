//! Parser for the 1Password 1PIF export format.
//!
//! A 1PIF archive is newline-delimited text; any line whose first
//! character is `{` is a self-contained JSON record and every other
//! line (separators, headers, blank lines) is ignored.
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Record for an item in a 1PIF export.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PifRecord {
    /// Kind discriminator for the item.
    pub type_name: String,
    /// Title of the item.
    ///
    /// A missing or null title is treated as blank.
    #[serde(default, deserialize_with = "text_or_empty")]
    pub title: String,
    /// Location URL for password and web form items.
    #[serde(default)]
    pub location: Option<String>,
    /// Created timestamp in epoch seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Updated timestamp in epoch seconds.
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Unencrypted contents block.
    #[serde(default)]
    pub open_contents: Option<OpenContents>,
    /// Secret contents block.
    #[serde(default)]
    pub secure_contents: SecureContents,
}

impl PifRecord {
    /// Determine if the item is flagged as a favorite.
    ///
    /// Any non-null, non-false `faveIndex` marks a favorite.
    pub fn is_favorite(&self) -> bool {
        match &self.open_contents {
            Some(contents) => match &contents.fave_index {
                Some(value) => {
                    !value.is_null() && *value != Value::Bool(false)
                }
                None => false,
            },
            None => false,
        }
    }
}

/// Unencrypted contents of an item.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenContents {
    /// Favorite ordering index.
    #[serde(default)]
    pub fave_index: Option<Value>,
}

/// Secret contents of an item.
///
/// Key names follow the 1PIF export, which mixes naming styles.
#[derive(Debug, Default, Deserialize)]
pub struct SecureContents {
    /// Plaintext notes.
    #[serde(default, rename = "notesPlain")]
    pub notes_plain: Option<String>,
    /// Primary password.
    #[serde(default)]
    pub password: Option<String>,
    /// Wireless password for router items.
    #[serde(default)]
    pub wireless_password: Option<String>,
    /// Cardholder name for credit card items.
    #[serde(default)]
    pub cardholder: Option<String>,
    /// Card brand for credit card items.
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    /// Card number for credit card items.
    #[serde(default)]
    pub ccnum: Option<Value>,
    /// Card expiry month for credit card items.
    #[serde(default)]
    pub expiry_mm: Option<Value>,
    /// Card expiry year for credit card items.
    #[serde(default)]
    pub expiry_yy: Option<Value>,
    /// Card security code for credit card items.
    #[serde(default)]
    pub cvv: Option<Value>,
    /// Saved form fields.
    #[serde(default)]
    pub fields: Vec<PifField>,
}

/// Saved form field for an item.
#[derive(Debug, Default, Deserialize)]
pub struct PifField {
    /// Name of the form field.
    #[serde(default)]
    pub name: Option<String>,
    /// Designation such as `username` or `password`.
    #[serde(default)]
    pub designation: Option<String>,
    /// Value of the form field.
    #[serde(default)]
    pub value: Option<Value>,
}

fn text_or_empty<'de, D>(
    deserializer: D,
) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Convert a JSON value to its text representation.
///
/// Strings are used verbatim, null yields nothing and other values
/// are stringified.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse records from a string of archive content.
pub fn parse_str(content: &str) -> Result<Vec<PifRecord>> {
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if !line.starts_with('{') {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| {
            Error::ParseRecord {
                line: index + 1,
                source,
            }
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Parse records from an archive file.
pub async fn parse_path(path: impl AsRef<Path>) -> Result<Vec<PifRecord>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_str(&content)
}
