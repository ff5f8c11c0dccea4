//! Target data model for converted vault cipher records.
use crate::{AccountId, Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use time::OffsetDateTime;

/// Kind discriminator for a cipher record.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd,
)]
pub enum CipherKind {
    /// Login credentials.
    Login = 1,
    /// Secure note.
    Note = 2,
    /// Credit card.
    Card = 3,
}

impl CipherKind {
    /// Identifier for this kind in the database schema.
    pub fn id(&self) -> i64 {
        *self as i64
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Login => "login",
                Self::Note => "note",
                Self::Card => "card",
            }
        )
    }
}

impl TryFrom<i64> for CipherKind {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Self::Login),
            2 => Ok(Self::Note),
            3 => Ok(Self::Card),
            _ => Err(Error::InvalidCipherKind(value)),
        }
    }
}

/// Value for a named cipher field.
///
/// Field maps support one level of nesting; sub-map values are
/// always text.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text leaf value.
    Text(String),
    /// Nested sub-map of text values.
    Map(IndexMap<String, String>),
}

/// Determine if a string is blank.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Ordered map of named cipher fields.
///
/// Keys never map to blank text values; inserting a blank value is
/// a no-op.
#[derive(
    Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CipherData(IndexMap<String, FieldValue>);

impl CipherData {
    /// Create an empty field map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Insert a text field, dropping blank values.
    pub fn insert_text(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let value = value.into();
        if !is_blank(&value) {
            self.0.insert(name.into(), FieldValue::Text(value));
        }
    }

    /// Insert a field value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Determine if a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Determine if the field map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl IntoIterator for CipherData {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Converted cipher record for the destination vault.
#[derive(Debug, Clone)]
pub struct CipherRecord {
    /// Identifier of the owning account.
    pub account_id: AccountId,
    /// Kind of this cipher.
    pub kind: CipherKind,
    /// Whether the record is flagged as a favorite.
    pub favorite: bool,
    /// Created date and time.
    pub created_at: OffsetDateTime,
    /// Last modified date and time.
    pub updated_at: OffsetDateTime,
    /// Named fields for the cipher.
    pub data: CipherData,
}

impl CipherRecord {
    /// Create a new cipher record owned by an account.
    pub fn new(account_id: AccountId, kind: CipherKind) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            account_id,
            kind,
            favorite: false,
            created_at: now,
            updated_at: now,
            data: CipherData::new(),
        }
    }
}

/// Batch of converted records grouped by cipher kind.
///
/// Kinds iterate in discriminant order and records within a kind
/// preserve the source archive order. A batch is consumed exactly
/// once when it is persisted.
#[derive(Debug, Default)]
pub struct ImportBatch {
    groups: BTreeMap<CipherKind, Vec<CipherRecord>>,
}

impl ImportBatch {
    /// Add a record to the group for its kind.
    pub fn insert(&mut self, record: CipherRecord) {
        self.groups.entry(record.kind).or_default().push(record);
    }

    /// Total number of records in the batch.
    pub fn len(&self) -> usize {
        self.groups.values().map(|records| records.len()).sum()
    }

    /// Determine if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records for each kind present in the batch.
    pub fn counts(&self) -> Vec<(CipherKind, usize)> {
        self.groups
            .iter()
            .map(|(kind, records)| (*kind, records.len()))
            .collect()
    }

    /// Iterate the groups in kind order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&CipherKind, &Vec<CipherRecord>)> {
        self.groups.iter()
    }

    /// Consume the batch into its groups.
    pub fn into_groups(self) -> BTreeMap<CipherKind, Vec<CipherRecord>> {
        self.groups
    }
}
