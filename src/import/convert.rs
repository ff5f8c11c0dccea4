//! Map archive records to cipher records using a fixed dispatch table.
use crate::{
    cipher::{is_blank, CipherData, CipherKind, CipherRecord, FieldValue},
    import::pif::{value_text, PifRecord},
    AccountId, Error, Result,
};
use indexmap::IndexMap;
use time::OffsetDateTime;

/// Placeholder title for records with a blank title.
pub const UNTITLED: &str = "--";

/// Outcome of mapping a single archive record.
pub enum MapOutcome {
    /// Record was converted to a cipher record.
    Cipher(CipherRecord),
    /// Record is of a kind that is intentionally not converted.
    Skipped,
}

type ExtractFn = fn(&PifRecord, &mut CipherData);

enum Mapping {
    Convert { kind: CipherKind, extract: ExtractFn },
    Skip,
}

/// Dispatch table from source item kind to extraction rule.
const MAPPINGS: &[(&str, Mapping)] = &[
    (
        "passwords.Password",
        Mapping::Convert {
            kind: CipherKind::Login,
            extract: extract_location,
        },
    ),
    (
        "webforms.WebForm",
        Mapping::Convert {
            kind: CipherKind::Login,
            extract: extract_location,
        },
    ),
    (
        "securenotes.SecureNote",
        Mapping::Convert {
            kind: CipherKind::Note,
            extract: extract_secure_note,
        },
    ),
    (
        "wallet.computer.Router",
        Mapping::Convert {
            kind: CipherKind::Login,
            extract: extract_router,
        },
    ),
    (
        "wallet.financial.CreditCard",
        Mapping::Convert {
            kind: CipherKind::Card,
            extract: extract_credit_card,
        },
    ),
    ("identities.Identity", Mapping::Skip),
    ("system.folder.Regular", Mapping::Skip),
    ("wallet.computer.License", Mapping::Skip),
];

/// Map an archive record to a cipher record owned by an account.
///
/// Kinds in the skip set yield [MapOutcome::Skipped]; a kind absent
/// from the dispatch table is a fatal error that aborts the run.
pub fn map_record(
    record: &PifRecord,
    account_id: &AccountId,
) -> Result<MapOutcome> {
    let mapping = MAPPINGS
        .iter()
        .find(|(name, _)| *name == record.type_name)
        .map(|(_, mapping)| mapping)
        .ok_or_else(|| Error::UnsupportedKind {
            kind: record.type_name.clone(),
            title: record.title.clone(),
        })?;

    let Mapping::Convert { kind, extract } = mapping else {
        return Ok(MapOutcome::Skipped);
    };

    let mut cipher = CipherRecord::new(*account_id, *kind);
    cipher.favorite = record.is_favorite();
    if let Some(created) = record.created_at {
        cipher.created_at = OffsetDateTime::from_unix_timestamp(created)?;
    }
    if let Some(updated) = record.updated_at {
        cipher.updated_at = OffsetDateTime::from_unix_timestamp(updated)?;
    }

    let mut data = CipherData::new();
    let title = if is_blank(&record.title) {
        UNTITLED
    } else {
        &record.title
    };
    data.insert_text("Name", title);

    extract(record, &mut data);
    apply_secure_contents(record, *kind, &mut data);

    cipher.data = data;
    Ok(MapOutcome::Cipher(cipher))
}

fn extract_location(record: &PifRecord, data: &mut CipherData) {
    if let Some(location) = &record.location {
        data.insert_text("Uri", location);
    }
}

fn extract_secure_note(_record: &PifRecord, data: &mut CipherData) {
    let mut note = IndexMap::new();
    note.insert("Type".to_owned(), "0".to_owned());
    data.insert("SecureNote", FieldValue::Map(note));
}

fn extract_router(record: &PifRecord, data: &mut CipherData) {
    if let Some(password) = &record.secure_contents.wireless_password {
        data.insert_text("Password", password);
    }
}

fn extract_credit_card(record: &PifRecord, data: &mut CipherData) {
    let contents = &record.secure_contents;

    let cardholder = contents
        .cardholder
        .as_deref()
        .filter(|value| !is_blank(value));
    if let Some(cardholder) = cardholder {
        data.insert_text("CardholderName", cardholder);
        // the brand rides along with the cardholder name
        if let Some(brand) = &contents.card_type {
            data.insert_text("Brand", brand);
        }
    }
    if let Some(number) = contents.ccnum.as_ref().and_then(value_text) {
        data.insert_text("Number", number);
    }
    if let Some(month) = contents.expiry_mm.as_ref().and_then(value_text) {
        data.insert_text("expMonth", month);
    }
    if let Some(year) = contents.expiry_yy.as_ref().and_then(value_text) {
        data.insert_text("expYear", year);
    }
    if let Some(code) = contents.cvv.as_ref().and_then(value_text) {
        data.insert_text("Code", code);
    }
}

/// Apply the cross-cutting secure contents rules after kind-specific
/// extraction.
///
/// `Username` and `Password` use first-seen-wins semantics; a later
/// field entry never overwrites an already-set value. Fields with no
/// special designation accumulate in the `Fields` sub-map.
fn apply_secure_contents(
    record: &PifRecord,
    kind: CipherKind,
    data: &mut CipherData,
) {
    let contents = &record.secure_contents;

    if let Some(notes) = &contents.notes_plain {
        data.insert_text("Notes", notes);
    }
    if !data.contains("Password") {
        if let Some(password) = &contents.password {
            data.insert_text("Password", password);
        }
    }

    let mut extra = IndexMap::new();
    for field in &contents.fields {
        let value = field
            .value
            .as_ref()
            .and_then(value_text)
            .filter(|value| !is_blank(value));
        match field.designation.as_deref() {
            Some("username") => {
                if kind == CipherKind::Login && !data.contains("Username") {
                    if let Some(value) = value {
                        data.insert_text("Username", value);
                    }
                }
            }
            Some("password") => {
                if kind == CipherKind::Login && !data.contains("Password") {
                    if let Some(value) = value {
                        data.insert_text("Password", value);
                    }
                }
            }
            _ => {
                let name =
                    field.name.as_deref().filter(|name| !is_blank(name));
                if let (Some(name), Some(value)) = (name, value) {
                    extra.insert(name.to_owned(), value);
                }
            }
        }
    }
    if !extra.is_empty() {
        data.insert("Fields", FieldValue::Map(extra));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::FieldValue;
    use anyhow::Result;
    use serde_json::json;
    use uuid::Uuid;

    fn mock_record(value: serde_json::Value) -> Result<PifRecord> {
        Ok(serde_json::from_value(value)?)
    }

    fn text(data: &CipherData, name: &str) -> Option<String> {
        match data.get(name) {
            Some(FieldValue::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn convert(value: serde_json::Value) -> Result<CipherRecord> {
        let record = mock_record(value)?;
        match map_record(&record, &Uuid::new_v4())? {
            MapOutcome::Cipher(cipher) => Ok(cipher),
            MapOutcome::Skipped => panic!("expected a cipher record"),
        }
    }

    #[test]
    fn password_record() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "passwords.Password",
            "title": "Example",
            "location": "https://example.com",
            "secureContents": {
                "password": "p@ss",
                "fields": [
                    {"designation": "username", "value": "alice"}
                ]
            }
        }))?;

        assert_eq!(CipherKind::Login, cipher.kind);
        assert_eq!(Some("Example".to_owned()), text(&cipher.data, "Name"));
        assert_eq!(
            Some("https://example.com".to_owned()),
            text(&cipher.data, "Uri")
        );
        assert_eq!(Some("alice".to_owned()), text(&cipher.data, "Username"));
        assert_eq!(Some("p@ss".to_owned()), text(&cipher.data, "Password"));
        Ok(())
    }

    #[test]
    fn secure_note_record() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "securenotes.SecureNote",
            "title": "Note",
            "secureContents": {"notesPlain": "the note text"}
        }))?;

        assert_eq!(CipherKind::Note, cipher.kind);
        assert_eq!(
            Some("the note text".to_owned()),
            text(&cipher.data, "Notes")
        );
        let Some(FieldValue::Map(note)) = cipher.data.get("SecureNote")
        else {
            panic!("expected a SecureNote sub-map");
        };
        assert_eq!(Some(&"0".to_owned()), note.get("Type"));
        Ok(())
    }

    #[test]
    fn router_wireless_password_wins() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "wallet.computer.Router",
            "title": "Home Router",
            "secureContents": {
                "wireless_password": "wifi-secret",
                "password": "admin-secret"
            }
        }))?;

        assert_eq!(CipherKind::Login, cipher.kind);
        assert_eq!(
            Some("wifi-secret".to_owned()),
            text(&cipher.data, "Password")
        );
        Ok(())
    }

    #[test]
    fn credit_card_record() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "wallet.financial.CreditCard",
            "title": "Visa",
            "secureContents": {
                "cardholder": "Alice Example",
                "type": "visa",
                "ccnum": "4111111111111111",
                "expiry_mm": 4,
                "expiry_yy": 2030,
                "cvv": "123"
            }
        }))?;

        assert_eq!(CipherKind::Card, cipher.kind);
        assert_eq!(
            Some("Alice Example".to_owned()),
            text(&cipher.data, "CardholderName")
        );
        assert_eq!(Some("visa".to_owned()), text(&cipher.data, "Brand"));
        assert_eq!(
            Some("4111111111111111".to_owned()),
            text(&cipher.data, "Number")
        );
        assert_eq!(Some("4".to_owned()), text(&cipher.data, "expMonth"));
        assert_eq!(Some("2030".to_owned()), text(&cipher.data, "expYear"));
        assert_eq!(Some("123".to_owned()), text(&cipher.data, "Code"));
        Ok(())
    }

    #[test]
    fn credit_card_numeric_fields() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "wallet.financial.CreditCard",
            "title": "Visa",
            "secureContents": {
                "ccnum": 4111111111111111i64,
                "cvv": 123
            }
        }))?;

        assert_eq!(
            Some("4111111111111111".to_owned()),
            text(&cipher.data, "Number")
        );
        assert_eq!(Some("123".to_owned()), text(&cipher.data, "Code"));
        Ok(())
    }

    #[test]
    fn credit_card_brand_requires_cardholder() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "wallet.financial.CreditCard",
            "title": "Visa",
            "secureContents": {
                "type": "visa",
                "ccnum": "4111111111111111"
            }
        }))?;

        assert!(!cipher.data.contains("Brand"));
        assert!(!cipher.data.contains("CardholderName"));
        assert!(cipher.data.contains("Number"));
        Ok(())
    }

    #[test]
    fn blank_title_placeholder() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "passwords.Password",
            "title": "  "
        }))?;
        assert_eq!(Some(UNTITLED.to_owned()), text(&cipher.data, "Name"));

        let cipher = convert(json!({
            "typeName": "passwords.Password",
            "title": null
        }))?;
        assert_eq!(Some(UNTITLED.to_owned()), text(&cipher.data, "Name"));
        Ok(())
    }

    #[test]
    fn first_username_wins() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "webforms.WebForm",
            "title": "Form",
            "secureContents": {
                "fields": [
                    {"designation": "username", "value": ""},
                    {"designation": "username", "value": "alice"},
                    {"designation": "username", "value": "bob"}
                ]
            }
        }))?;
        assert_eq!(Some("alice".to_owned()), text(&cipher.data, "Username"));
        Ok(())
    }

    #[test]
    fn catch_all_fields() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "webforms.WebForm",
            "title": "Form",
            "secureContents": {
                "fields": [
                    {"name": "pin", "value": "1234"},
                    {"name": "", "value": "dropped"},
                    {"name": "empty", "value": ""}
                ]
            }
        }))?;

        let Some(FieldValue::Map(extra)) = cipher.data.get("Fields") else {
            panic!("expected a Fields sub-map");
        };
        assert_eq!(1, extra.len());
        assert_eq!(Some(&"1234".to_owned()), extra.get("pin"));
        Ok(())
    }

    #[test]
    fn no_empty_fields_sub_map() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "passwords.Password",
            "title": "Example",
            "secureContents": {"fields": []}
        }))?;
        assert!(!cipher.data.contains("Fields"));
        Ok(())
    }

    #[test]
    fn skip_listed_kinds() -> Result<()> {
        for kind in [
            "identities.Identity",
            "system.folder.Regular",
            "wallet.computer.License",
        ] {
            let record = mock_record(json!({
                "typeName": kind,
                "title": "Skipped"
            }))?;
            assert!(matches!(
                map_record(&record, &Uuid::new_v4())?,
                MapOutcome::Skipped
            ));
        }
        Ok(())
    }

    #[test]
    fn unknown_kind_is_fatal() -> Result<()> {
        let record = mock_record(json!({
            "typeName": "bogus.Unknown",
            "title": "Mystery"
        }))?;
        let result = map_record(&record, &Uuid::new_v4());
        match result {
            Err(crate::Error::UnsupportedKind { kind, title }) => {
                assert_eq!("bogus.Unknown", kind);
                assert_eq!("Mystery", title);
            }
            _ => panic!("expected an unsupported kind error"),
        }
        Ok(())
    }

    #[test]
    fn timestamps_from_epoch_seconds() -> Result<()> {
        let cipher = convert(json!({
            "typeName": "passwords.Password",
            "title": "Example",
            "createdAt": 1199145600,
            "updatedAt": 1230768000
        }))?;
        assert_eq!(1199145600, cipher.created_at.unix_timestamp());
        assert_eq!(1230768000, cipher.updated_at.unix_timestamp());
        Ok(())
    }
}
