use anyhow::Result;
use secrecy::SecretString;

use pif_import::{
    account::AccountRecord,
    cipher::{CipherKind, CipherRecord, FieldValue, ImportBatch},
    crypto::{self, AeadPack, DerivedPrivateKey},
    db::VaultDatabase,
    import::pif,
    migrate::{ArchiveImport, ConfirmImport, ImportOutcome, PersistBatch},
};

const ARCHIVE: &str = "fixtures/export.1pif";

struct Accept;
impl ConfirmImport for Accept {
    fn confirm(&self, _summary: &str) -> pif_import::Result<bool> {
        Ok(true)
    }
}

struct Reject;
impl ConfirmImport for Reject {
    fn confirm(&self, _summary: &str) -> pif_import::Result<bool> {
        Ok(false)
    }
}

async fn mock_account(
    db: &VaultDatabase,
) -> Result<(AccountRecord, DerivedPrivateKey)> {
    let password = SecretString::from("mock password".to_owned());
    let account = AccountRecord::new("user@example.com", &password)?;
    db.insert_account(&account).await?;
    let key = account.verify(&password)?;
    Ok((account, key))
}

fn decrypt_text(text: &str, key: &DerivedPrivateKey) -> Result<String> {
    let aead: AeadPack = text.parse()?;
    Ok(String::from_utf8(crypto::decrypt(key, &aead)?)?)
}

#[tokio::test]
async fn end_to_end_import() -> Result<()> {
    let db = VaultDatabase::open_memory().await?;
    let (account, key) = mock_account(&db).await?;

    let records = pif::parse_path(ARCHIVE).await?;
    assert_eq!(8, records.len());

    let import =
        ArchiveImport::new(account.account_id, key, Accept, &db);
    let outcome = import.run(records).await?;
    assert_eq!(ImportOutcome::Imported(5), outcome);

    let rows = db.list_ciphers(&account.account_id).await?;
    assert_eq!(5, rows.len());

    // rows are persisted in kind order
    let kinds = rows
        .iter()
        .map(|row| row.cipher_kind())
        .collect::<pif_import::Result<Vec<_>>>()?;
    assert_eq!(
        vec![
            CipherKind::Login,
            CipherKind::Login,
            CipherKind::Login,
            CipherKind::Note,
            CipherKind::Card,
        ],
        kinds
    );

    assert_eq!(1, rows.iter().filter(|row| row.favorite).count());
    Ok(())
}

#[tokio::test]
async fn persisted_fields_are_decryptable() -> Result<()> {
    let db = VaultDatabase::open_memory().await?;
    let (account, key) = mock_account(&db).await?;

    let records = pif::parse_path(ARCHIVE).await?;
    let import =
        ArchiveImport::new(account.account_id, key, Accept, &db);
    import.run(records).await?;

    let password = SecretString::from("mock password".to_owned());
    let key = account.verify(&password)?;

    let rows = db.list_ciphers(&account.account_id).await?;
    let mut names = Vec::new();
    for row in &rows {
        let data = row.cipher_data()?;
        let Some(FieldValue::Text(name)) = data.get("Name") else {
            panic!("expected an encrypted Name field");
        };
        names.push(decrypt_text(name, &key)?);
    }
    assert!(names.contains(&"Personal Mail".to_owned()));
    assert!(names.contains(&"Home Wifi".to_owned()));
    assert!(names.contains(&"Visa".to_owned()));

    let wifi = rows
        .iter()
        .find(|row| {
            row.cipher_data()
                .ok()
                .and_then(|data| match data.get("Name") {
                    Some(FieldValue::Text(name)) => {
                        decrypt_text(name, &key).ok()
                    }
                    _ => None,
                })
                .as_deref()
                == Some("Home Wifi")
        })
        .expect("router record was imported");
    let data = wifi.cipher_data()?;
    let Some(FieldValue::Text(password)) = data.get("Password") else {
        panic!("expected an encrypted Password field");
    };
    assert_eq!("fluffy-bunny-42", decrypt_text(password, &key)?);
    Ok(())
}

#[tokio::test]
async fn cancelled_import_persists_nothing() -> Result<()> {
    let db = VaultDatabase::open_memory().await?;
    let (account, key) = mock_account(&db).await?;

    let records = pif::parse_path(ARCHIVE).await?;
    let import =
        ArchiveImport::new(account.account_id, key, Reject, &db);
    let outcome = import.run(records).await?;
    assert_eq!(ImportOutcome::Cancelled, outcome);

    let rows = db.list_ciphers(&account.account_id).await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_batch_rolls_back() -> Result<()> {
    let db = VaultDatabase::open_memory().await?;
    let (account, _key) = mock_account(&db).await?;

    // second record references an account that does not exist so the
    // insert violates the foreign key and the whole batch rolls back
    let mut batch = ImportBatch::default();
    let mut valid =
        CipherRecord::new(account.account_id, CipherKind::Login);
    valid.data.insert_text("Name", "Valid");
    batch.insert(valid);

    let mut orphan =
        CipherRecord::new(uuid::Uuid::new_v4(), CipherKind::Login);
    orphan.data.insert_text("Name", "Orphan");
    batch.insert(orphan);

    let result = db.persist_batch(batch).await;
    assert!(result.is_err());

    let rows = db.list_ciphers(&account.account_id).await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn file_backed_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("vault.db");

    let mut db = VaultDatabase::open_file(&path).await?;
    db.migrate().await?;
    let (account, key) = mock_account(&db).await?;

    let records = pif::parse_path(ARCHIVE).await?;
    let import =
        ArchiveImport::new(account.account_id, key, Accept, &db);
    let outcome = import.run(records).await?;
    assert_eq!(ImportOutcome::Imported(5), outcome);

    drop(db);

    // reopen and verify the committed batch survived
    let db = VaultDatabase::open_file(&path).await?;
    let rows = db.list_ciphers(&account.account_id).await?;
    assert_eq!(5, rows.len());
    Ok(())
}

#[tokio::test]
async fn find_account_round_trip() -> Result<()> {
    let db = VaultDatabase::open_memory().await?;
    let (account, _key) = mock_account(&db).await?;

    let found = db
        .find_account("user@example.com")
        .await?
        .expect("account exists");
    assert_eq!(account.account_id, found.account_id);
    assert_eq!(account.email, found.email);

    let password = SecretString::from("mock password".to_owned());
    assert!(found.verify(&password).is_ok());

    assert!(db.find_account("missing@example.com").await?.is_none());
    Ok(())
}
