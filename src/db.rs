//! SQLite storage for accounts and cipher records.
use crate::{
    account::AccountRecord,
    cipher::{CipherData, CipherKind, CipherRecord, ImportBatch},
    migrate::PersistBatch,
    AccountId, Error, Result,
};
use async_sqlite::{
    rusqlite::{
        Connection, Error as SqlError, OptionalExtension, Row,
    },
    Client, ClientBuilder, JournalMode,
};
use async_trait::async_trait;
use sql_query_builder as sql;
use std::path::Path;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::oneshot;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Vault database backed by SQLite.
pub struct VaultDatabase {
    client: Client,
}

impl VaultDatabase {
    /// Open a database file with WAL journal mode enabled.
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::debug!(
            path = %path.as_ref().display(),
            "db::open_file"
        );
        let client = ClientBuilder::new()
            .path(path.as_ref())
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;
        let db = Self { client };
        db.enable_foreign_keys().await?;
        Ok(db)
    }

    /// Open an in-memory database and run migrations.
    pub async fn open_memory() -> Result<Self> {
        let client = ClientBuilder::new().open().await?;
        let mut db = Self { client };
        db.enable_foreign_keys().await?;
        db.migrate().await?;
        Ok(db)
    }

    async fn enable_foreign_keys(&self) -> Result<()> {
        self.client
            .conn(|conn| {
                conn.pragma_update(None, "foreign_keys", true)
            })
            .await?;
        Ok(())
    }

    /// Run database migrations.
    pub async fn migrate(&mut self) -> Result<()> {
        let (tx, rx) = oneshot::channel::<
            std::result::Result<refinery::Report, refinery::Error>,
        >();
        self.client
            .conn_mut(|conn| {
                let result = embedded::migrations::runner().run(conn);
                tx.send(result).unwrap();
                Ok(())
            })
            .await?;

        let res = rx.await;
        res.unwrap()?;
        Ok(())
    }

    /// Find an account by email address.
    pub async fn find_account(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>> {
        let email = email.to_owned();
        let row = self
            .client
            .conn(move |conn| {
                AccountEntity::new(conn).find_by_email(&email)
            })
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Insert an account.
    pub async fn insert_account(
        &self,
        account: &AccountRecord,
    ) -> Result<()> {
        let row = AccountRow::new_insert(account)?;
        self.client
            .conn(move |conn| AccountEntity::new(conn).insert(&row))
            .await?;
        Ok(())
    }

    /// List the cipher records for an account in insertion order.
    pub async fn list_ciphers(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<CipherRow>> {
        let identifier = account_id.to_string();
        Ok(self
            .client
            .conn(move |conn| {
                let query = sql::Select::new()
                    .select(CIPHER_COLUMNS)
                    .from("ciphers")
                    .where_clause("account_identifier = ?1")
                    .order_by("cipher_id");
                let mut stmt = conn.prepare_cached(&query.as_string())?;
                let rows =
                    stmt.query_map([&identifier], |row| row.try_into())?;
                let mut ciphers = Vec::new();
                for row in rows {
                    ciphers.push(row?);
                }
                Ok(ciphers)
            })
            .await?)
    }
}

#[async_trait]
impl PersistBatch for VaultDatabase {
    /// Persist the batch inside a single transaction.
    ///
    /// Records are inserted in kind order and source order within a
    /// kind; any failure rolls back the entire transaction.
    async fn persist_batch(&self, batch: ImportBatch) -> Result<usize> {
        let mut rows = Vec::new();
        for (_, records) in batch.into_groups() {
            for record in records {
                rows.push(CipherRow::new_insert(&record)?);
            }
        }

        let count = rows.len();
        self.client
            .conn_mut(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(
                        r#"INSERT INTO ciphers
                          (account_identifier, kind, favorite,
                           created_at, updated_at, data)
                          VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        "#,
                    )?;
                    for row in &rows {
                        stmt.execute((
                            &row.account_identifier,
                            row.kind,
                            row.favorite,
                            &row.created_at,
                            &row.updated_at,
                            &row.data,
                        ))?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        tracing::debug!(count, "db::persist_batch");
        Ok(count)
    }
}

const CIPHER_COLUMNS: &str = r#"
    cipher_id,
    account_identifier,
    kind,
    favorite,
    created_at,
    updated_at,
    data
"#;

/// Account row from the database.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct AccountRow {
    /// Row identifier.
    pub row_id: i64,
    /// RFC3339 date and time.
    created_at: String,
    /// RFC3339 date and time.
    modified_at: String,
    /// Account identifier.
    identifier: String,
    /// Email address.
    email: String,
    /// Key derivation salt.
    salt: String,
    /// Master password PHC string.
    password_hash: String,
}

impl AccountRow {
    /// Create an account row for insertion.
    pub fn new_insert(account: &AccountRecord) -> Result<Self> {
        let now = OffsetDateTime::now_utc().format(&Rfc3339)?;
        Ok(AccountRow {
            created_at: now.clone(),
            modified_at: now,
            identifier: account.account_id.to_string(),
            email: account.email.clone(),
            salt: account.salt.clone(),
            password_hash: account.password_hash.clone(),
            ..Default::default()
        })
    }
}

impl<'a> TryFrom<&Row<'a>> for AccountRow {
    type Error = SqlError;
    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(AccountRow {
            row_id: row.get(0)?,
            created_at: row.get(1)?,
            modified_at: row.get(2)?,
            identifier: row.get(3)?,
            email: row.get(4)?,
            salt: row.get(5)?,
            password_hash: row.get(6)?,
        })
    }
}

impl TryFrom<AccountRow> for AccountRecord {
    type Error = Error;

    fn try_from(value: AccountRow) -> Result<Self> {
        Ok(AccountRecord {
            account_id: value.identifier.parse()?,
            email: value.email,
            salt: value.salt,
            password_hash: value.password_hash,
        })
    }
}

/// Account entity.
struct AccountEntity<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AccountEntity<'conn> {
    /// Create a new account entity.
    fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn account_select_columns(&self, sql: sql::Select) -> sql::Select {
        sql.select(
            r#"
                account_id,
                created_at,
                modified_at,
                identifier,
                email,
                salt,
                password_hash
            "#,
        )
    }

    /// Find an account by email address.
    fn find_by_email(
        &self,
        email: &str,
    ) -> std::result::Result<Option<AccountRow>, SqlError> {
        let query = self
            .account_select_columns(sql::Select::new())
            .from("accounts")
            .where_clause("email = ?1");
        let mut stmt = self.conn.prepare_cached(&query.as_string())?;
        stmt.query_row([email], |row| row.try_into()).optional()
    }

    /// Insert an account row.
    fn insert(
        &self,
        row: &AccountRow,
    ) -> std::result::Result<i64, SqlError> {
        let mut stmt = self.conn.prepare_cached(
            r#"INSERT INTO accounts
              (created_at, modified_at, identifier, email,
               salt, password_hash)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;
        stmt.execute((
            &row.created_at,
            &row.modified_at,
            &row.identifier,
            &row.email,
            &row.salt,
            &row.password_hash,
        ))?;
        Ok(self.conn.last_insert_rowid())
    }
}

/// Cipher row from the database.
#[derive(Debug, Default)]
pub struct CipherRow {
    /// Row identifier.
    pub row_id: i64,
    /// Identifier of the owning account.
    pub account_identifier: String,
    /// Kind discriminator.
    pub kind: i64,
    /// Favorite flag.
    pub favorite: bool,
    /// RFC3339 date and time.
    pub created_at: String,
    /// RFC3339 date and time.
    pub updated_at: String,
    /// Field map encoded as JSON.
    pub data: String,
}

impl CipherRow {
    /// Create a cipher row for insertion.
    pub fn new_insert(record: &CipherRecord) -> Result<Self> {
        Ok(CipherRow {
            account_identifier: record.account_id.to_string(),
            kind: record.kind.id(),
            favorite: record.favorite,
            created_at: record.created_at.format(&Rfc3339)?,
            updated_at: record.updated_at.format(&Rfc3339)?,
            data: serde_json::to_string(&record.data)?,
            ..Default::default()
        })
    }

    /// Kind of this cipher.
    pub fn cipher_kind(&self) -> Result<CipherKind> {
        self.kind.try_into()
    }

    /// Decode the field map for this cipher.
    pub fn cipher_data(&self) -> Result<CipherData> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

impl<'a> TryFrom<&Row<'a>> for CipherRow {
    type Error = SqlError;
    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(CipherRow {
            row_id: row.get(0)?,
            account_identifier: row.get(1)?,
            kind: row.get(2)?,
            favorite: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            data: row.get(6)?,
        })
    }
}
