//! Orchestrates an import run: collect, summarize, confirm, commit.
use crate::{
    cipher::ImportBatch,
    crypto::DerivedPrivateKey,
    import::{
        convert::{map_record, MapOutcome},
        encrypt::encrypt_fields,
        pif::PifRecord,
    },
    AccountId, Result,
};
use async_trait::async_trait;
use std::fmt::Write;

/// Outcome of an import run.
#[derive(Debug, Eq, PartialEq)]
pub enum ImportOutcome {
    /// Number of records imported.
    Imported(usize),
    /// The run was cancelled at the confirmation prompt.
    Cancelled,
}

/// Trait for collaborators that confirm an import.
pub trait ConfirmImport {
    /// Present a batch summary and ask whether to proceed.
    fn confirm(&self, summary: &str) -> Result<bool>;
}

/// Trait for collaborators that persist a batch of cipher records.
///
/// Implementations must be transactional; either every record in the
/// batch becomes visible or none do.
#[async_trait]
pub trait PersistBatch {
    /// Persist the batch and return the number of records saved.
    async fn persist_batch(&self, batch: ImportBatch) -> Result<usize>;
}

#[async_trait]
impl<P> PersistBatch for &P
where
    P: PersistBatch + Sync,
{
    async fn persist_batch(&self, batch: ImportBatch) -> Result<usize> {
        (**self).persist_batch(batch).await
    }
}

/// Imports the records of an archive into a destination account.
pub struct ArchiveImport<C, P>
where
    C: ConfirmImport,
    P: PersistBatch,
{
    account_id: AccountId,
    key: DerivedPrivateKey,
    confirm: C,
    persist: P,
}

impl<C, P> ArchiveImport<C, P>
where
    C: ConfirmImport,
    P: PersistBatch,
{
    /// Create a new archive import.
    pub fn new(
        account_id: AccountId,
        key: DerivedPrivateKey,
        confirm: C,
        persist: P,
    ) -> Self {
        Self {
            account_id,
            key,
            confirm,
            persist,
        }
    }

    /// Run the import to completion.
    ///
    /// Converts and encrypts every record before any side effect
    /// occurs; a mapping failure aborts the run with nothing
    /// persisted. The whole batch is committed in one transaction
    /// after confirmation.
    pub async fn run(
        self,
        records: Vec<PifRecord>,
    ) -> Result<ImportOutcome> {
        let mut batch = ImportBatch::default();
        let mut skipped = 0;

        for record in &records {
            match map_record(record, &self.account_id)? {
                MapOutcome::Skipped => {
                    skipped += 1;
                    tracing::info!(
                        kind = %record.type_name,
                        title = %record.title,
                        "skipping"
                    );
                }
                MapOutcome::Cipher(mut cipher) => {
                    tracing::info!(
                        kind = %cipher.kind,
                        title = %record.title,
                        "converting"
                    );
                    cipher.data = encrypt_fields(cipher.data, &self.key)?;
                    batch.insert(cipher);
                }
            }
        }

        let summary = summarize(&batch, skipped);
        if !self.confirm.confirm(&summary)? {
            return Ok(ImportOutcome::Cancelled);
        }

        let imported = self.persist.persist_batch(batch).await?;
        Ok(ImportOutcome::Imported(imported))
    }
}

/// Human-readable summary of a batch with counts per kind.
fn summarize(batch: &ImportBatch, skipped: usize) -> String {
    let mut summary = String::new();
    for (kind, count) in batch.counts() {
        let _ = writeln!(
            summary,
            "{:>4} {}{}",
            count,
            kind,
            plural(count)
        );
    }
    if skipped > 0 {
        let _ = writeln!(summary, "{:>4} skipped", skipped);
    }
    summary
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
