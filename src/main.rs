use clap::Parser;
use pif_import::{
    db::VaultDatabase,
    import::pif,
    migrate::{ArchiveImport, ConfirmImport, ImportOutcome},
    readline, Error, Result,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct PifImport {
    /// Archive file to import.
    #[clap(short, long)]
    file: PathBuf,

    /// Email address of the destination account.
    #[clap(short, long)]
    account: String,

    /// Vault database file.
    #[clap(short, long, env = "PIF_IMPORT_DATABASE")]
    database: PathBuf,
}

struct StdinConfirm;

impl ConfirmImport for StdinConfirm {
    fn confirm(&self, summary: &str) -> Result<bool> {
        print!("{}", summary);
        let answer = readline::read_line_allow_empty(Some(
            "ready to import? [Y/n] ",
        ))?;
        Ok(!answer.trim().to_lowercase().starts_with('n'))
    }
}

async fn run() -> Result<ImportOutcome> {
    let args = PifImport::parse();

    let mut database = VaultDatabase::open_file(&args.database).await?;
    database.migrate().await?;

    let account = database
        .find_account(&args.account)
        .await?
        .ok_or_else(|| Error::NoAccount(args.account.clone()))?;

    let prompt = format!("master password for {}: ", account.email);
    let password = readline::read_password(Some(&prompt))?;
    let key = account.verify(&password)?;

    let records = pif::parse_path(&args.file).await?;
    tracing::info!(
        records = records.len(),
        file = %args.file.display(),
        "parsed archive"
    );

    let import = ArchiveImport::new(
        account.account_id,
        key,
        StdinConfirm,
        database,
    );
    import.run(records).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "pif_import=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match run().await {
        Ok(ImportOutcome::Imported(count)) => {
            println!(
                "successfully imported {} item{}",
                count,
                if count == 1 { "" } else { "s" }
            );
        }
        Ok(ImportOutcome::Cancelled) => {
            println!("import cancelled");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
