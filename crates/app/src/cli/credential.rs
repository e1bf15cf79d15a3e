use clap::{Args, Subcommand};
use jiff::Timestamp;
use ranksync_app::credentials::{CredentialStore, PgCredentialStore};

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct CredentialCommand {
    #[command(subcommand)]
    command: CredentialSubcommand,
}

#[derive(Debug, Subcommand)]
enum CredentialSubcommand {
    /// Replace the tenant credential; the old one stops working immediately
    Regenerate(RegenerateArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RegenerateArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,
}

pub(crate) async fn run(command: CredentialCommand) -> Result<(), String> {
    match command.command {
        CredentialSubcommand::Regenerate(args) => regenerate(args).await,
    }
}

async fn regenerate(args: RegenerateArgs) -> Result<(), String> {
    let db = args.database.connect().await?;

    let issued = PgCredentialStore::new(db)
        .regenerate(&args.tenant.tenant(), Timestamp::now())
        .await
        .map_err(|error| format!("failed to regenerate credential: {error}"))?;

    println!("credential_key_id: {}", issued.key_id);
    println!("credential_issued_at: {}", issued.issued_at);
    println!("credential: {}", issued.token);
    println!("store this credential now; it is only shown once");

    Ok(())
}
