use clap::{Args, Subcommand};
use jiff::Timestamp;
use ranksync_app::domain::{
    links::{LinksService, PgLinksService},
    verification::{
        OwnershipVerifier, PgOwnershipVerifier,
        data::{ChallengePolicy, CheckOutcome},
    },
};

use crate::cli::args::{DatabaseArgs, DirectoryArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct VerifyCommand {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    directory: DirectoryArgs,

    #[command(subcommand)]
    command: VerifySubcommand,
}

#[derive(Debug, Subcommand)]
enum VerifySubcommand {
    /// Issue a challenge code for the tenant's group
    Start {
        #[command(flatten)]
        tenant: TenantArgs,

        /// Who asked for verification
        #[arg(long, default_value = "operator")]
        initiator: String,
    },

    /// Look for the code in the group description
    Check {
        #[command(flatten)]
        tenant: TenantArgs,
    },

    /// Give the pending challenge more time
    Extend {
        #[command(flatten)]
        tenant: TenantArgs,

        /// 1 to 30
        #[arg(long)]
        minutes: u32,
    },

    Cancel {
        #[command(flatten)]
        tenant: TenantArgs,
    },
}

pub(crate) async fn run(command: VerifyCommand) -> Result<(), String> {
    let db = command.database.connect().await?;
    let verifier = PgOwnershipVerifier::new(
        db.clone(),
        command.directory.client()?,
        ChallengePolicy::default(),
    );
    let now = Timestamp::now();

    match command.command {
        VerifySubcommand::Start { tenant, initiator } => {
            let tenant = tenant.tenant();

            let link = PgLinksService::new(db)
                .get_link(&tenant)
                .await
                .map_err(|error| format!("failed to load link: {error}"))?;

            let started = verifier
                .start(&tenant, link.group_id, initiator, now)
                .await
                .map_err(|error| format!("failed to start verification: {error}"))?;

            println!("code: {}", started.challenge.code);
            println!("expires_at: {}", started.challenge.expires_at);
            println!("{}", started.instructions);
        }
        VerifySubcommand::Check { tenant } => {
            let outcome = verifier
                .check(&tenant.tenant(), now)
                .await
                .map_err(|error| format!("failed to check verification: {error}"))?;

            match outcome {
                CheckOutcome::CodeNotFound { attempts_remaining } => {
                    println!("{}: {attempts_remaining} attempts remaining", outcome.code());
                }
                CheckOutcome::Verified | CheckOutcome::Expired | CheckOutcome::MaxAttempts => {
                    println!("{}", outcome.code());
                }
            }
        }
        VerifySubcommand::Extend { tenant, minutes } => {
            let challenge = verifier
                .extend(&tenant.tenant(), minutes, now)
                .await
                .map_err(|error| format!("failed to extend verification: {error}"))?;

            println!("expires_at: {}", challenge.expires_at);
            println!("attempts_remaining: {}", challenge.attempts_remaining());
        }
        VerifySubcommand::Cancel { tenant } => {
            let tenant = tenant.tenant();

            let cancelled = verifier
                .cancel(&tenant)
                .await
                .map_err(|error| format!("failed to cancel verification: {error}"))?;

            if cancelled {
                println!("cancelled verification for {tenant}");
            } else {
                println!("no verification pending for {tenant}");
            }
        }
    }

    Ok(())
}
