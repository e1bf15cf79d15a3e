use clap::{Args, Subcommand, ValueEnum};
use jiff::Timestamp;
use ranksync_app::domain::submissions::{
    PgSubmissionsService, SubmissionsService,
    data::{Decision, SyncRequest},
    records::SubmissionUuid,
};
use uuid::Uuid;

use crate::cli::args::{DatabaseArgs, RetryArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct SubmissionCommand {
    #[command(subcommand)]
    command: SubmissionSubcommand,
}

#[derive(Debug, Subcommand)]
enum SubmissionSubcommand {
    /// Approve or deny a pending submission
    Decide(DecideArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verdict {
    Approve,
    Deny,
}

#[derive(Debug, Args)]
pub(crate) struct DecideArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(flatten)]
    tenant: TenantArgs,

    #[arg(long)]
    submission: Uuid,

    #[arg(long, value_enum)]
    verdict: Verdict,

    /// Recorded as the deciding reviewer
    #[arg(long)]
    reviewer: String,

    #[arg(long)]
    reason: Option<String>,
}

pub(crate) async fn run(command: SubmissionCommand) -> Result<(), String> {
    match command.command {
        SubmissionSubcommand::Decide(args) => decide(args).await,
    }
}

async fn decide(args: DecideArgs) -> Result<(), String> {
    let db = args.database.connect().await?;

    let outcome = PgSubmissionsService::new(db, args.retry.policy())
        .decide(
            &args.tenant.tenant(),
            SubmissionUuid::from_uuid(args.submission),
            Decision {
                approve: matches!(args.verdict, Verdict::Approve),
                reviewer: args.reviewer,
                reason: args.reason,
            },
            Timestamp::now(),
        )
        .await
        .map_err(|error| format!("failed to decide submission: {error}"))?;

    println!("submission: {}", outcome.submission.uuid);
    println!("status: {}", outcome.submission.status);

    match outcome.sync {
        SyncRequest::Enqueued(job) => println!("sync_job: {} (queued)", job.uuid),
        SyncRequest::AlreadyPending { job } => println!("sync_job: {job} (already pending)"),
        SyncRequest::NotRequested => println!("sync_job: none"),
    }

    Ok(())
}
